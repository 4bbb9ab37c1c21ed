//! In-memory leaf store implementations
//!
//! Used by tests and as the default backend when no data directory is
//! configured. Ordered maps keep listing semantics identical to the
//! persistent stores.

use anyhow::Result;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Bound;
use std::sync::RwLock;

use super::blob::{BlobKey, BlobStore};
use super::keys::listing_start;
use super::traits::{KeyPage, LabelIndex, MetadataStore};

/// In-memory metadata records
#[derive(Default)]
pub struct InMemoryMetadataStore {
    records: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.records.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MetadataStore for InMemoryMetadataStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.records.read().unwrap().get(key).cloned())
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        self.records
            .write()
            .unwrap()
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.records.write().unwrap().remove(key);
        Ok(())
    }
}

/// In-memory label index over a sorted key set
#[derive(Default)]
pub struct InMemoryLabelIndex {
    entries: RwLock<BTreeSet<String>>,
}

impl InMemoryLabelIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an entry exists
    pub fn contains(&self, key: &str) -> bool {
        self.entries.read().unwrap().contains(key)
    }
}

impl LabelIndex for InMemoryLabelIndex {
    fn put(&self, key: &str) -> Result<()> {
        self.entries.write().unwrap().insert(key.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.entries.write().unwrap().remove(key);
        Ok(())
    }

    fn list(
        &self,
        prefix: Option<&str>,
        start_after: Option<&str>,
        limit: usize,
    ) -> Result<KeyPage> {
        let entries = self.entries.read().unwrap();

        let lower = listing_start(prefix, start_after).map(str::to_string);

        let mut keys: Vec<String> = entries
            .range((lower, Bound::Unbounded))
            .take_while(|key| prefix.is_none_or(|p| key.starts_with(p)))
            .take(limit.saturating_add(1))
            .cloned()
            .collect();

        let more = keys.len() > limit;
        keys.truncate(limit);
        Ok(KeyPage { keys, more })
    }
}

/// In-memory attachment blobs
#[derive(Default)]
pub struct InMemoryBlobStore {
    blobs: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlobStore for InMemoryBlobStore {
    fn put(&self, key: &BlobKey, data: &[u8]) -> Result<()> {
        self.blobs
            .write()
            .unwrap()
            .insert(key.to_string(), data.to_vec());
        Ok(())
    }

    fn get(&self, key: &BlobKey) -> Result<Option<Vec<u8>>> {
        Ok(self.blobs.read().unwrap().get(&key.to_string()).cloned())
    }

    fn exists(&self, key: &BlobKey) -> Result<bool> {
        Ok(self.blobs.read().unwrap().contains_key(&key.to_string()))
    }

    fn delete(&self, key: &BlobKey) -> Result<()> {
        self.blobs.write().unwrap().remove(&key.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_with(keys: &[&str]) -> InMemoryLabelIndex {
        let index = InMemoryLabelIndex::new();
        for key in keys {
            index.put(key).unwrap();
        }
        index
    }

    #[test]
    fn test_metadata_crud() {
        let store = InMemoryMetadataStore::new();
        assert!(store.get("a@b.com:m1").unwrap().is_none());

        store.put("a@b.com:m1", b"{}").unwrap();
        assert_eq!(store.get("a@b.com:m1").unwrap().unwrap(), b"{}");
        assert_eq!(store.len(), 1);

        store.delete("a@b.com:m1").unwrap();
        store.delete("a@b.com:m1").unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_list_respects_prefix() {
        let index = index_with(&["a@b.com:0:m1", "a@b.com:1:m1", "a@b.co:0:m2", "c@d.com:0:m3"]);

        let page = index.list(Some("a@b.com:0:"), None, 10).unwrap();
        assert_eq!(page.keys, vec!["a@b.com:0:m1"]);
        assert!(!page.more);
    }

    #[test]
    fn test_list_pages_with_start_after() {
        let index = index_with(&["a:0:m1", "a:0:m2", "a:0:m3", "a:1:m1"]);

        let first = index.list(Some("a:0:"), None, 2).unwrap();
        assert_eq!(first.keys, vec!["a:0:m1", "a:0:m2"]);
        assert!(first.more);

        let second = index.list(Some("a:0:"), Some("a:0:m2"), 2).unwrap();
        assert_eq!(second.keys, vec!["a:0:m3"]);
        assert!(!second.more);
    }

    #[test]
    fn test_list_unscoped() {
        let index = index_with(&["b:0:m2", "a:0:m1"]);
        let page = index.list(None, None, 10).unwrap();
        assert_eq!(page.keys, vec!["a:0:m1", "b:0:m2"]);
    }

    #[test]
    fn test_list_with_max_limit() {
        let index = index_with(&["a:0:m1", "a:0:m2"]);
        let page = index.list(Some("a:0:"), None, usize::MAX).unwrap();
        assert_eq!(page.keys, vec!["a:0:m1", "a:0:m2"]);
        assert!(!page.more);
    }
}
