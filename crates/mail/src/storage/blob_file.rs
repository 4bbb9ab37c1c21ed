//! File-based blob storage with zstd compression

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::blob::{BlobKey, BlobStore};

/// File-based blob storage with zstd compression
///
/// Directory structure:
/// ```text
/// blobs/
///   alice%40example.com/
///     3f/
///       01900c1b...a53f.1.zst     # part 1 of message 01900c1b...a53f
///       01900c1b...a53f.2.1.zst   # part 2.1
/// ```
pub struct FileBlobStore {
    root: PathBuf,
    compression_level: i32,
}

impl FileBlobStore {
    /// Create a new file blob store at the given path
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        Self::with_compression_level(root, 3)
    }

    /// Create a store with an explicit zstd level
    pub fn with_compression_level(root: impl AsRef<Path>, compression_level: i32) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).context("Failed to create blob storage directory")?;
        Ok(Self {
            root,
            compression_level,
        })
    }

    /// Shard directory from the last 2 chars of the message id.
    /// Generated ids start with a timestamp, so the tail spreads better.
    fn shard(message_id: &str) -> String {
        let tail: String = message_id.chars().rev().take(2).collect();
        if tail.len() == 2 && tail.chars().all(|c| c.is_ascii_alphanumeric()) {
            tail.chars().rev().collect()
        } else {
            "xx".to_string()
        }
    }

    /// Get the file path for a blob key
    fn blob_path(&self, key: &BlobKey) -> PathBuf {
        let filename = format!(
            "{}.{}.zst",
            urlencoding::encode(&key.message_id),
            urlencoding::encode(&key.part_id)
        );

        self.root
            .join(urlencoding::encode(&key.mailbox_id).as_ref())
            .join(Self::shard(&key.message_id))
            .join(filename)
    }
}

impl BlobStore for FileBlobStore {
    fn put(&self, key: &BlobKey, data: &[u8]) -> Result<()> {
        let path = self.blob_path(key);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let compressed =
            zstd::encode_all(data, self.compression_level).context("Failed to compress blob")?;

        // Write atomically (write to temp, then rename)
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, &compressed)
            .with_context(|| format!("Failed to write blob {}", key))?;
        fs::rename(&temp_path, &path)?;

        Ok(())
    }

    fn get(&self, key: &BlobKey) -> Result<Option<Vec<u8>>> {
        let path = self.blob_path(key);

        if !path.exists() {
            return Ok(None);
        }

        let compressed = fs::read(&path).with_context(|| format!("Failed to read blob {}", key))?;
        let mut decoder = zstd::Decoder::new(compressed.as_slice())?;
        let mut decompressed = Vec::new();
        decoder
            .read_to_end(&mut decompressed)
            .context("Failed to decompress blob")?;

        Ok(Some(decompressed))
    }

    fn exists(&self, key: &BlobKey) -> Result<bool> {
        Ok(self.blob_path(key).exists())
    }

    fn delete(&self, key: &BlobKey) -> Result<()> {
        let path = self.blob_path(key);
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MessageId;
    use tempfile::tempdir;

    fn key(message_id: &str, part_id: &str) -> BlobKey {
        BlobKey::new("alice@example.com", &MessageId::new(message_id), part_id)
    }

    #[test]
    fn test_put_get() {
        let dir = tempdir().unwrap();
        let store = FileBlobStore::new(dir.path().join("blobs")).unwrap();

        let key = key("abc123", "1");
        store.put(&key, b"Hello, world!").unwrap();

        assert_eq!(store.get(&key).unwrap().unwrap(), b"Hello, world!");
    }

    #[test]
    fn test_nested_part_ids_are_distinct() {
        let dir = tempdir().unwrap();
        let store = FileBlobStore::new(dir.path().join("blobs")).unwrap();

        store.put(&key("abc123", "2"), b"outer").unwrap();
        store.put(&key("abc123", "2.1"), b"inner").unwrap();

        assert_eq!(store.get(&key("abc123", "2")).unwrap().unwrap(), b"outer");
        assert_eq!(store.get(&key("abc123", "2.1")).unwrap().unwrap(), b"inner");
    }

    #[test]
    fn test_get_nonexistent() {
        let dir = tempdir().unwrap();
        let store = FileBlobStore::new(dir.path().join("blobs")).unwrap();

        assert!(store.get(&key("nonexistent", "1")).unwrap().is_none());
    }

    #[test]
    fn test_exists_and_delete() {
        let dir = tempdir().unwrap();
        let store = FileBlobStore::new(dir.path().join("blobs")).unwrap();

        let key = key("abc123", "1");
        assert!(!store.exists(&key).unwrap());

        store.put(&key, b"data").unwrap();
        assert!(store.exists(&key).unwrap());

        store.delete(&key).unwrap();
        assert!(!store.exists(&key).unwrap());

        // Second delete is a no-op
        store.delete(&key).unwrap();
    }

    #[test]
    fn test_hostile_ids_stay_under_root() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("blobs");
        let store = FileBlobStore::new(&root).unwrap();

        let key = key("../../etc/passwd", "../1");
        let path = store.blob_path(&key);
        assert!(path.starts_with(&root));
        assert_eq!(path.parent().unwrap().parent().unwrap().parent().unwrap(), root);
    }

    #[test]
    fn test_compression() {
        let dir = tempdir().unwrap();
        let store = FileBlobStore::new(dir.path().join("blobs")).unwrap();

        let key = key("abc123", "1");
        let data = "Hello, world! ".repeat(1000);

        store.put(&key, data.as_bytes()).unwrap();

        let compressed_size = fs::metadata(store.blob_path(&key)).unwrap().len();
        assert!(
            compressed_size < data.len() as u64,
            "Compressed size {} should be less than original {}",
            compressed_size,
            data.len()
        );

        assert_eq!(store.get(&key).unwrap().unwrap(), data.as_bytes());
    }
}
