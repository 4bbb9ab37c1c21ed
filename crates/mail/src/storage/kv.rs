//! Storage orchestrator over the three leaf stores
//!
//! Writes go blobs, then metadata, then the label index. Deletes go index
//! first, then metadata, so a crash in between leaves a message reachable
//! by id but absent from listings. None of the steps are transactional;
//! every operation is keyed by message id and can be retried as a whole.

use anyhow::Context;
use log::{debug, warn};
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::sync::Arc;

use super::blob::{BlobKey, BlobStore};
use super::blob_file::FileBlobStore;
use super::cursor::Cursor;
use super::keys::{label_key, label_prefix, metadata_key, parse_label_key};
use super::memory::{InMemoryBlobStore, InMemoryLabelIndex, InMemoryMetadataStore};
use super::sqlite::SqliteStore;
use super::traits::{IdPage, LabelIndex, ListQuery, MailStorage, MessagePage, MetadataStore};
use crate::config::{DEFAULT_PAGE_LIMIT, StoreConfig};
use crate::error::{MailError, Result};
use crate::models::{Mailbox, Message, MessageId, ReservedLabel, decode_message, encode_message};

/// The authoritative [`MailStorage`] implementation
pub struct KvMailStore {
    metadata: Arc<dyn MetadataStore>,
    blobs: Arc<dyn BlobStore>,
    index: Arc<dyn LabelIndex>,
    page_limit: usize,
}

/// Index entries of one listing page, resolved to (mailbox id, message id)
struct IndexPage {
    entries: Vec<(String, MessageId)>,
    next: Option<Cursor>,
}

impl KvMailStore {
    /// Compose a store from leaf stores
    pub fn new(
        metadata: Arc<dyn MetadataStore>,
        blobs: Arc<dyn BlobStore>,
        index: Arc<dyn LabelIndex>,
    ) -> Self {
        Self {
            metadata,
            blobs,
            index,
            page_limit: DEFAULT_PAGE_LIMIT,
        }
    }

    /// Set the page size used when a listing does not give one
    pub fn with_page_limit(mut self, page_limit: usize) -> Self {
        self.page_limit = page_limit.max(1);
        self
    }

    /// A store backed entirely by memory
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryMetadataStore::new()),
            Arc::new(InMemoryBlobStore::new()),
            Arc::new(InMemoryLabelIndex::new()),
        )
    }

    /// Open the persistent store described by `config`.
    ///
    /// Metadata and the label index share one SQLite database; attachment
    /// blobs go to compressed files.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        let sqlite = Arc::new(SqliteStore::open(config.metadata_db_path())?);
        let blobs = FileBlobStore::with_compression_level(
            config.blob_dir_path(),
            config.compression_level,
        )?;

        Ok(Self::new(sqlite.clone(), Arc::new(blobs), sqlite).with_page_limit(config.page_limit))
    }

    /// Read and decode a metadata record
    fn load(&self, mailbox_id: &str, id: &MessageId) -> anyhow::Result<Option<Message>> {
        match self.metadata.get(&metadata_key(mailbox_id, id))? {
            Some(record) => Ok(Some(decode_message(id, &record)?)),
            None => Ok(None),
        }
    }

    /// Labels of the currently stored record, empty if there is none.
    ///
    /// An undecodable record is treated as absent since the write about to
    /// happen replaces it.
    fn stored_labels(&self, mailbox_id: &str, id: &MessageId) -> anyhow::Result<BTreeSet<ReservedLabel>> {
        let key = metadata_key(mailbox_id, id);
        let Some(record) = self.metadata.get(&key)? else {
            return Ok(BTreeSet::new());
        };
        match decode_message(id, &record) {
            Ok(previous) => Ok(previous.labels),
            Err(e) => {
                warn!("[STORE] Replacing unreadable record {}: {:#}", key, e);
                Ok(BTreeSet::new())
            }
        }
    }

    /// List one page of index entries for a folder.
    ///
    /// A scoped listing walks the `<mailbox>:<label>:` prefix. An unscoped
    /// listing walks the whole index and keeps the entries of the folder,
    /// so its pages can come back short.
    fn list_index(&self, mailbox: Option<&Mailbox>, query: &ListQuery) -> Result<IndexPage> {
        let folder = query.folder.unwrap_or(ReservedLabel::All);
        let prefix = mailbox.map(|mb| label_prefix(mb.id(), folder));
        let start_after = query
            .offset
            .as_ref()
            .map(|cursor| cursor.resume_key(prefix.as_deref()))
            .transpose()?;
        let limit = query.limit.unwrap_or(self.page_limit).max(1);

        let page = self
            .index
            .list(prefix.as_deref(), start_after.as_deref(), limit)?;

        let next = if page.more {
            page.keys.last().map(|key| Cursor::after_key(key))
        } else {
            None
        };

        let folder_code = folder.to_string();
        let entries = page
            .keys
            .iter()
            .filter_map(|key| match parse_label_key(key) {
                Some(parsed) if prefix.is_some() || parsed.label == folder_code => Some((
                    parsed.mailbox_id.to_string(),
                    MessageId::new(parsed.message_id),
                )),
                Some(_) => None,
                None => {
                    warn!("[STORE] Skipping malformed index key {:?}", key);
                    None
                }
            })
            .collect();

        Ok(IndexPage { entries, next })
    }
}

impl MailStorage for KvMailStore {
    fn get_message(&self, mailbox: &Mailbox, id: &MessageId) -> Result<Message> {
        self.load(mailbox.id(), id)?
            .ok_or_else(|| MailError::MessageNotFound {
                mailbox: mailbox.id().to_string(),
                id: id.to_string(),
            })
    }

    fn put_message(&self, mailbox: &Mailbox, id: &MessageId, message: &mut Message) -> Result<()> {
        if !id.is_storable() {
            return Err(MailError::InvalidArguments(format!(
                "message id {:?} may only contain ASCII letters, digits, '-' and '_'",
                id.as_str()
            )));
        }
        message.id = id.clone();
        message.add_label(ReservedLabel::All);

        let previous_labels = self.stored_labels(mailbox.id(), id)?;

        // Content is cleared only once its blob is written, so a failed
        // put can be retried with the same message
        message
            .parts
            .par_iter_mut()
            .filter(|part| part.content.is_some())
            .try_for_each(|part| -> anyhow::Result<()> {
                if let Some(content) = &part.content {
                    let key = BlobKey::new(mailbox.id(), id, &part.id);
                    self.blobs
                        .put(&key, content)
                        .with_context(|| format!("Failed to store part {}", key))?;
                }
                part.content = None;
                Ok(())
            })?;

        let record = encode_message(message)?;
        self.metadata.put(&metadata_key(mailbox.id(), id), &record)?;

        message
            .labels
            .par_iter()
            .try_for_each(|label| self.index.put(&label_key(mailbox.id(), *label, id)))?;

        let stale: Vec<ReservedLabel> = previous_labels
            .difference(&message.labels)
            .copied()
            .collect();
        stale
            .par_iter()
            .try_for_each(|label| self.index.delete(&label_key(mailbox.id(), *label, id)))?;

        debug!(
            "[STORE] Put {} ({} labels, {} parts, {} stale labels removed)",
            metadata_key(mailbox.id(), id),
            message.labels.len(),
            message.parts.len(),
            stale.len()
        );
        Ok(())
    }

    fn get_message_id_page(&self, mailbox: Option<&Mailbox>, query: &ListQuery) -> Result<IdPage> {
        let page = self.list_index(mailbox, query)?;
        debug!("[STORE] Listed {} ids (more: {})", page.entries.len(), page.next.is_some());
        Ok(IdPage {
            ids: page.entries.into_iter().map(|(_, id)| id).collect(),
            next: page.next,
        })
    }

    fn get_messages_with_metadata(
        &self,
        mailbox: Option<&Mailbox>,
        query: &ListQuery,
    ) -> Result<MessagePage> {
        let page = self.list_index(mailbox, query)?;

        let loaded = page
            .entries
            .par_iter()
            .map(|(mailbox_id, id)| self.load(mailbox_id, id))
            .collect::<anyhow::Result<Vec<_>>>()?;

        let messages = page
            .entries
            .iter()
            .zip(loaded)
            .filter_map(|((mailbox_id, id), message)| {
                if message.is_none() {
                    warn!("[STORE] Index entry without metadata: {}", metadata_key(mailbox_id, id));
                }
                message
            })
            .collect();

        Ok(MessagePage {
            messages,
            next: page.next,
        })
    }

    fn get_messages(&self, mailbox: &Mailbox, ids: &[MessageId]) -> Result<Vec<Message>> {
        let loaded = ids
            .par_iter()
            .map(|id| self.load(mailbox.id(), id))
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(loaded.into_iter().flatten().collect())
    }

    fn get_part_content(
        &self,
        mailbox: &Mailbox,
        id: &MessageId,
        part_id: &str,
    ) -> Result<Option<Vec<u8>>> {
        Ok(self.blobs.get(&BlobKey::new(mailbox.id(), id, part_id))?)
    }

    fn delete(&self, mailbox: &Mailbox, id: &MessageId) -> Result<()> {
        let key = metadata_key(mailbox.id(), id);

        // Without a readable record, sweep every reserved label so a
        // retried delete still clears entries left by an earlier attempt
        let record = self.metadata.get(&key)?;
        let (labels, part_count): (Vec<ReservedLabel>, usize) =
            match record.map(|record| decode_message(id, &record)) {
                Some(Ok(message)) => (message.labels.into_iter().collect(), message.parts.len()),
                Some(Err(e)) => {
                    warn!("[STORE] Deleting unreadable record {}: {:#}", key, e);
                    (ReservedLabel::ALL.to_vec(), 0)
                }
                None => (ReservedLabel::ALL.to_vec(), 0),
            };

        labels
            .par_iter()
            .try_for_each(|label| self.index.delete(&label_key(mailbox.id(), *label, id)))?;
        self.metadata.delete(&key)?;

        // TODO: remove attachment blobs once BlobStore can enumerate a message's parts
        if part_count > 0 {
            debug!("[STORE] Deleted {} leaving {} attachment blobs", key, part_count);
        } else {
            debug!("[STORE] Deleted {}", key);
        }
        Ok(())
    }
}
