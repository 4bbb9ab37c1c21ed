//! Storage trait definitions
//!
//! The leaf traits ([`MetadataStore`], [`LabelIndex`], and
//! [`BlobStore`](super::BlobStore)) are plain key-value stores. [`MailStorage`]
//! is the contract the rest of the crate programs against.

use anyhow::Result;

use super::Cursor;
use crate::error::Result as MailResult;
use crate::models::{Mailbox, Message, MessageId, ReservedLabel};

/// Key to JSON record store for message metadata
pub trait MetadataStore: Send + Sync {
    /// Fetch a record, `None` if the key is absent
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Insert or overwrite a record
    fn put(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Remove a record; removing an absent key is not an error
    fn delete(&self, key: &str) -> Result<()>;
}

/// One page of keys from an ordered listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyPage {
    /// Keys in ascending order
    pub keys: Vec<String>,
    /// Whether more keys follow the last one
    pub more: bool,
}

/// Ordered set of empty-valued keys with prefix listing
pub trait LabelIndex: Send + Sync {
    /// Add an entry
    fn put(&self, key: &str) -> Result<()>;

    /// Remove an entry; removing an absent key is not an error
    fn delete(&self, key: &str) -> Result<()>;

    /// List up to `limit` keys in ascending order.
    ///
    /// Only keys starting with `prefix` (every key when `None`) and sorting
    /// strictly after `start_after` are returned.
    fn list(&self, prefix: Option<&str>, start_after: Option<&str>, limit: usize)
    -> Result<KeyPage>;
}

/// Parameters for listing a folder
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    /// Folder to list, `ReservedLabel::All` when unset
    pub folder: Option<ReservedLabel>,
    /// Cursor from a previous page
    pub offset: Option<Cursor>,
    /// Page size, the store default when unset
    pub limit: Option<usize>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn folder(mut self, folder: ReservedLabel) -> Self {
        self.folder = Some(folder);
        self
    }

    pub fn after(mut self, cursor: Option<Cursor>) -> Self {
        self.offset = cursor;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// A page of message ids
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdPage {
    pub ids: Vec<MessageId>,
    /// `None` once the listing is exhausted
    pub next: Option<Cursor>,
}

/// A page of messages with their metadata
#[derive(Debug, Clone, Default)]
pub struct MessagePage {
    pub messages: Vec<Message>,
    /// `None` once the listing is exhausted
    pub next: Option<Cursor>,
}

/// Storage contract for mailboxes
///
/// Every operation is scoped by [`Mailbox`]. Listing without a mailbox is
/// unscoped (all tenants) and only meant for administrative paths.
pub trait MailStorage: Send + Sync {
    /// Generate a new unique, time-ordered message id
    fn generate_id(&self) -> MessageId {
        MessageId::generate()
    }

    /// Get a message from its metadata record (attachment content is not loaded)
    fn get_message(&self, mailbox: &Mailbox, id: &MessageId) -> MailResult<Message>;

    /// Store a message, overwriting any message with the same id.
    ///
    /// Attachment content is moved to the blob store and cleared from
    /// `message`. Safe to retry as a whole after a partial failure.
    /// Ids that are not [`MessageId::is_storable`] are rejected with
    /// `InvalidArguments` before anything is written.
    fn put_message(&self, mailbox: &Mailbox, id: &MessageId, message: &mut Message)
    -> MailResult<()>;

    /// List one page of message ids in a folder, with its continuation cursor
    fn get_message_id_page(&self, mailbox: Option<&Mailbox>, query: &ListQuery)
    -> MailResult<IdPage>;

    /// List one page of message ids in a folder
    fn get_message_ids(
        &self,
        mailbox: Option<&Mailbox>,
        query: &ListQuery,
    ) -> MailResult<Vec<MessageId>> {
        Ok(self.get_message_id_page(mailbox, query)?.ids)
    }

    /// List every message id in a folder by following cursors to the end
    fn get_all_message_ids(
        &self,
        mailbox: Option<&Mailbox>,
        folder: Option<ReservedLabel>,
    ) -> MailResult<Vec<MessageId>> {
        let mut query = ListQuery {
            folder,
            ..ListQuery::default()
        };
        let mut ids = Vec::new();
        loop {
            let page = self.get_message_id_page(mailbox, &query)?;
            ids.extend(page.ids);
            match page.next {
                Some(next) => query.offset = Some(next),
                None => return Ok(ids),
            }
        }
    }

    /// List one page of a folder with full metadata for each message
    fn get_messages_with_metadata(
        &self,
        mailbox: Option<&Mailbox>,
        query: &ListQuery,
    ) -> MailResult<MessagePage>;

    /// Fetch several messages at once, in the order of `ids`.
    /// Ids without a metadata record are skipped.
    fn get_messages(&self, mailbox: &Mailbox, ids: &[MessageId]) -> MailResult<Vec<Message>>;

    /// Read the stored content of one attachment part
    fn get_part_content(
        &self,
        mailbox: &Mailbox,
        id: &MessageId,
        part_id: &str,
    ) -> MailResult<Option<Vec<u8>>>;

    /// Delete a message: index entries first, then metadata. Idempotent.
    fn delete(&self, mailbox: &Mailbox, id: &MessageId) -> MailResult<()>;
}
