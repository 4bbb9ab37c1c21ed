//! Blob storage trait for attachment content

use anyhow::Result;
use std::fmt;

use super::keys::SEPARATOR;
use crate::models::MessageId;

/// Key for storing/retrieving an attachment part
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlobKey {
    /// Mailbox the message belongs to
    pub mailbox_id: String,
    /// Message ID this content belongs to
    pub message_id: String,
    /// Part number ("1", "2.1", ...)
    pub part_id: String,
}

impl BlobKey {
    pub fn new(mailbox_id: &str, message_id: &MessageId, part_id: &str) -> Self {
        Self {
            mailbox_id: mailbox_id.to_string(),
            message_id: message_id.as_str().to_string(),
            part_id: part_id.to_string(),
        }
    }
}

/// Canonical `<mailbox>:<message>:<part>` form
impl fmt::Display for BlobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{SEPARATOR}{}{SEPARATOR}{}",
            self.mailbox_id, self.message_id, self.part_id
        )
    }
}

/// Trait for blob storage operations
///
/// Implementations handle compression/decompression internally.
pub trait BlobStore: Send + Sync {
    /// Store blob content, overwriting any previous content
    fn put(&self, key: &BlobKey, data: &[u8]) -> Result<()>;

    /// Retrieve blob content
    ///
    /// Returns None if the blob doesn't exist.
    fn get(&self, key: &BlobKey) -> Result<Option<Vec<u8>>>;

    /// Check if a blob exists
    fn exists(&self, key: &BlobKey) -> Result<bool>;

    /// Delete a blob; deleting an absent blob is not an error
    fn delete(&self, key: &BlobKey) -> Result<()>;
}
