//! Error types for storage and protocol operations

use thiserror::Error;

/// Errors surfaced by the storage contract and the protocol adapter.
///
/// Leaf stores report failures as `anyhow::Error`; those pass through
/// unchanged as [`MailError::Backend`].
#[derive(Debug, Error)]
pub enum MailError {
    /// An address without a local part and domain separated by `@`
    #[error("Malformed email address: {0:?}")]
    MalformedAddress(String),

    /// An account id that is not a base64url-encoded address
    #[error("Invalid account id: {0:?}")]
    InvalidAccountId(String),

    /// No metadata record exists for the message
    #[error("Message {id} not found in mailbox {mailbox}")]
    MessageNotFound { mailbox: String, id: String },

    /// A pagination cursor that does not belong to the listing
    #[error("Invalid pagination cursor: {0}")]
    InvalidCursor(String),

    /// Method arguments that cannot be applied
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// Metadata, blob, or index store failure
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl MailError {
    /// Whether the caller supplied bad input, as opposed to a server-side failure
    pub fn is_client_error(&self) -> bool {
        !matches!(self, MailError::Backend(_))
    }
}

/// Result type for storage and protocol operations
pub type Result<T> = std::result::Result<T, MailError>;
