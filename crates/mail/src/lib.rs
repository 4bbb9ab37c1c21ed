//! Mailstore - multi-tenant mailbox storage with a JMAP adapter
//!
//! This crate provides:
//! - Domain models (Mailbox, Message, MimePart, labels and markers)
//! - Leaf stores for metadata, attachment blobs, and the label index
//! - The storage orchestrator with cursor pagination
//! - Inbound delivery of raw messages
//! - The JMAP protocol adapter and an outbound sending client
//!
//! All storage calls are synchronous; fan-out runs on the rayon pool.

pub mod config;
pub mod delivery;
pub mod error;
pub mod jmap;
pub mod models;
pub mod sending;
pub mod storage;

pub use config::{SendingCredentials, StoreConfig};
pub use delivery::{ParsedAttachment, ParsedEmail, deliver};
pub use error::{MailError, Result};
pub use jmap::{AccountId, MailboxService, Session, handle_request};
pub use models::{
    Disposition, EmailAddress, Mailbox, Marker, Message, MessageId, MimePart, ReservedLabel,
};
pub use sending::{ResendClient, SendingService};
pub use storage::{
    BlobKey, BlobStore, Cursor, FileBlobStore, IdPage, InMemoryBlobStore, InMemoryLabelIndex,
    InMemoryMetadataStore, KvMailStore, LabelIndex, ListQuery, MailStorage, MessagePage,
    MetadataStore, SqliteStore,
};
