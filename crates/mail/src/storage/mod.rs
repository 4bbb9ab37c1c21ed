//! Storage traits and implementations
//!
//! Three leaf stores hold a mailbox's data: metadata records, attachment
//! blobs, and the label index. [`KvMailStore`] composes them into the
//! [`MailStorage`] contract. Each leaf has an in-memory implementation for
//! tests and a persistent one (SQLite for metadata and the index, zstd files
//! for blobs).

mod blob;
mod blob_file;
mod cursor;
pub mod keys;
mod kv;
mod memory;
mod sqlite;
mod traits;

pub use blob::{BlobKey, BlobStore};
pub use blob_file::FileBlobStore;
pub use cursor::Cursor;
pub use kv::KvMailStore;
pub use memory::{InMemoryBlobStore, InMemoryLabelIndex, InMemoryMetadataStore};
pub use sqlite::SqliteStore;
pub use traits::{
    IdPage, KeyPage, LabelIndex, ListQuery, MailStorage, MessagePage, MetadataStore,
};
