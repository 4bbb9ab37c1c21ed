//! Domain models for mailbox entities

mod label;
mod mailbox;
mod message;
mod mime_part;

pub use label::{Marker, ReservedLabel};
pub use mailbox::Mailbox;
pub use message::{
    EmailAddress, Message, MessageBuilder, MessageId, decode_message, encode_message,
};
pub use mime_part::{Disposition, MimePart};
