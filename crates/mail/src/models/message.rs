//! Message model and its metadata record codec

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

use super::{Marker, MimePart, ReservedLabel};

/// Unique identifier for a message
///
/// Generated ids are UUIDv7 in simple (hex) form: they sort
/// lexicographically by creation time, so metadata and index keys of a
/// mailbox come back in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a new time-ordered id
    pub fn generate() -> Self {
        Self(Uuid::now_v7().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the id can be embedded in storage keys and blob file names.
    ///
    /// Only ASCII alphanumerics, `-` and `_` are allowed, so the id never
    /// contains the key separator `:` or the `.` that ends it in a blob
    /// file name.
    pub fn is_storable(&self) -> bool {
        !self.0.is_empty()
            && self
                .0
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    }
}

impl From<String> for MessageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An email address with optional display name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailAddress {
    /// Email address (e.g., "john@example.com")
    pub address: String,
    /// Display name (e.g., "John Doe")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl EmailAddress {
    /// Create a new email address with just the address
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: None,
        }
    }

    /// Create a new email address with a display name
    pub fn with_name(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: Some(name.into()),
        }
    }

    /// Parse an address from a string like "John Doe <john@example.com>"
    pub fn parse(s: &str) -> Self {
        let s = s.trim();

        if let Some(angle_start) = s.rfind('<')
            && let Some(angle_end) = s.rfind('>')
            && angle_start < angle_end
        {
            let name = s[..angle_start].trim().trim_matches('"').trim();
            let address = s[angle_start + 1..angle_end].trim();
            return Self {
                address: address.to_string(),
                name: if name.is_empty() {
                    None
                } else {
                    Some(name.to_string())
                },
            };
        }

        Self::new(s)
    }

    /// Format the address for a message header
    pub fn display(&self) -> String {
        match &self.name {
            Some(name) => format!("{} <{}>", name, self.address),
            None => self.address.clone(),
        }
    }
}

/// A stored message.
///
/// This is also the shape of the metadata record: labels and markers are
/// encoded as arrays of their numeric codes, and part content is never
/// included (it lives in the blob store).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(default)]
    pub id: MessageId,
    /// Folder membership; always contains `ReservedLabel::All` once stored
    #[serde(default)]
    pub labels: BTreeSet<ReservedLabel>,
    #[serde(default)]
    pub markers: BTreeSet<Marker>,
    #[serde(default)]
    pub from: EmailAddress,
    #[serde(default)]
    pub to: Vec<EmailAddress>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_reply_to: Option<String>,
    /// Byte length of the original source
    #[serde(default)]
    pub size: u64,
    /// Attachment parts in structure order
    #[serde(default)]
    pub parts: Vec<MimePart>,
}

impl Message {
    /// Create a new message builder
    pub fn builder(id: MessageId) -> MessageBuilder {
        MessageBuilder::new(id)
    }

    pub fn add_label(&mut self, label: ReservedLabel) -> &mut Self {
        self.labels.insert(label);
        self
    }

    pub fn add_marker(&mut self, marker: Marker) -> &mut Self {
        self.markers.insert(marker);
        self
    }

    pub fn has_label(&self, label: ReservedLabel) -> bool {
        self.labels.contains(&label)
    }
}

/// Serialize a message into its metadata record
pub fn encode_message(message: &Message) -> Result<Vec<u8>> {
    serde_json::to_vec(message)
        .with_context(|| format!("Failed to encode message {}", message.id))
}

/// Rebuild a message from its metadata record.
///
/// The id always comes from the storage key, not from the record body.
pub fn decode_message(id: &MessageId, record: &[u8]) -> Result<Message> {
    let mut message: Message = serde_json::from_slice(record)
        .with_context(|| format!("Failed to decode metadata record for message {}", id))?;
    message.id = id.clone();
    Ok(message)
}

/// Builder for creating Message instances
pub struct MessageBuilder {
    id: MessageId,
    labels: BTreeSet<ReservedLabel>,
    markers: BTreeSet<Marker>,
    from: Option<EmailAddress>,
    to: Vec<EmailAddress>,
    subject: Option<String>,
    date: Option<DateTime<Utc>>,
    text: Option<String>,
    html: Option<String>,
    in_reply_to: Option<String>,
    size: u64,
    parts: Vec<MimePart>,
}

impl MessageBuilder {
    fn new(id: MessageId) -> Self {
        Self {
            id,
            labels: BTreeSet::new(),
            markers: BTreeSet::new(),
            from: None,
            to: Vec::new(),
            subject: None,
            date: None,
            text: None,
            html: None,
            in_reply_to: None,
            size: 0,
            parts: Vec::new(),
        }
    }

    pub fn label(mut self, label: ReservedLabel) -> Self {
        self.labels.insert(label);
        self
    }

    pub fn marker(mut self, marker: Marker) -> Self {
        self.markers.insert(marker);
        self
    }

    pub fn from(mut self, from: EmailAddress) -> Self {
        self.from = Some(from);
        self
    }

    pub fn to(mut self, to: Vec<EmailAddress>) -> Self {
        self.to = to;
        self
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn date(mut self, date: DateTime<Utc>) -> Self {
        self.date = Some(date);
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn html(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }

    pub fn in_reply_to(mut self, in_reply_to: impl Into<String>) -> Self {
        self.in_reply_to = Some(in_reply_to.into());
        self
    }

    pub fn size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    pub fn part(mut self, part: MimePart) -> Self {
        self.parts.push(part);
        self
    }

    pub fn build(self) -> Message {
        let mut labels = self.labels;
        labels.insert(ReservedLabel::All);

        Message {
            id: self.id,
            labels,
            markers: self.markers,
            from: self.from.unwrap_or_default(),
            to: self.to,
            subject: self.subject,
            date: self.date.unwrap_or_else(Utc::now),
            text: self.text,
            html: self.html,
            in_reply_to: self.in_reply_to,
            size: self.size,
            parts: self.parts,
        }
    }
}
