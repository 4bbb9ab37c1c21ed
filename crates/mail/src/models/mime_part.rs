//! Attachment parts of a message

use serde::{Deserialize, Serialize};

/// How a part is meant to be presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Disposition {
    Attachment,
    Inline,
}

/// A MIME part referenced from a message.
///
/// Parts are numbered in the order they occur in the multipart structure
/// ("1", "2", "2.1", ...). Only attachments become parts; text and HTML
/// bodies live on the message itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MimePart {
    /// Part number
    pub id: String,
    /// Size of the decoded content in bytes
    #[serde(default)]
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_id: Option<String>,
    #[serde(default)]
    pub disposition: Option<Disposition>,
    /// Raw bytes, present only until the part has been persisted.
    /// Never part of the metadata record.
    #[serde(skip)]
    pub content: Option<Vec<u8>>,
}

impl MimePart {
    /// Create a part holding content that has not been persisted yet
    pub fn new(id: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            id: id.into(),
            size: content.len() as u64,
            filename: None,
            mime_type: None,
            content_id: None,
            disposition: None,
            content: Some(content),
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn with_content_id(mut self, content_id: impl Into<String>) -> Self {
        self.content_id = Some(content_id.into());
        self
    }

    pub fn with_disposition(mut self, disposition: Disposition) -> Self {
        self.disposition = Some(disposition);
        self
    }
}
