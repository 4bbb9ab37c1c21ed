//! Opaque pagination cursors
//!
//! A cursor wraps the last label index key of a page, base64url encoded.
//! Listing resumes strictly after that key.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{MailError, Result};

/// Continuation token returned by a listing call
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    /// Cursor resuming after the given index key
    pub(crate) fn after_key(key: &str) -> Self {
        Self(URL_SAFE_NO_PAD.encode(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decode the index key to resume after.
    ///
    /// A scoped listing only accepts cursors minted under the same prefix.
    pub(crate) fn resume_key(&self, prefix: Option<&str>) -> Result<String> {
        let bytes = URL_SAFE_NO_PAD
            .decode(&self.0)
            .map_err(|_| MailError::InvalidCursor(self.0.clone()))?;
        let key = String::from_utf8(bytes).map_err(|_| MailError::InvalidCursor(self.0.clone()))?;

        match prefix {
            Some(prefix) if !key.starts_with(prefix) => Err(MailError::InvalidCursor(self.0.clone())),
            _ => Ok(key),
        }
    }
}

impl From<String> for Cursor {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Cursor {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
