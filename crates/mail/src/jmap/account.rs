//! Account identifiers

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{MailError, Result};
use crate::models::Mailbox;

/// A JMAP account id: the account's email address, base64url encoded
/// without padding
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn for_email(email: &str) -> Self {
        Self(URL_SAFE_NO_PAD.encode(email.trim()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decode the address and derive its mailbox
    pub fn mailbox(&self) -> Result<Mailbox> {
        let bytes = URL_SAFE_NO_PAD
            .decode(self.0.trim_end_matches('='))
            .map_err(|_| MailError::InvalidAccountId(self.0.clone()))?;
        let email = String::from_utf8(bytes).map_err(|_| MailError::InvalidAccountId(self.0.clone()))?;
        Mailbox::from_email(&email)
    }
}

impl From<String> for AccountId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for AccountId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
