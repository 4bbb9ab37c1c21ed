//! Mailbox identity

use std::fmt;

use crate::error::{MailError, Result};

/// A tenant-scoped mailbox, identified by its normalized email address.
///
/// Equality is by id. The id is embedded in every storage key, so it can
/// never contain the key separator `:`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Mailbox {
    id: String,
}

impl Mailbox {
    /// Derive the mailbox from an account (local part) and domain name
    pub fn new(account: &str, domain: &str) -> Result<Self> {
        if account.is_empty() || domain.is_empty() {
            return Err(MailError::MalformedAddress(format!("{account}@{domain}")));
        }
        let id = format!("{}@{}", account, domain).to_lowercase();
        if id.contains(':') {
            return Err(MailError::MalformedAddress(id));
        }
        Ok(Self { id })
    }

    /// Derive the mailbox from a bare email address
    pub fn from_email(email: &str) -> Result<Self> {
        let email = email.trim();
        let (account, domain) = email
            .split_once('@')
            .ok_or_else(|| MailError::MalformedAddress(email.to_string()))?;
        Self::new(account, domain)
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}
