//! Storage key scheme
//!
//! ```text
//! metadata     <mailbox>:<message>
//! blob         <mailbox>:<message>:<part>
//! label index  <mailbox>:<label>:<message>
//! ```
//!
//! Mailbox ids never contain `:` and stored message ids never do either
//! (see [`MessageId::is_storable`]), so the last segment of an index key is
//! always the message id.

use std::ops::Bound;

use crate::models::{MessageId, ReservedLabel};

pub const SEPARATOR: char = ':';

/// Key of a message's metadata record
pub fn metadata_key(mailbox_id: &str, message_id: &MessageId) -> String {
    format!("{}{SEPARATOR}{}", mailbox_id, message_id.as_str())
}

/// Key of a label index entry
pub fn label_key(mailbox_id: &str, label: ReservedLabel, message_id: &MessageId) -> String {
    format!("{}{SEPARATOR}{}{SEPARATOR}{}", mailbox_id, label, message_id.as_str())
}

/// Prefix shared by every index entry of one folder in one mailbox
pub fn label_prefix(mailbox_id: &str, label: ReservedLabel) -> String {
    format!("{}{SEPARATOR}{}{SEPARATOR}", mailbox_id, label)
}

/// The components of a label index key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelKey<'a> {
    pub mailbox_id: &'a str,
    pub label: &'a str,
    pub message_id: &'a str,
}

/// Split a label index key into its components
pub fn parse_label_key(key: &str) -> Option<LabelKey<'_>> {
    let mut segments = key.rsplitn(3, SEPARATOR);
    let message_id = segments.next()?;
    let label = segments.next()?;
    let mailbox_id = segments.next()?;
    if message_id.is_empty() || mailbox_id.is_empty() {
        return None;
    }
    Some(LabelKey {
        mailbox_id,
        label,
        message_id,
    })
}

/// Where an ordered listing begins: after the resume key, or at the
/// prefix when there is no resume key or it sorts before the prefix.
pub fn listing_start<'a>(prefix: Option<&'a str>, start_after: Option<&'a str>) -> Bound<&'a str> {
    match (prefix, start_after) {
        (Some(p), Some(after)) if after < p => Bound::Included(p),
        (_, Some(after)) => Bound::Excluded(after),
        (Some(p), None) => Bound::Included(p),
        (None, None) => Bound::Unbounded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_formats() {
        let id = MessageId::new("01abc");
        assert_eq!(metadata_key("a@b.com", &id), "a@b.com:01abc");
        assert_eq!(label_key("a@b.com", ReservedLabel::Inbox, &id), "a@b.com:1:01abc");
        assert_eq!(label_prefix("a@b.com", ReservedLabel::All), "a@b.com:0:");
    }

    #[test]
    fn test_parse_label_key() {
        let key = parse_label_key("a@b.com:2:01abc").unwrap();
        assert_eq!(key.mailbox_id, "a@b.com");
        assert_eq!(key.label, "2");
        assert_eq!(key.message_id, "01abc");
    }

    #[test]
    fn test_listing_start() {
        assert_eq!(listing_start(Some("a:0:"), None), Bound::Included("a:0:"));
        assert_eq!(listing_start(Some("a:0:"), Some("a:0:m1")), Bound::Excluded("a:0:m1"));
        assert_eq!(listing_start(Some("a:1:"), Some("a:0:m1")), Bound::Included("a:1:"));
        assert_eq!(listing_start(None, None), Bound::Unbounded);
    }

    #[test]
    fn test_parse_rejects_short_keys() {
        assert!(parse_label_key("a@b.com:01abc").is_none());
        assert!(parse_label_key("a@b.com:1:").is_none());
    }
}
