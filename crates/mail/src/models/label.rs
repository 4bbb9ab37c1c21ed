//! Reserved labels (folders) and message markers
//!
//! Both enumerations have a fixed numeric encoding. The label number is part
//! of every label index key and doubles as the protocol mailbox id, so the
//! discriminants must never change.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Built-in folder labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum ReservedLabel {
    All = 0,
    Inbox = 1,
    Drafts = 2,
    Sent = 3,
    Deleted = 4,
}

impl ReservedLabel {
    /// Every reserved label, in numeric order
    pub const ALL: [ReservedLabel; 5] = [
        ReservedLabel::All,
        ReservedLabel::Inbox,
        ReservedLabel::Drafts,
        ReservedLabel::Sent,
        ReservedLabel::Deleted,
    ];

    /// Numeric encoding used in storage keys
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Human-readable folder name
    pub fn name(self) -> &'static str {
        match self {
            ReservedLabel::All => "All Mail",
            ReservedLabel::Inbox => "Inbox",
            ReservedLabel::Drafts => "Drafts",
            ReservedLabel::Sent => "Sent",
            ReservedLabel::Deleted => "Deleted",
        }
    }
}

impl TryFrom<u8> for ReservedLabel {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        ReservedLabel::ALL
            .into_iter()
            .find(|label| label.as_u8() == value)
            .ok_or(value)
    }
}

impl FromStr for ReservedLabel {
    type Err = String;

    /// Parse a protocol mailbox id ("0".."4")
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u8>()
            .ok()
            .and_then(|n| ReservedLabel::try_from(n).ok())
            .ok_or_else(|| format!("unknown mailbox id {s:?}"))
    }
}

impl fmt::Display for ReservedLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

impl Serialize for ReservedLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for ReservedLabel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = u8::deserialize(deserializer)?;
        ReservedLabel::try_from(value)
            .map_err(|n| D::Error::custom(format!("unknown reserved label {n}")))
    }
}

/// Message flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Marker {
    Seen = 0,
    Flagged = 1,
    Answered = 2,
}

impl Marker {
    pub const ALL: [Marker; 3] = [Marker::Seen, Marker::Flagged, Marker::Answered];

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Protocol keyword for this marker
    pub fn keyword(self) -> &'static str {
        match self {
            Marker::Seen => "$seen",
            Marker::Flagged => "$flagged",
            Marker::Answered => "$answered",
        }
    }
}

impl TryFrom<u8> for Marker {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Marker::ALL
            .into_iter()
            .find(|marker| marker.as_u8() == value)
            .ok_or(value)
    }
}

impl Serialize for Marker {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for Marker {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = u8::deserialize(deserializer)?;
        Marker::try_from(value).map_err(|n| D::Error::custom(format!("unknown marker {n}")))
    }
}
