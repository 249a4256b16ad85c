//! Direction classification for free-text message tags
//!
//! The store keeps the direction as an open string. Rows written by
//! different producers use different synonyms, so the mapping below is the
//! only place that decides what counts as sent or received.

use serde::{Deserialize, Serialize};

/// Tags that mark a message as sent by the account holder
pub const OUTBOUND_TAGS: [&str; 4] = ["salida", "saliente", "sent", "outgoing"];

/// Tags that mark a message as received from the counterparty
pub const INBOUND_TAGS: [&str; 4] = ["entrada", "entrante", "received", "incoming"];

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Outbound,
    Inbound,
    Unknown,
}

impl Direction {
    /// Whether the message is drawn on the account holder's side.
    ///
    /// Only proven-outbound messages are; unknown tags render as inbound.
    pub fn renders_outbound(&self) -> bool {
        matches!(self, Direction::Outbound)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Outbound => "outbound",
            Direction::Inbound => "inbound",
            Direction::Unknown => "unknown",
        }
    }
}

/// Classify a direction tag. Case-sensitive exact match.
pub fn classify_direction(tag: &str) -> Direction {
    if OUTBOUND_TAGS.contains(&tag) {
        Direction::Outbound
    } else if INBOUND_TAGS.contains(&tag) {
        Direction::Inbound
    } else {
        Direction::Unknown
    }
}
