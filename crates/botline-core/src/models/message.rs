use chrono::{Local, TimeZone};
use serde::{Deserialize, Serialize};

/// Whether a message was received from the provider or sent by us.
/// Serialized as the legacy `out` boolean so old logs stay readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "bool", into = "bool")]
pub enum Direction {
    #[default]
    Inbound,
    Outbound,
}

impl From<bool> for Direction {
    fn from(out: bool) -> Self {
        if out {
            Direction::Outbound
        } else {
            Direction::Inbound
        }
    }
}

impl From<Direction> for bool {
    fn from(direction: Direction) -> Self {
        direction == Direction::Outbound
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    #[default]
    Text,
    Photo,
    Document,
}

/// One entry in a chat's message log.
///
/// `id` is derived from capture time in milliseconds; the store bumps it
/// when two appends land in the same millisecond, so ids are strictly
/// increasing within a chat (but not globally unique).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    #[serde(default)]
    pub text: String,
    #[serde(default, rename = "out")]
    pub direction: Direction,
    #[serde(default)]
    pub kind: MessageKind,
    /// Capture time in milliseconds since the epoch.
    #[serde(default)]
    pub created_at: i64,
    /// `HH:MM` presentation time, kept alongside the timestamp the way
    /// the log always stored it.
    #[serde(default)]
    pub time: String,
    /// Blob id in the attachment cache, present only for photo messages
    /// whose bytes were actually fetched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

impl Message {
    /// Fill presentation fields that older log entries may lack. Missing
    /// `kind`/`out` already default through serde; a missing display time
    /// is recovered from the timestamp where possible. Content fields are
    /// never altered.
    pub fn backfill(&mut self) {
        if self.time.is_empty() {
            self.time = if self.created_at > 0 {
                format_clock(self.created_at)
            } else {
                "00:00".to_string()
            };
        }
    }
}

/// `HH:MM` in local time for a millisecond timestamp.
pub(crate) fn format_clock(millis: i64) -> String {
    match Local.timestamp_millis_opt(millis) {
        chrono::LocalResult::Single(dt) => dt.format("%H:%M").to_string(),
        _ => "00:00".to_string(),
    }
}

/// What a caller hands to `Store::append_message`. The store supplies the
/// id and timestamps and persists any attached bytes before recording the
/// blob reference.
#[derive(Debug, Clone)]
pub struct MessageDraft {
    pub text: String,
    pub direction: Direction,
    pub kind: MessageKind,
    pub file_name: Option<String>,
    pub bytes: Option<Vec<u8>>,
}

impl MessageDraft {
    pub fn text(direction: Direction, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            direction,
            kind: MessageKind::Text,
            file_name: None,
            bytes: None,
        }
    }

    pub fn photo(direction: Direction, caption: Option<String>, bytes: Option<Vec<u8>>) -> Self {
        Self {
            text: caption.unwrap_or_default(),
            direction,
            kind: MessageKind::Photo,
            file_name: None,
            bytes,
        }
    }

    pub fn document(direction: Direction, file_name: impl Into<String>) -> Self {
        Self {
            text: String::new(),
            direction,
            kind: MessageKind::Document,
            file_name: Some(file_name.into()),
            bytes: None,
        }
    }
}
