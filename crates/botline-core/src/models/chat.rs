use serde::{Deserialize, Serialize};

/// Provider-side chat classification. Unknown values deserialize to
/// `Unknown` so new provider types never break old data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    #[default]
    Private,
    Group,
    Supergroup,
    Channel,
    #[serde(other)]
    Unknown,
}

impl ChatKind {
    pub fn from_provider(kind: &str) -> Self {
        match kind {
            "private" => ChatKind::Private,
            "group" => ChatKind::Group,
            "supergroup" => ChatKind::Supergroup,
            "channel" => ChatKind::Channel,
            _ => ChatKind::Unknown,
        }
    }
}

/// A chat as known locally. Created on the first inbound event that
/// references it, merged (never blanked) on every later one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Chat {
    pub id: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub kind: ChatKind,
    /// Millisecond timestamp of the most recent activity in this chat.
    #[serde(default)]
    pub last_activity: i64,
}

impl Chat {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Name shown in a chat list: "first last", falling back to the
    /// username and finally the chat id. Never empty for a valid chat.
    pub fn display_name(&self) -> String {
        let name = format!("{} {}", self.first_name, self.last_name);
        let name = name.trim();
        if !name.is_empty() {
            return name.to_string();
        }
        if !self.username.is_empty() {
            return self.username.clone();
        }
        self.id.clone()
    }

    /// Merge `other` into `self`, filling only empty fields. Populated
    /// fields are never overwritten with blanks. `last_activity` keeps
    /// the most recent of the two.
    pub fn merge_from(&mut self, other: &Chat) {
        if self.first_name.is_empty() && !other.first_name.is_empty() {
            self.first_name = other.first_name.clone();
        }
        if self.last_name.is_empty() && !other.last_name.is_empty() {
            self.last_name = other.last_name.clone();
        }
        if self.username.is_empty() && !other.username.is_empty() {
            self.username = other.username.clone();
        }
        if self.last_activity < other.last_activity {
            self.last_activity = other.last_activity;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_prefers_real_name() {
        let chat = Chat {
            id: "7".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            username: "ada".to_string(),
            ..Default::default()
        };
        assert_eq!(chat.display_name(), "Ada Lovelace");
    }

    #[test]
    fn test_display_name_falls_back_to_username_then_id() {
        let mut chat = Chat::new("42");
        chat.username = "bot_fan".to_string();
        assert_eq!(chat.display_name(), "bot_fan");

        chat.username.clear();
        assert_eq!(chat.display_name(), "42");
    }

    #[test]
    fn test_merge_fills_gaps_only() {
        let mut chat = Chat {
            id: "7".to_string(),
            first_name: "A".to_string(),
            ..Default::default()
        };
        chat.merge_from(&Chat {
            id: "7".to_string(),
            first_name: String::new(),
            username: "b".to_string(),
            ..Default::default()
        });
        assert_eq!(chat.first_name, "A");
        assert_eq!(chat.username, "b");
    }

    #[test]
    fn test_merge_keeps_latest_activity() {
        let mut chat = Chat::new("7");
        chat.last_activity = 100;
        chat.merge_from(&Chat {
            id: "7".to_string(),
            last_activity: 50,
            ..Default::default()
        });
        assert_eq!(chat.last_activity, 100);

        chat.merge_from(&Chat {
            id: "7".to_string(),
            last_activity: 200,
            ..Default::default()
        });
        assert_eq!(chat.last_activity, 200);
    }

    #[test]
    fn test_chat_kind_from_provider() {
        assert_eq!(ChatKind::from_provider("private"), ChatKind::Private);
        assert_eq!(ChatKind::from_provider("supergroup"), ChatKind::Supergroup);
        assert_eq!(ChatKind::from_provider("whatever"), ChatKind::Unknown);
    }
}
