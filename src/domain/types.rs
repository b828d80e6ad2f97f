//! Shared domain enumerations aligned with persisted database enums.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The three structurally identical kinds of publishable content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "content_kind", rename_all = "snake_case")]
pub enum ContentKind {
    Post,
    News,
    Event,
}

impl ContentKind {
    pub const ALL: [ContentKind; 3] = [ContentKind::Post, ContentKind::News, ContentKind::Event];

    pub fn as_str(self) -> &'static str {
        match self {
            ContentKind::Post => "post",
            ContentKind::News => "news",
            ContentKind::Event => "event",
        }
    }

    /// Path segment used by client-facing links (`/posts/<id>`).
    pub fn route_segment(self) -> &'static str {
        match self {
            ContentKind::Post => "posts",
            ContentKind::News => "news",
            ContentKind::Event => "events",
        }
    }

    /// Only events go through moderation before they are listed publicly.
    pub fn requires_acceptance(self) -> bool {
        matches!(self, ContentKind::Event)
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "post" | "posts" => Ok(ContentKind::Post),
            "news" => Ok(ContentKind::News),
            "event" | "events" => Ok(ContentKind::Event),
            other => Err(format!("unknown content kind `{other}`")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "notification_kind", rename_all = "snake_case")]
pub enum NotificationKind {
    Comment,
    Reply,
    Like,
    Mention,
    System,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::Comment => "comment",
            NotificationKind::Reply => "reply",
            NotificationKind::Like => "like",
            NotificationKind::Mention => "mention",
            NotificationKind::System => "system",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "item_status", rename_all = "snake_case")]
pub enum ItemStatus {
    #[default]
    Available,
    Sold,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_kind_parses_singular_and_route_forms() {
        assert_eq!("post".parse::<ContentKind>(), Ok(ContentKind::Post));
        assert_eq!("posts".parse::<ContentKind>(), Ok(ContentKind::Post));
        assert_eq!("events".parse::<ContentKind>(), Ok(ContentKind::Event));
        assert!("pages".parse::<ContentKind>().is_err());
    }

    #[test]
    fn only_events_require_acceptance() {
        assert!(ContentKind::Event.requires_acceptance());
        assert!(!ContentKind::Post.requires_acceptance());
        assert!(!ContentKind::News.requires_acceptance());
    }
}
