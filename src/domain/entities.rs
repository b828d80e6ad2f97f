//! Domain entities mirrored from persistent storage.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::types::{ContentKind, ItemStatus, NotificationKind, Role};

pub const DEFAULT_RANK: &str = "beginner";

/// Stored account. Carries credential material, so it is never serialized
/// directly; HTTP and cache views are projected from it.
#[derive(Debug, Clone, PartialEq)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
    pub nickname: String,
    pub name: String,
    pub last_name: String,
    pub password_hash: String,
    pub role: Role,
    pub is_banned: bool,
    pub avatar: Option<String>,
    pub car: Option<String>,
    pub rank: String,
    pub reset_token_hash: Option<String>,
    pub reset_token_expires_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}

impl UserRecord {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// A post, news entry or event. The three kinds share one shape; the
/// kind-specific fields stay `None` for the others.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub id: Uuid,
    pub kind: ContentKind,
    pub author_id: Uuid,
    pub title: String,
    pub body: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub tag_ids: Vec<Uuid>,
    pub topic_id: Option<Uuid>,
    pub image: Option<String>,
    pub likes: Vec<Uuid>,
    pub views: Vec<Uuid>,
    /// News only.
    pub markdown: Option<bool>,
    /// Events only; `Some(false)` until a moderator accepts the event.
    pub accepted: Option<bool>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub event_date: Option<OffsetDateTime>,
    pub place: Option<String>,
}

impl ContentRecord {
    pub fn is_publicly_visible(&self) -> bool {
        self.accepted != Some(false)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentRecord {
    pub id: Uuid,
    pub author_id: Uuid,
    pub content_id: Uuid,
    pub reply_to: Option<Uuid>,
    pub body: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub likes: Vec<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub kind: NotificationKind,
    pub body: String,
    pub link: String,
    pub read: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BanRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub admin_id: Uuid,
    pub reason: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub expires_at: Option<OffsetDateTime>,
    pub active: bool,
}

impl BanRecord {
    /// Active and not yet past its expiry.
    pub fn is_in_force(&self, now: OffsetDateTime) -> bool {
        self.active && self.expires_at.is_none_or(|expires_at| expires_at > now)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicRecord {
    pub id: Uuid,
    pub title: String,
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagRecord {
    pub id: Uuid,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub title: String,
    pub description: String,
    pub price_cents: i64,
    pub photos: Vec<String>,
    pub status: ItemStatus,
    pub buyer_id: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender_id: Uuid,
    pub body: String,
    #[serde(with = "time::serde::rfc3339")]
    pub sent_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRecord {
    pub id: Uuid,
    pub item_id: Uuid,
    pub participants: Vec<Uuid>,
    pub messages: Vec<ChatMessage>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl ChatRecord {
    pub fn has_participant(&self, user_id: Uuid) -> bool {
        self.participants.contains(&user_id)
    }
}

#[cfg(test)]
mod tests {
    use time::Duration;

    use super::*;

    fn ban(active: bool, expires_at: Option<OffsetDateTime>) -> BanRecord {
        BanRecord {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            admin_id: Uuid::new_v4(),
            reason: "spam".to_string(),
            created_at: OffsetDateTime::now_utc(),
            expires_at,
            active,
        }
    }

    #[test]
    fn ban_in_force_until_expiry() {
        let now = OffsetDateTime::now_utc();
        assert!(ban(true, None).is_in_force(now));
        assert!(ban(true, Some(now + Duration::days(1))).is_in_force(now));
        assert!(!ban(true, Some(now - Duration::seconds(1))).is_in_force(now));
        assert!(!ban(false, None).is_in_force(now));
    }
}
