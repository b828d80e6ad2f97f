//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::entities::{
    BanRecord, ChatMessage, ChatRecord, CommentRecord, ContentRecord, ItemRecord,
    NotificationRecord, TagRecord, TopicRecord, UserRecord,
};
use crate::domain::types::{ContentKind, NotificationKind, Role};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }

    pub fn duplicate(constraint: impl Into<String>) -> Self {
        Self::Duplicate {
            constraint: constraint.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateUserParams {
    pub email: String,
    pub nickname: String,
    pub name: String,
    pub last_name: String,
    pub password_hash: String,
    pub role: Role,
}

#[derive(Debug, Clone)]
pub struct UpdateProfileParams {
    pub id: Uuid,
    pub name: String,
    pub last_name: String,
    pub nickname: String,
    pub car: Option<String>,
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError>;

    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<UserRecord>, RepoError>;

    /// Match on email or nickname.
    async fn find_by_login(&self, login: &str) -> Result<Option<UserRecord>, RepoError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepoError>;

    async fn find_by_reset_token(&self, token_hash: &str)
    -> Result<Option<UserRecord>, RepoError>;

    async fn update_profile(&self, params: UpdateProfileParams) -> Result<UserRecord, RepoError>;

    async fn update_avatar(&self, id: Uuid, avatar: &str) -> Result<UserRecord, RepoError>;

    async fn set_banned(&self, id: Uuid, banned: bool) -> Result<(), RepoError>;

    async fn set_role(&self, id: Uuid, role: Role) -> Result<(), RepoError>;

    async fn set_reset_token(
        &self,
        id: Uuid,
        token_hash: &str,
        expires_at: OffsetDateTime,
    ) -> Result<(), RepoError>;

    /// Store a new password hash and clear any pending reset token.
    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), RepoError>;

    async fn count_users(&self) -> Result<u64, RepoError>;
}

#[derive(Debug, Clone)]
pub struct CreateContentParams {
    pub kind: ContentKind,
    pub author_id: Uuid,
    pub title: String,
    pub body: String,
    pub tag_ids: Vec<Uuid>,
    pub topic_id: Option<Uuid>,
    pub image: Option<String>,
    pub markdown: Option<bool>,
    pub accepted: Option<bool>,
    pub event_date: Option<OffsetDateTime>,
    pub place: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UpdateContentParams {
    pub kind: ContentKind,
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub tag_ids: Vec<Uuid>,
    pub topic_id: Option<Uuid>,
    pub markdown: Option<bool>,
    pub event_date: Option<OffsetDateTime>,
    pub place: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentScope {
    /// Everything publicly visible.
    Public,
    /// Publicly visible items attached to a topic.
    Topic(Uuid),
    /// Items awaiting moderation.
    Unaccepted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewOutcome {
    /// The view was recorded; carries the resulting view set.
    Recorded(Vec<Uuid>),
    AlreadyViewed,
    Missing,
}

#[async_trait]
pub trait ContentRepo: Send + Sync {
    async fn create_content(&self, params: CreateContentParams)
    -> Result<ContentRecord, RepoError>;

    async fn find_content(
        &self,
        kind: ContentKind,
        id: Uuid,
    ) -> Result<Option<ContentRecord>, RepoError>;

    /// Find an item of any kind.
    async fn locate_content(&self, id: Uuid) -> Result<Option<ContentRecord>, RepoError>;

    /// Items of `kind` in scope, newest first.
    async fn list_content(
        &self,
        kind: ContentKind,
        scope: ContentScope,
    ) -> Result<Vec<ContentRecord>, RepoError>;

    async fn update_content(&self, params: UpdateContentParams)
    -> Result<ContentRecord, RepoError>;

    async fn set_image(
        &self,
        kind: ContentKind,
        id: Uuid,
        image: &str,
    ) -> Result<ContentRecord, RepoError>;

    async fn accept_event(&self, id: Uuid) -> Result<ContentRecord, RepoError>;

    /// Atomically flip `user_id` in the like set, returning the new set or
    /// `None` when the item does not exist.
    async fn toggle_like(
        &self,
        kind: ContentKind,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Vec<Uuid>>, RepoError>;

    /// Atomically add `user_id` to the view set unless already present.
    async fn record_view(
        &self,
        kind: ContentKind,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<ViewOutcome, RepoError>;

    async fn delete_content(&self, kind: ContentKind, id: Uuid) -> Result<bool, RepoError>;

    async fn count_content(&self, kind: ContentKind) -> Result<u64, RepoError>;
}

#[derive(Debug, Clone)]
pub struct CreateCommentParams {
    pub id: Uuid,
    pub author_id: Uuid,
    pub content_id: Uuid,
    pub reply_to: Option<Uuid>,
    pub body: String,
}

#[async_trait]
pub trait CommentsRepo: Send + Sync {
    async fn create_comment(&self, params: CreateCommentParams)
    -> Result<CommentRecord, RepoError>;

    async fn find_comment(&self, id: Uuid) -> Result<Option<CommentRecord>, RepoError>;

    /// Comments on a content item, oldest first.
    async fn list_for_content(&self, content_id: Uuid) -> Result<Vec<CommentRecord>, RepoError>;

    async fn latest_by_author(
        &self,
        author_id: Uuid,
        limit: u32,
    ) -> Result<Vec<CommentRecord>, RepoError>;

    async fn toggle_like(&self, id: Uuid, user_id: Uuid)
    -> Result<Option<Vec<Uuid>>, RepoError>;

    async fn delete_comment(&self, id: Uuid) -> Result<bool, RepoError>;

    async fn delete_for_content(&self, content_id: Uuid) -> Result<u64, RepoError>;
}

#[derive(Debug, Clone)]
pub struct CreateNotificationParams {
    pub recipient_id: Uuid,
    pub kind: NotificationKind,
    pub body: String,
    pub link: String,
}

#[async_trait]
pub trait NotificationsRepo: Send + Sync {
    async fn create_notification(
        &self,
        params: CreateNotificationParams,
    ) -> Result<NotificationRecord, RepoError>;

    /// Most recent first.
    async fn list_for_user(
        &self,
        recipient_id: Uuid,
        limit: u32,
    ) -> Result<Vec<NotificationRecord>, RepoError>;

    /// Scoped to the recipient; `false` when no such notification is theirs.
    async fn mark_read(&self, recipient_id: Uuid, id: Uuid) -> Result<bool, RepoError>;

    async fn mark_all_read(&self, recipient_id: Uuid) -> Result<u64, RepoError>;

    async fn delete_notification(&self, recipient_id: Uuid, id: Uuid) -> Result<bool, RepoError>;
}

#[derive(Debug, Clone)]
pub struct CreateBanParams {
    pub user_id: Uuid,
    pub admin_id: Uuid,
    pub reason: String,
    pub expires_at: Option<OffsetDateTime>,
}

#[async_trait]
pub trait BansRepo: Send + Sync {
    async fn create_ban(&self, params: CreateBanParams) -> Result<BanRecord, RepoError>;

    async fn find_active_for_user(&self, user_id: Uuid) -> Result<Option<BanRecord>, RepoError>;

    async fn deactivate_ban(&self, id: Uuid) -> Result<(), RepoError>;

    async fn list_active(&self) -> Result<Vec<BanRecord>, RepoError>;
}

#[async_trait]
pub trait TaxonomyRepo: Send + Sync {
    async fn list_topics(&self) -> Result<Vec<TopicRecord>, RepoError>;

    async fn find_topic(&self, id: Uuid) -> Result<Option<TopicRecord>, RepoError>;

    async fn find_topic_by_title(&self, title: &str) -> Result<Option<TopicRecord>, RepoError>;

    async fn create_topic(
        &self,
        title: &str,
        image: Option<&str>,
    ) -> Result<TopicRecord, RepoError>;

    async fn count_topics(&self) -> Result<u64, RepoError>;

    async fn list_tags(&self) -> Result<Vec<TagRecord>, RepoError>;

    async fn find_tags(&self, ids: &[Uuid]) -> Result<Vec<TagRecord>, RepoError>;

    async fn create_tag(&self, title: &str) -> Result<TagRecord, RepoError>;
}

#[derive(Debug, Clone)]
pub struct CreateItemParams {
    pub seller_id: Uuid,
    pub title: String,
    pub description: String,
    pub price_cents: i64,
    pub photos: Vec<String>,
}

#[async_trait]
pub trait MarketRepo: Send + Sync {
    async fn create_item(&self, params: CreateItemParams) -> Result<ItemRecord, RepoError>;

    async fn find_item(&self, id: Uuid) -> Result<Option<ItemRecord>, RepoError>;

    async fn list_available(&self) -> Result<Vec<ItemRecord>, RepoError>;

    async fn list_by_seller(&self, seller_id: Uuid) -> Result<Vec<ItemRecord>, RepoError>;

    /// Sell an available item; `None` when it was already sold or is missing.
    async fn mark_sold(&self, id: Uuid, buyer_id: Uuid) -> Result<Option<ItemRecord>, RepoError>;

    async fn create_chat(
        &self,
        item_id: Uuid,
        participants: &[Uuid],
    ) -> Result<ChatRecord, RepoError>;

    async fn find_chat(&self, id: Uuid) -> Result<Option<ChatRecord>, RepoError>;

    /// Existing chat about `item_id` between exactly these two users.
    async fn find_chat_between(
        &self,
        item_id: Uuid,
        first: Uuid,
        second: Uuid,
    ) -> Result<Option<ChatRecord>, RepoError>;

    async fn list_chats_for_user(&self, user_id: Uuid) -> Result<Vec<ChatRecord>, RepoError>;

    async fn append_message(
        &self,
        chat_id: Uuid,
        message: ChatMessage,
    ) -> Result<Option<ChatRecord>, RepoError>;
}
