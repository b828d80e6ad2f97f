use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::auth::RegisterCommand;
use crate::application::comments::CreateCommentCommand;
use crate::application::content::{CreateContentCommand, UpdateContentCommand};
use crate::application::market::CreateItemCommand;
use crate::application::moderation::BanCommand;
use crate::application::users::UpdateProfileCommand;

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub nickname: String,
    pub name: String,
    pub last_name: String,
    pub password: String,
}

impl From<RegisterRequest> for RegisterCommand {
    fn from(request: RegisterRequest) -> Self {
        Self {
            email: request.email,
            nickname: request.nickname,
            name: request.name,
            last_name: request.last_name,
            password: request.password,
        }
    }
}

/// `login` is an email address or a nickname.
#[derive(Debug, Deserialize, Serialize)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRequest {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub tags: Vec<Uuid>,
    pub topic: Option<Uuid>,
    pub image: Option<String>,
    pub markdown: Option<bool>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub event_date: Option<OffsetDateTime>,
    pub place: Option<String>,
}

impl From<ContentRequest> for CreateContentCommand {
    fn from(request: ContentRequest) -> Self {
        Self {
            title: request.title,
            body: request.body,
            tag_ids: request.tags,
            topic_id: request.topic,
            image: request.image,
            markdown: request.markdown,
            event_date: request.event_date,
            place: request.place,
        }
    }
}

impl From<ContentRequest> for UpdateContentCommand {
    fn from(request: ContentRequest) -> Self {
        Self {
            title: request.title,
            body: request.body,
            tag_ids: request.tags,
            topic_id: request.topic,
            markdown: request.markdown,
            event_date: request.event_date,
            place: request.place,
        }
    }
}

/// Listing filter: a topic id or an exact topic title.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TopicQuery {
    pub topic: Option<Uuid>,
    pub title: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentRequest {
    pub content_id: Uuid,
    pub body: String,
    pub reply_to: Option<Uuid>,
}

impl From<CommentRequest> for CreateCommentCommand {
    fn from(request: CommentRequest) -> Self {
        Self {
            content_id: request.content_id,
            body: request.body,
            reply_to: request.reply_to,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRequest {
    pub name: String,
    pub last_name: String,
    pub nickname: String,
    pub car: Option<String>,
}

impl From<ProfileRequest> for UpdateProfileCommand {
    fn from(request: ProfileRequest) -> Self {
        Self {
            name: request.name,
            last_name: request.last_name,
            nickname: request.nickname,
            car: request.car,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BanRequest {
    pub user_id: Uuid,
    pub reason: String,
    /// Omit for a permanent ban.
    pub days: Option<u32>,
}

impl From<BanRequest> for BanCommand {
    fn from(request: BanRequest) -> Self {
        Self {
            user_id: request.user_id,
            reason: request.reason,
            days: request.days,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct PurgeRequest {
    pub pattern: String,
}

#[derive(Debug, Serialize)]
pub struct PurgeResponse {
    pub deleted: u64,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct TopicRequest {
    pub title: String,
    pub image: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct TagRequest {
    pub title: String,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price_cents: i64,
    #[serde(default)]
    pub photos: Vec<String>,
}

impl From<ItemRequest> for CreateItemCommand {
    fn from(request: ItemRequest) -> Self {
        Self {
            title: request.title,
            description: request.description,
            price_cents: request.price_cents,
            photos: request.photos,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct MessageRequest {
    pub body: String,
}

#[derive(Debug, Serialize)]
pub struct MarkedResponse {
    pub updated: u64,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub reference: String,
}
