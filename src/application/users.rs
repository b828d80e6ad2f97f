use std::sync::Arc;

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::error::AppError;
use crate::application::identity::Principal;
use crate::application::repos::{CommentsRepo, ContentRepo, UpdateProfileParams, UsersRepo};
use crate::application::views::{PublicProfile, UserInfo};
use crate::cache::{CacheCoordinator, Mutation};
use crate::domain::types::ContentKind;

pub const ACTIVITY_LIMIT: u32 = 3;

#[derive(Debug, Clone)]
pub struct UpdateProfileCommand {
    pub name: String,
    pub last_name: String,
    pub nickname: String,
    pub car: Option<String>,
}

/// The content item a recent comment was left on.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySubject {
    pub id: Uuid,
    pub kind: ContentKind,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub comment_id: Uuid,
    pub body: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub content: Option<ActivitySubject>,
}

#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UsersRepo>,
    comments: Arc<dyn CommentsRepo>,
    content: Arc<dyn ContentRepo>,
    cache: Arc<CacheCoordinator>,
}

impl UserService {
    pub fn new(
        users: Arc<dyn UsersRepo>,
        comments: Arc<dyn CommentsRepo>,
        content: Arc<dyn ContentRepo>,
        cache: Arc<CacheCoordinator>,
    ) -> Self {
        Self {
            users,
            comments,
            content,
            cache,
        }
    }

    pub async fn profile(&self, id: Uuid) -> Result<PublicProfile, AppError> {
        self.users
            .find_by_id(id)
            .await?
            .as_ref()
            .map(PublicProfile::from)
            .ok_or_else(|| AppError::not_found("user"))
    }

    pub async fn update_profile(
        &self,
        principal: &Principal,
        command: UpdateProfileCommand,
    ) -> Result<UserInfo, AppError> {
        let nickname = command.nickname.trim().to_string();
        if nickname.is_empty() {
            return Err(AppError::validation("nickname must not be empty"));
        }
        if command.name.trim().is_empty() {
            return Err(AppError::validation("name must not be empty"));
        }
        if let Some(holder) = self.users.find_by_login(&nickname).await?
            && holder.id != principal.user_id
        {
            return Err(AppError::conflict("nickname is already taken"));
        }

        let user = self
            .users
            .update_profile(UpdateProfileParams {
                id: principal.user_id,
                name: command.name.trim().to_string(),
                last_name: command.last_name.trim().to_string(),
                nickname,
                car: command
                    .car
                    .map(|car| car.trim().to_string())
                    .filter(|car| !car.is_empty()),
            })
            .await?;

        self.cache
            .apply(&Mutation::ProfileChanged { user_id: user.id })
            .await;
        Ok(UserInfo::from(&user))
    }

    pub async fn update_avatar(
        &self,
        principal: &Principal,
        avatar: &str,
    ) -> Result<UserInfo, AppError> {
        let user = self.users.update_avatar(principal.user_id, avatar).await?;
        self.cache
            .apply(&Mutation::ProfileChanged { user_id: user.id })
            .await;
        Ok(UserInfo::from(&user))
    }

    /// The user's most recent comments with the items they were left on.
    pub async fn last_activity(&self, user_id: Uuid) -> Result<Vec<ActivityEntry>, AppError> {
        if self.users.find_by_id(user_id).await?.is_none() {
            return Err(AppError::not_found("user"));
        }

        let comments = self
            .comments
            .latest_by_author(user_id, ACTIVITY_LIMIT)
            .await?;
        let mut entries = Vec::with_capacity(comments.len());
        for comment in comments {
            let content = self
                .content
                .locate_content(comment.content_id)
                .await?
                .map(|record| ActivitySubject {
                    id: record.id,
                    kind: record.kind,
                    title: record.title,
                });
            entries.push(ActivityEntry {
                comment_id: comment.id,
                body: comment.body,
                created_at: comment.created_at,
                content,
            });
        }
        Ok(entries)
    }
}
