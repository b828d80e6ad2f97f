use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::application::content::LikeState;
use crate::application::error::AppError;
use crate::application::identity::{Principal, can_see};
use crate::application::notifications::NotificationDispatcher;
use crate::application::repos::{CommentsRepo, ContentRepo, CreateCommentParams, UsersRepo};
use crate::application::views::{AuthorSummary, author_index};
use crate::cache::{CacheCoordinator, CacheKey, Mutation};
use crate::domain::entities::CommentRecord;
use crate::domain::interactions::validate_reply;

const TARGET: &str = "agora::application::comments";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: Uuid,
    pub content_id: Uuid,
    pub reply_to: Option<Uuid>,
    pub body: String,
    pub author_id: Uuid,
    pub author: Option<AuthorSummary>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub likes: Vec<Uuid>,
}

impl CommentView {
    fn from_record(record: CommentRecord, author: Option<AuthorSummary>) -> Self {
        Self {
            id: record.id,
            content_id: record.content_id,
            reply_to: record.reply_to,
            body: record.body,
            author_id: record.author_id,
            author,
            created_at: record.created_at,
            likes: record.likes,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateCommentCommand {
    pub content_id: Uuid,
    pub body: String,
    pub reply_to: Option<Uuid>,
}

#[derive(Clone)]
pub struct CommentService {
    comments: Arc<dyn CommentsRepo>,
    content: Arc<dyn ContentRepo>,
    users: Arc<dyn UsersRepo>,
    cache: Arc<CacheCoordinator>,
    dispatcher: NotificationDispatcher,
}

impl CommentService {
    pub fn new(
        comments: Arc<dyn CommentsRepo>,
        content: Arc<dyn ContentRepo>,
        users: Arc<dyn UsersRepo>,
        cache: Arc<CacheCoordinator>,
        dispatcher: NotificationDispatcher,
    ) -> Self {
        Self {
            comments,
            content,
            users,
            cache,
            dispatcher,
        }
    }

    pub async fn create(
        &self,
        principal: &Principal,
        command: CreateCommentCommand,
    ) -> Result<CommentView, AppError> {
        if command.body.trim().is_empty() {
            return Err(AppError::validation("body must not be empty"));
        }

        let content = self
            .content
            .locate_content(command.content_id)
            .await?
            .filter(|content| can_see(Some(principal), content))
            .ok_or_else(|| AppError::not_found("content"))?;
        let commenter = self
            .users
            .find_by_id(principal.user_id)
            .await?
            .ok_or(AppError::Unauthorized)?;

        let id = Uuid::new_v4();
        let parent = match command.reply_to {
            Some(reply_to) => {
                let parent = self.comments.find_comment(reply_to).await?;
                validate_reply(id, content.id, reply_to, parent.as_ref())?;
                parent
            }
            None => None,
        };

        let record = self
            .comments
            .create_comment(CreateCommentParams {
                id,
                author_id: commenter.id,
                content_id: content.id,
                reply_to: command.reply_to,
                body: command.body,
            })
            .await?;

        self.cache
            .apply(&Mutation::CommentCreated {
                kind: content.kind,
                content_id: content.id,
            })
            .await;

        let notified = self
            .dispatcher
            .comment_created(&commenter, &content, &record, parent.as_ref())
            .await;
        info!(
            target: TARGET,
            comment = %record.id,
            content = %content.id,
            reply = record.reply_to.is_some(),
            notified = notified.len(),
            "comment created"
        );

        Ok(CommentView::from_record(
            record,
            Some(AuthorSummary::from(&commenter)),
        ))
    }

    /// Comments on a content item, oldest first, cached under `comments:<id>`.
    /// The thread is shared by every viewer, so visibility is checked before
    /// the cache is consulted.
    pub async fn list(
        &self,
        viewer: Option<&Principal>,
        content_id: Uuid,
    ) -> Result<Vec<CommentView>, AppError> {
        self.require_visible_content(viewer, content_id).await?;
        let ttl = self.cache.config().comments_ttl();
        self.cache
            .read_through(&CacheKey::Comments(content_id), ttl, || async {
                if self.content.locate_content(content_id).await?.is_none() {
                    return Ok::<_, AppError>(None);
                }
                let records = self.comments.list_for_content(content_id).await?;
                let authors =
                    author_index(self.users.as_ref(), records.iter().map(|record| record.author_id))
                        .await?;
                Ok(Some(
                    records
                        .into_iter()
                        .map(|record| {
                            let author = authors.get(&record.author_id).cloned();
                            CommentView::from_record(record, author)
                        })
                        .collect::<Vec<_>>(),
                ))
            })
            .await?
            .ok_or_else(|| AppError::not_found("content"))
    }

    pub async fn like(&self, principal: &Principal, id: Uuid) -> Result<LikeState, AppError> {
        let comment = self.require_comment(id).await?;
        self.require_visible_content(Some(principal), comment.content_id).await?;
        let likes = self
            .comments
            .toggle_like(id, principal.user_id)
            .await?
            .ok_or_else(|| AppError::not_found("comment"))?;

        self.cache
            .apply(&Mutation::CommentLiked {
                content_id: comment.content_id,
            })
            .await;

        Ok(LikeState {
            liked: likes.contains(&principal.user_id),
            likes,
        })
    }

    pub async fn delete(&self, principal: &Principal, id: Uuid) -> Result<(), AppError> {
        let comment = self.require_comment(id).await?;
        principal.require_owner_or_admin(comment.author_id)?;

        if !self.comments.delete_comment(id).await? {
            return Err(AppError::not_found("comment"));
        }

        match self.content.locate_content(comment.content_id).await? {
            Some(content) => {
                self.cache
                    .apply(&Mutation::CommentDeleted {
                        kind: content.kind,
                        content_id: content.id,
                    })
                    .await;
            }
            None => {
                self.cache
                    .invalidate(&[CacheKey::Comments(comment.content_id)])
                    .await;
            }
        }
        Ok(())
    }

    async fn require_visible_content(
        &self,
        viewer: Option<&Principal>,
        content_id: Uuid,
    ) -> Result<(), AppError> {
        match self.content.locate_content(content_id).await? {
            Some(content) if can_see(viewer, &content) => Ok(()),
            _ => Err(AppError::not_found("content")),
        }
    }

    async fn require_comment(&self, id: Uuid) -> Result<CommentRecord, AppError> {
        self.comments
            .find_comment(id)
            .await?
            .ok_or_else(|| AppError::not_found("comment"))
    }
}
