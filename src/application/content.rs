//! Posts, news and events: cached reads and the writes that keep them fresh.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::application::error::AppError;
use crate::application::identity::{Principal, can_see};
use crate::application::repos::{
    CommentsRepo, ContentRepo, ContentScope, CreateContentParams, TaxonomyRepo,
    UpdateContentParams, UsersRepo, ViewOutcome,
};
use crate::application::views::{AuthorSummary, author_index};
use crate::cache::{CacheCoordinator, CacheKey, Mutation};
use crate::domain::entities::{ContentRecord, TagRecord, TopicRecord};
use crate::domain::interactions::ALREADY_VIEWED;
use crate::domain::types::ContentKind;

const TARGET: &str = "agora::application::content";

/// Full content item as served and cached under `post:<id>` and friends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentDetail {
    pub id: Uuid,
    pub kind: ContentKind,
    pub title: String,
    pub body: String,
    pub author_id: Uuid,
    pub author: Option<AuthorSummary>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub tags: Vec<TagRecord>,
    pub topic: Option<TopicRecord>,
    pub image: Option<String>,
    pub likes: Vec<Uuid>,
    pub views: Vec<Uuid>,
    pub markdown: Option<bool>,
    pub accepted: Option<bool>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub event_date: Option<OffsetDateTime>,
    pub place: Option<String>,
}

impl ContentDetail {
    fn visible_to(&self, viewer: Option<&Principal>) -> bool {
        if self.accepted != Some(false) {
            return true;
        }
        viewer.is_some_and(|viewer| viewer.is_admin() || viewer.user_id == self.author_id)
    }
}

/// Listing row; cached as part of `allPosts`, `topicPosts:<id>` and friends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentSummary {
    pub id: Uuid,
    pub kind: ContentKind,
    pub title: String,
    pub author: Option<AuthorSummary>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub image: Option<String>,
    pub topic_id: Option<Uuid>,
    pub tag_ids: Vec<Uuid>,
    pub like_count: usize,
    pub view_count: usize,
    pub accepted: Option<bool>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub event_date: Option<OffsetDateTime>,
    pub place: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeState {
    pub liked: bool,
    pub likes: Vec<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewState {
    pub views: Vec<Uuid>,
}

/// How a caller names a topic in listing requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicRef {
    Id(Uuid),
    Title(String),
}

#[derive(Debug, Clone, Default)]
pub struct CreateContentCommand {
    pub title: String,
    pub body: String,
    pub tag_ids: Vec<Uuid>,
    pub topic_id: Option<Uuid>,
    pub image: Option<String>,
    pub markdown: Option<bool>,
    pub event_date: Option<OffsetDateTime>,
    pub place: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateContentCommand {
    pub title: String,
    pub body: String,
    pub tag_ids: Vec<Uuid>,
    pub topic_id: Option<Uuid>,
    pub markdown: Option<bool>,
    pub event_date: Option<OffsetDateTime>,
    pub place: Option<String>,
}

#[derive(Clone)]
pub struct ContentService {
    content: Arc<dyn ContentRepo>,
    comments: Arc<dyn CommentsRepo>,
    users: Arc<dyn UsersRepo>,
    taxonomy: Arc<dyn TaxonomyRepo>,
    cache: Arc<CacheCoordinator>,
}

impl ContentService {
    pub fn new(
        content: Arc<dyn ContentRepo>,
        comments: Arc<dyn CommentsRepo>,
        users: Arc<dyn UsersRepo>,
        taxonomy: Arc<dyn TaxonomyRepo>,
        cache: Arc<CacheCoordinator>,
    ) -> Self {
        Self {
            content,
            comments,
            users,
            taxonomy,
            cache,
        }
    }

    pub async fn create(
        &self,
        principal: &Principal,
        kind: ContentKind,
        command: CreateContentCommand,
    ) -> Result<ContentDetail, AppError> {
        ensure_non_empty(&command.title, "title")?;
        ensure_non_empty(&command.body, "body")?;
        self.ensure_topic_exists(command.topic_id).await?;

        let is_event = kind == ContentKind::Event;
        let record = self
            .content
            .create_content(CreateContentParams {
                kind,
                author_id: principal.user_id,
                title: command.title.trim().to_string(),
                body: command.body,
                tag_ids: dedup(command.tag_ids),
                topic_id: command.topic_id,
                image: command.image,
                markdown: (kind == ContentKind::News).then(|| command.markdown.unwrap_or(false)),
                accepted: kind.requires_acceptance().then_some(false),
                event_date: command.event_date.filter(|_| is_event),
                place: command.place.filter(|_| is_event),
            })
            .await?;

        self.cache
            .apply(&Mutation::ContentCreated {
                kind,
                id: record.id,
                topic_id: record.topic_id,
            })
            .await;
        info!(target: TARGET, kind = %kind, id = %record.id, author = %principal.user_id, "content created");

        self.assemble_detail(record).await
    }

    /// Cache-first detail read. Unaccepted events are only shown to admins
    /// and their author; everyone else gets a not-found.
    pub async fn get_detail(
        &self,
        viewer: Option<&Principal>,
        kind: ContentKind,
        id: Uuid,
    ) -> Result<ContentDetail, AppError> {
        let ttl = self.cache.config().detail_ttl();
        let detail = self
            .cache
            .read_through(&CacheKey::Detail(kind, id), ttl, || async {
                match self.content.find_content(kind, id).await? {
                    Some(record) => self.assemble_detail(record).await.map(Some),
                    None => Ok::<_, AppError>(None),
                }
            })
            .await?
            .ok_or_else(|| AppError::not_found(kind.as_str()))?;

        if !detail.visible_to(viewer) {
            return Err(AppError::not_found(kind.as_str()));
        }
        Ok(detail)
    }

    pub async fn list_all(&self, kind: ContentKind) -> Result<Vec<ContentSummary>, AppError> {
        self.cached_listing(CacheKey::Listing(kind), kind, ContentScope::Public)
            .await
    }

    pub async fn list_for_topic(
        &self,
        kind: ContentKind,
        topic: TopicRef,
    ) -> Result<Vec<ContentSummary>, AppError> {
        let topic_id = match topic {
            TopicRef::Id(id) => id,
            TopicRef::Title(title) => {
                self.taxonomy
                    .find_topic_by_title(title.trim())
                    .await?
                    .ok_or_else(|| AppError::not_found("topic"))?
                    .id
            }
        };

        self.cached_listing(
            CacheKey::TopicListing(kind, topic_id),
            kind,
            ContentScope::Topic(topic_id),
        )
        .await
    }

    pub async fn list_unaccepted(
        &self,
        principal: &Principal,
    ) -> Result<Vec<ContentSummary>, AppError> {
        principal.require_admin()?;
        self.cached_listing(
            CacheKey::UnacceptedEvents,
            ContentKind::Event,
            ContentScope::Unaccepted,
        )
        .await
    }

    pub async fn edit(
        &self,
        principal: &Principal,
        kind: ContentKind,
        id: Uuid,
        command: UpdateContentCommand,
    ) -> Result<ContentDetail, AppError> {
        ensure_non_empty(&command.title, "title")?;
        ensure_non_empty(&command.body, "body")?;

        let existing = self.require_content(kind, id).await?;
        principal.require_owner(existing.author_id)?;
        self.ensure_topic_exists(command.topic_id).await?;

        let is_event = kind == ContentKind::Event;
        let record = self
            .content
            .update_content(UpdateContentParams {
                kind,
                id,
                title: command.title.trim().to_string(),
                body: command.body,
                tag_ids: dedup(command.tag_ids),
                topic_id: command.topic_id,
                markdown: if kind == ContentKind::News {
                    command.markdown.or(existing.markdown)
                } else {
                    None
                },
                event_date: if is_event { command.event_date } else { None },
                place: if is_event { command.place } else { None },
            })
            .await?;

        self.cache
            .apply(&Mutation::ContentEdited {
                kind,
                id,
                topic_id: record.topic_id,
                previous_topic_id: existing.topic_id,
            })
            .await;

        self.assemble_detail(record).await
    }

    /// Owner or admin. Comments go first, then the item, then the cache.
    pub async fn delete(
        &self,
        principal: &Principal,
        kind: ContentKind,
        id: Uuid,
    ) -> Result<(), AppError> {
        let existing = self.require_content(kind, id).await?;
        principal.require_owner_or_admin(existing.author_id)?;

        let removed_comments = self.comments.delete_for_content(id).await?;
        if !self.content.delete_content(kind, id).await? {
            return Err(AppError::not_found(kind.as_str()));
        }

        self.cache
            .apply(&Mutation::ContentDeleted {
                kind,
                id,
                topic_id: existing.topic_id,
            })
            .await;
        info!(
            target: TARGET,
            kind = %kind,
            id = %id,
            removed_comments,
            actor = %principal.user_id,
            "content deleted"
        );
        Ok(())
    }

    pub async fn like(
        &self,
        principal: &Principal,
        kind: ContentKind,
        id: Uuid,
    ) -> Result<LikeState, AppError> {
        let existing = self.require_visible(principal, kind, id).await?;
        let likes = self
            .content
            .toggle_like(kind, id, principal.user_id)
            .await?
            .ok_or_else(|| AppError::not_found(kind.as_str()))?;

        self.cache
            .apply(&Mutation::ContentLiked {
                kind,
                id,
                topic_id: existing.topic_id,
                likes: likes.clone(),
            })
            .await;

        Ok(LikeState {
            liked: likes.contains(&principal.user_id),
            likes,
        })
    }

    pub async fn view(
        &self,
        principal: &Principal,
        kind: ContentKind,
        id: Uuid,
    ) -> Result<ViewState, AppError> {
        let existing = self.require_visible(principal, kind, id).await?;
        let views = match self.content.record_view(kind, id, principal.user_id).await? {
            ViewOutcome::Recorded(views) => views,
            ViewOutcome::AlreadyViewed => return Err(AppError::conflict(ALREADY_VIEWED)),
            ViewOutcome::Missing => return Err(AppError::not_found(kind.as_str())),
        };

        self.cache
            .apply(&Mutation::ContentViewed {
                kind,
                id,
                topic_id: existing.topic_id,
                views: views.clone(),
            })
            .await;

        Ok(ViewState { views })
    }

    pub async fn set_image(
        &self,
        principal: &Principal,
        kind: ContentKind,
        id: Uuid,
        image: &str,
    ) -> Result<ContentDetail, AppError> {
        let existing = self.require_content(kind, id).await?;
        principal.require_owner(existing.author_id)?;

        let record = self.content.set_image(kind, id, image).await?;
        self.cache
            .apply(&Mutation::ContentImageChanged {
                kind,
                id,
                topic_id: record.topic_id,
            })
            .await;

        self.assemble_detail(record).await
    }

    pub async fn accept_event(
        &self,
        principal: &Principal,
        id: Uuid,
    ) -> Result<ContentDetail, AppError> {
        principal.require_admin()?;
        let existing = self.require_content(ContentKind::Event, id).await?;
        if existing.accepted == Some(true) {
            return Err(AppError::conflict("event is already accepted"));
        }

        let record = self.content.accept_event(id).await?;
        self.cache
            .apply(&Mutation::EventAccepted {
                id,
                topic_id: record.topic_id,
            })
            .await;
        info!(target: TARGET, id = %id, admin = %principal.user_id, "event accepted");

        self.assemble_detail(record).await
    }

    async fn require_content(&self, kind: ContentKind, id: Uuid) -> Result<ContentRecord, AppError> {
        self.content
            .find_content(kind, id)
            .await?
            .ok_or_else(|| AppError::not_found(kind.as_str()))
    }

    /// Like `require_content`, but hidden events read as missing to callers
    /// who may not see them.
    async fn require_visible(
        &self,
        principal: &Principal,
        kind: ContentKind,
        id: Uuid,
    ) -> Result<ContentRecord, AppError> {
        let record = self.require_content(kind, id).await?;
        if !can_see(Some(principal), &record) {
            return Err(AppError::not_found(kind.as_str()));
        }
        Ok(record)
    }

    async fn ensure_topic_exists(&self, topic_id: Option<Uuid>) -> Result<(), AppError> {
        if let Some(topic_id) = topic_id
            && self.taxonomy.find_topic(topic_id).await?.is_none()
        {
            return Err(AppError::not_found("topic"));
        }
        Ok(())
    }

    async fn cached_listing(
        &self,
        key: CacheKey,
        kind: ContentKind,
        scope: ContentScope,
    ) -> Result<Vec<ContentSummary>, AppError> {
        let ttl = self.cache.config().detail_ttl();
        let listing = self
            .cache
            .read_through(&key, ttl, || async {
                let records = self.content.list_content(kind, scope).await?;
                self.assemble_summaries(records).await.map(Some)
            })
            .await?;
        Ok(listing.unwrap_or_default())
    }

    async fn assemble_detail(&self, record: ContentRecord) -> Result<ContentDetail, AppError> {
        let author = self
            .users
            .find_by_id(record.author_id)
            .await?
            .as_ref()
            .map(AuthorSummary::from);
        let tags = if record.tag_ids.is_empty() {
            Vec::new()
        } else {
            self.taxonomy.find_tags(&record.tag_ids).await?
        };
        let topic = match record.topic_id {
            Some(topic_id) => self.taxonomy.find_topic(topic_id).await?,
            None => None,
        };

        Ok(ContentDetail {
            id: record.id,
            kind: record.kind,
            title: record.title,
            body: record.body,
            author_id: record.author_id,
            author,
            created_at: record.created_at,
            tags,
            topic,
            image: record.image,
            likes: record.likes,
            views: record.views,
            markdown: record.markdown,
            accepted: record.accepted,
            event_date: record.event_date,
            place: record.place,
        })
    }

    async fn assemble_summaries(
        &self,
        records: Vec<ContentRecord>,
    ) -> Result<Vec<ContentSummary>, AppError> {
        let authors: HashMap<Uuid, AuthorSummary> =
            author_index(self.users.as_ref(), records.iter().map(|record| record.author_id))
                .await?;

        Ok(records
            .into_iter()
            .map(|record| ContentSummary {
                author: authors.get(&record.author_id).cloned(),
                id: record.id,
                kind: record.kind,
                title: record.title,
                created_at: record.created_at,
                image: record.image,
                topic_id: record.topic_id,
                tag_ids: record.tag_ids,
                like_count: record.likes.len(),
                view_count: record.views.len(),
                accepted: record.accepted,
                event_date: record.event_date,
                place: record.place,
            })
            .collect())
    }
}

fn ensure_non_empty(value: &str, field: &'static str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::validation(format!("{field} must not be empty")));
    }
    Ok(())
}

fn dedup(mut ids: Vec<Uuid>) -> Vec<Uuid> {
    let mut seen = Vec::with_capacity(ids.len());
    ids.retain(|id| {
        if seen.contains(id) {
            false
        } else {
            seen.push(*id);
            true
        }
    });
    ids
}
