use std::sync::Arc;

use uuid::Uuid;

use crate::application::error::AppError;
use crate::application::identity::Principal;
use crate::application::repos::{ContentRepo, TaxonomyRepo};
use crate::cache::{CacheCoordinator, CacheKey, Mutation};
use crate::domain::entities::{TagRecord, TopicRecord};

#[derive(Clone)]
pub struct TaxonomyService {
    taxonomy: Arc<dyn TaxonomyRepo>,
    content: Arc<dyn ContentRepo>,
    cache: Arc<CacheCoordinator>,
}

impl TaxonomyService {
    pub fn new(
        taxonomy: Arc<dyn TaxonomyRepo>,
        content: Arc<dyn ContentRepo>,
        cache: Arc<CacheCoordinator>,
    ) -> Self {
        Self {
            taxonomy,
            content,
            cache,
        }
    }

    pub async fn topics(&self) -> Result<Vec<TopicRecord>, AppError> {
        let ttl = self.cache.config().detail_ttl();
        let topics = self
            .cache
            .read_through(&CacheKey::AllTopics, ttl, || async {
                Ok::<_, AppError>(Some(self.taxonomy.list_topics().await?))
            })
            .await?;
        Ok(topics.unwrap_or_default())
    }

    pub async fn topic(&self, id: Uuid) -> Result<TopicRecord, AppError> {
        self.taxonomy
            .find_topic(id)
            .await?
            .ok_or_else(|| AppError::not_found("topic"))
    }

    pub async fn tags(&self) -> Result<Vec<TagRecord>, AppError> {
        let ttl = self.cache.config().detail_ttl();
        let tags = self
            .cache
            .read_through(&CacheKey::AllTags, ttl, || async {
                Ok::<_, AppError>(Some(self.taxonomy.list_tags().await?))
            })
            .await?;
        Ok(tags.unwrap_or_default())
    }

    /// Tags attached to any content item.
    pub async fn tags_for_content(&self, content_id: Uuid) -> Result<Vec<TagRecord>, AppError> {
        let content = self
            .content
            .locate_content(content_id)
            .await?
            .ok_or_else(|| AppError::not_found("content"))?;
        if content.tag_ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.taxonomy.find_tags(&content.tag_ids).await?)
    }

    pub async fn create_topic(
        &self,
        principal: &Principal,
        title: &str,
        image: Option<&str>,
    ) -> Result<TopicRecord, AppError> {
        principal.require_admin()?;
        let title = title.trim();
        if title.is_empty() {
            return Err(AppError::validation("title must not be empty"));
        }
        if self.taxonomy.find_topic_by_title(title).await?.is_some() {
            return Err(AppError::conflict("topic title is already taken"));
        }

        let topic = self.taxonomy.create_topic(title, image).await?;
        self.cache.apply(&Mutation::TopicsChanged).await;
        Ok(topic)
    }

    pub async fn create_tag(&self, principal: &Principal, title: &str) -> Result<TagRecord, AppError> {
        principal.require_admin()?;
        let title = title.trim();
        if title.is_empty() {
            return Err(AppError::validation("title must not be empty"));
        }

        let tag = self.taxonomy.create_tag(title).await?;
        self.cache.apply(&Mutation::TagsChanged).await;
        Ok(tag)
    }
}
