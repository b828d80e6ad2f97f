use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{MemoryRepositories, newest_first};
use crate::application::repos::{
    CommentsRepo, ContentRepo, ContentScope, CreateCommentParams, CreateContentParams, RepoError,
    UpdateContentParams, ViewOutcome,
};
use crate::domain::entities::{CommentRecord, ContentRecord};
use crate::domain::interactions::{record_view, toggle_member};
use crate::domain::types::ContentKind;

#[async_trait]
impl ContentRepo for MemoryRepositories {
    async fn create_content(
        &self,
        params: CreateContentParams,
    ) -> Result<ContentRecord, RepoError> {
        let record = ContentRecord {
            id: Uuid::new_v4(),
            kind: params.kind,
            author_id: params.author_id,
            title: params.title,
            body: params.body,
            created_at: OffsetDateTime::now_utc(),
            tag_ids: params.tag_ids,
            topic_id: params.topic_id,
            image: params.image,
            likes: Vec::new(),
            views: Vec::new(),
            markdown: params.markdown,
            accepted: params.accepted,
            event_date: params.event_date,
            place: params.place,
        };
        self.content.write().await.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_content(
        &self,
        kind: ContentKind,
        id: Uuid,
    ) -> Result<Option<ContentRecord>, RepoError> {
        Ok(self
            .content
            .read()
            .await
            .get(&id)
            .filter(|record| record.kind == kind)
            .cloned())
    }

    async fn locate_content(&self, id: Uuid) -> Result<Option<ContentRecord>, RepoError> {
        Ok(self.content.read().await.get(&id).cloned())
    }

    async fn list_content(
        &self,
        kind: ContentKind,
        scope: ContentScope,
    ) -> Result<Vec<ContentRecord>, RepoError> {
        let mut records: Vec<ContentRecord> = self
            .content
            .read()
            .await
            .values()
            .filter(|record| record.kind == kind)
            .filter(|record| match scope {
                ContentScope::Public => record.is_publicly_visible(),
                ContentScope::Topic(topic_id) => {
                    record.is_publicly_visible() && record.topic_id == Some(topic_id)
                }
                ContentScope::Unaccepted => !record.is_publicly_visible(),
            })
            .cloned()
            .collect();
        newest_first(&mut records, |record| (record.created_at, record.id));
        Ok(records)
    }

    async fn update_content(
        &self,
        params: UpdateContentParams,
    ) -> Result<ContentRecord, RepoError> {
        let mut content = self.content.write().await;
        let record = content
            .get_mut(&params.id)
            .filter(|record| record.kind == params.kind)
            .ok_or(RepoError::NotFound)?;
        record.title = params.title;
        record.body = params.body;
        record.tag_ids = params.tag_ids;
        record.topic_id = params.topic_id;
        record.markdown = params.markdown;
        record.event_date = params.event_date;
        record.place = params.place;
        Ok(record.clone())
    }

    async fn set_image(
        &self,
        kind: ContentKind,
        id: Uuid,
        image: &str,
    ) -> Result<ContentRecord, RepoError> {
        let mut content = self.content.write().await;
        let record = content
            .get_mut(&id)
            .filter(|record| record.kind == kind)
            .ok_or(RepoError::NotFound)?;
        record.image = Some(image.to_string());
        Ok(record.clone())
    }

    async fn accept_event(&self, id: Uuid) -> Result<ContentRecord, RepoError> {
        let mut content = self.content.write().await;
        let record = content
            .get_mut(&id)
            .filter(|record| record.kind == ContentKind::Event)
            .ok_or(RepoError::NotFound)?;
        record.accepted = Some(true);
        Ok(record.clone())
    }

    async fn toggle_like(
        &self,
        kind: ContentKind,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Vec<Uuid>>, RepoError> {
        let mut content = self.content.write().await;
        Ok(content
            .get_mut(&id)
            .filter(|record| record.kind == kind)
            .map(|record| {
                toggle_member(&mut record.likes, user_id);
                record.likes.clone()
            }))
    }

    async fn record_view(
        &self,
        kind: ContentKind,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<ViewOutcome, RepoError> {
        let mut content = self.content.write().await;
        let Some(record) = content.get_mut(&id).filter(|record| record.kind == kind) else {
            return Ok(ViewOutcome::Missing);
        };
        Ok(match record_view(&mut record.views, user_id) {
            Ok(()) => ViewOutcome::Recorded(record.views.clone()),
            Err(_) => ViewOutcome::AlreadyViewed,
        })
    }

    async fn delete_content(&self, kind: ContentKind, id: Uuid) -> Result<bool, RepoError> {
        let mut content = self.content.write().await;
        if content.get(&id).is_some_and(|record| record.kind == kind) {
            content.remove(&id);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn count_content(&self, kind: ContentKind) -> Result<u64, RepoError> {
        Ok(self
            .content
            .read()
            .await
            .values()
            .filter(|record| record.kind == kind)
            .count() as u64)
    }
}

#[async_trait]
impl CommentsRepo for MemoryRepositories {
    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError> {
        let mut comments = self.comments.write().await;
        if comments.contains_key(&params.id) {
            return Err(RepoError::duplicate("comments_pkey"));
        }
        let record = CommentRecord {
            id: params.id,
            author_id: params.author_id,
            content_id: params.content_id,
            reply_to: params.reply_to,
            body: params.body,
            created_at: OffsetDateTime::now_utc(),
            likes: Vec::new(),
        };
        comments.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_comment(&self, id: Uuid) -> Result<Option<CommentRecord>, RepoError> {
        Ok(self.comments.read().await.get(&id).cloned())
    }

    async fn list_for_content(&self, content_id: Uuid) -> Result<Vec<CommentRecord>, RepoError> {
        let mut records: Vec<CommentRecord> = self
            .comments
            .read()
            .await
            .values()
            .filter(|comment| comment.content_id == content_id)
            .cloned()
            .collect();
        records.sort_by_key(|comment| (comment.created_at, comment.id));
        Ok(records)
    }

    async fn latest_by_author(
        &self,
        author_id: Uuid,
        limit: u32,
    ) -> Result<Vec<CommentRecord>, RepoError> {
        let mut records: Vec<CommentRecord> = self
            .comments
            .read()
            .await
            .values()
            .filter(|comment| comment.author_id == author_id)
            .cloned()
            .collect();
        newest_first(&mut records, |comment| (comment.created_at, comment.id));
        records.truncate(limit as usize);
        Ok(records)
    }

    async fn toggle_like(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Vec<Uuid>>, RepoError> {
        let mut comments = self.comments.write().await;
        Ok(comments.get_mut(&id).map(|comment| {
            toggle_member(&mut comment.likes, user_id);
            comment.likes.clone()
        }))
    }

    async fn delete_comment(&self, id: Uuid) -> Result<bool, RepoError> {
        Ok(self.comments.write().await.remove(&id).is_some())
    }

    async fn delete_for_content(&self, content_id: Uuid) -> Result<u64, RepoError> {
        let mut comments = self.comments.write().await;
        let before = comments.len();
        comments.retain(|_, comment| comment.content_id != content_id);
        Ok((before - comments.len()) as u64)
    }
}
