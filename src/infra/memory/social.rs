use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{MemoryRepositories, newest_first};
use crate::application::repos::{
    CreateNotificationParams, NotificationsRepo, RepoError, TaxonomyRepo,
};
use crate::domain::entities::{NotificationRecord, TagRecord, TopicRecord};

#[async_trait]
impl NotificationsRepo for MemoryRepositories {
    async fn create_notification(
        &self,
        params: CreateNotificationParams,
    ) -> Result<NotificationRecord, RepoError> {
        let record = NotificationRecord {
            id: Uuid::new_v4(),
            recipient_id: params.recipient_id,
            kind: params.kind,
            body: params.body,
            link: params.link,
            read: false,
            created_at: OffsetDateTime::now_utc(),
        };
        self.notifications
            .write()
            .await
            .insert(record.id, record.clone());
        Ok(record)
    }

    async fn list_for_user(
        &self,
        recipient_id: Uuid,
        limit: u32,
    ) -> Result<Vec<NotificationRecord>, RepoError> {
        let mut records: Vec<NotificationRecord> = self
            .notifications
            .read()
            .await
            .values()
            .filter(|record| record.recipient_id == recipient_id)
            .cloned()
            .collect();
        newest_first(&mut records, |record| (record.created_at, record.id));
        records.truncate(limit as usize);
        Ok(records)
    }

    async fn mark_read(&self, recipient_id: Uuid, id: Uuid) -> Result<bool, RepoError> {
        let mut notifications = self.notifications.write().await;
        match notifications
            .get_mut(&id)
            .filter(|record| record.recipient_id == recipient_id)
        {
            Some(record) => {
                record.read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_all_read(&self, recipient_id: Uuid) -> Result<u64, RepoError> {
        let mut updated = 0;
        for record in self.notifications.write().await.values_mut() {
            if record.recipient_id == recipient_id && !record.read {
                record.read = true;
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn delete_notification(&self, recipient_id: Uuid, id: Uuid) -> Result<bool, RepoError> {
        let mut notifications = self.notifications.write().await;
        if notifications
            .get(&id)
            .is_some_and(|record| record.recipient_id == recipient_id)
        {
            notifications.remove(&id);
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

#[async_trait]
impl TaxonomyRepo for MemoryRepositories {
    async fn list_topics(&self) -> Result<Vec<TopicRecord>, RepoError> {
        let mut topics: Vec<TopicRecord> = self.topics.read().await.values().cloned().collect();
        topics.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(topics)
    }

    async fn find_topic(&self, id: Uuid) -> Result<Option<TopicRecord>, RepoError> {
        Ok(self.topics.read().await.get(&id).cloned())
    }

    async fn find_topic_by_title(&self, title: &str) -> Result<Option<TopicRecord>, RepoError> {
        Ok(self
            .topics
            .read()
            .await
            .values()
            .find(|topic| topic.title == title)
            .cloned())
    }

    async fn create_topic(
        &self,
        title: &str,
        image: Option<&str>,
    ) -> Result<TopicRecord, RepoError> {
        let mut topics = self.topics.write().await;
        if topics.values().any(|topic| topic.title == title) {
            return Err(RepoError::duplicate("topics_title_key"));
        }
        let record = TopicRecord {
            id: Uuid::new_v4(),
            title: title.to_string(),
            image: image.map(str::to_string),
        };
        topics.insert(record.id, record.clone());
        Ok(record)
    }

    async fn count_topics(&self) -> Result<u64, RepoError> {
        Ok(self.topics.read().await.len() as u64)
    }

    async fn list_tags(&self) -> Result<Vec<TagRecord>, RepoError> {
        let mut tags: Vec<TagRecord> = self.tags.read().await.values().cloned().collect();
        tags.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(tags)
    }

    async fn find_tags(&self, ids: &[Uuid]) -> Result<Vec<TagRecord>, RepoError> {
        let tags = self.tags.read().await;
        Ok(ids.iter().filter_map(|id| tags.get(id).cloned()).collect())
    }

    async fn create_tag(&self, title: &str) -> Result<TagRecord, RepoError> {
        let record = TagRecord {
            id: Uuid::new_v4(),
            title: title.to_string(),
        };
        self.tags.write().await.insert(record.id, record.clone());
        Ok(record)
    }
}
