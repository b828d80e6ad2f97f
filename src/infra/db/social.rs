use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::PostgresRepositories;
use super::util::{convert_count, map_sqlx_error};
use crate::application::repos::{
    CreateNotificationParams, NotificationsRepo, RepoError, TaxonomyRepo,
};
use crate::domain::entities::{NotificationRecord, TagRecord, TopicRecord};
use crate::domain::types::NotificationKind;

const NOTIFICATION_COLUMNS: &str = "id, recipient_id, kind, body, link, read, created_at";

#[derive(sqlx::FromRow)]
struct NotificationRow {
    id: Uuid,
    recipient_id: Uuid,
    kind: NotificationKind,
    body: String,
    link: String,
    read: bool,
    created_at: OffsetDateTime,
}

impl From<NotificationRow> for NotificationRecord {
    fn from(row: NotificationRow) -> Self {
        Self {
            id: row.id,
            recipient_id: row.recipient_id,
            kind: row.kind,
            body: row.body,
            link: row.link,
            read: row.read,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct TopicRow {
    id: Uuid,
    title: String,
    image: Option<String>,
}

impl From<TopicRow> for TopicRecord {
    fn from(row: TopicRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            image: row.image,
        }
    }
}

#[derive(sqlx::FromRow)]
struct TagRow {
    id: Uuid,
    title: String,
}

impl From<TagRow> for TagRecord {
    fn from(row: TagRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
        }
    }
}

#[async_trait]
impl NotificationsRepo for PostgresRepositories {
    async fn create_notification(
        &self,
        params: CreateNotificationParams,
    ) -> Result<NotificationRecord, RepoError> {
        let sql = format!(
            "INSERT INTO notifications (id, recipient_id, kind, body, link) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {NOTIFICATION_COLUMNS}"
        );
        let row = sqlx::query_as::<_, NotificationRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(params.recipient_id)
            .bind(params.kind)
            .bind(&params.body)
            .bind(&params.link)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn list_for_user(
        &self,
        recipient_id: Uuid,
        limit: u32,
    ) -> Result<Vec<NotificationRecord>, RepoError> {
        let sql = format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE recipient_id = $1 \
             ORDER BY created_at DESC, id DESC LIMIT $2"
        );
        let rows = sqlx::query_as::<_, NotificationRow>(&sql)
            .bind(recipient_id)
            .bind(i64::from(limit))
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(NotificationRecord::from).collect())
    }

    async fn mark_read(&self, recipient_id: Uuid, id: Uuid) -> Result<bool, RepoError> {
        let result =
            sqlx::query("UPDATE notifications SET read = TRUE WHERE id = $1 AND recipient_id = $2")
                .bind(id)
                .bind(recipient_id)
                .execute(self.pool())
                .await
                .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_all_read(&self, recipient_id: Uuid) -> Result<u64, RepoError> {
        let result = sqlx::query(
            "UPDATE notifications SET read = TRUE WHERE recipient_id = $1 AND NOT read",
        )
        .bind(recipient_id)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(result.rows_affected())
    }

    async fn delete_notification(&self, recipient_id: Uuid, id: Uuid) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1 AND recipient_id = $2")
            .bind(id)
            .bind(recipient_id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl TaxonomyRepo for PostgresRepositories {
    async fn list_topics(&self) -> Result<Vec<TopicRecord>, RepoError> {
        let rows = sqlx::query_as::<_, TopicRow>("SELECT id, title, image FROM topics ORDER BY title")
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(TopicRecord::from).collect())
    }

    async fn find_topic(&self, id: Uuid) -> Result<Option<TopicRecord>, RepoError> {
        let row = sqlx::query_as::<_, TopicRow>("SELECT id, title, image FROM topics WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(TopicRecord::from))
    }

    async fn find_topic_by_title(&self, title: &str) -> Result<Option<TopicRecord>, RepoError> {
        let row =
            sqlx::query_as::<_, TopicRow>("SELECT id, title, image FROM topics WHERE title = $1")
                .bind(title)
                .fetch_optional(self.pool())
                .await
                .map_err(map_sqlx_error)?;
        Ok(row.map(TopicRecord::from))
    }

    async fn create_topic(
        &self,
        title: &str,
        image: Option<&str>,
    ) -> Result<TopicRecord, RepoError> {
        let row = sqlx::query_as::<_, TopicRow>(
            "INSERT INTO topics (id, title, image) VALUES ($1, $2, $3) RETURNING id, title, image",
        )
        .bind(Uuid::new_v4())
        .bind(title)
        .bind(image)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn count_topics(&self) -> Result<u64, RepoError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM topics")
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        convert_count(count)
    }

    async fn list_tags(&self) -> Result<Vec<TagRecord>, RepoError> {
        let rows = sqlx::query_as::<_, TagRow>("SELECT id, title FROM tags ORDER BY title")
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(TagRecord::from).collect())
    }

    async fn find_tags(&self, ids: &[Uuid]) -> Result<Vec<TagRecord>, RepoError> {
        let rows = sqlx::query_as::<_, TagRow>(
            "SELECT id, title FROM tags WHERE id = ANY($1) ORDER BY title",
        )
        .bind(ids)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(TagRecord::from).collect())
    }

    async fn create_tag(&self, title: &str) -> Result<TagRecord, RepoError> {
        let row = sqlx::query_as::<_, TagRow>(
            "INSERT INTO tags (id, title) VALUES ($1, $2) RETURNING id, title",
        )
        .bind(Uuid::new_v4())
        .bind(title)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(row.into())
    }
}
