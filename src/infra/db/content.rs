use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::PostgresRepositories;
use super::util::{convert_count, map_sqlx_error};
use crate::application::repos::{
    CommentsRepo, ContentRepo, ContentScope, CreateCommentParams, CreateContentParams, RepoError,
    UpdateContentParams, ViewOutcome,
};
use crate::domain::entities::{CommentRecord, ContentRecord};
use crate::domain::types::ContentKind;

const CONTENT_COLUMNS: &str = "id, kind, author_id, title, body, created_at, tag_ids, topic_id, \
    image, likes, views, markdown, accepted, event_date, place";

const COMMENT_COLUMNS: &str = "id, author_id, content_id, reply_to, body, created_at, likes";

#[derive(sqlx::FromRow)]
struct ContentRow {
    id: Uuid,
    kind: ContentKind,
    author_id: Uuid,
    title: String,
    body: String,
    created_at: OffsetDateTime,
    tag_ids: Vec<Uuid>,
    topic_id: Option<Uuid>,
    image: Option<String>,
    likes: Vec<Uuid>,
    views: Vec<Uuid>,
    markdown: Option<bool>,
    accepted: Option<bool>,
    event_date: Option<OffsetDateTime>,
    place: Option<String>,
}

impl From<ContentRow> for ContentRecord {
    fn from(row: ContentRow) -> Self {
        Self {
            id: row.id,
            kind: row.kind,
            author_id: row.author_id,
            title: row.title,
            body: row.body,
            created_at: row.created_at,
            tag_ids: row.tag_ids,
            topic_id: row.topic_id,
            image: row.image,
            likes: row.likes,
            views: row.views,
            markdown: row.markdown,
            accepted: row.accepted,
            event_date: row.event_date,
            place: row.place,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: Uuid,
    author_id: Uuid,
    content_id: Uuid,
    reply_to: Option<Uuid>,
    body: String,
    created_at: OffsetDateTime,
    likes: Vec<Uuid>,
}

impl From<CommentRow> for CommentRecord {
    fn from(row: CommentRow) -> Self {
        Self {
            id: row.id,
            author_id: row.author_id,
            content_id: row.content_id,
            reply_to: row.reply_to,
            body: row.body,
            created_at: row.created_at,
            likes: row.likes,
        }
    }
}

#[async_trait]
impl ContentRepo for PostgresRepositories {
    async fn create_content(
        &self,
        params: CreateContentParams,
    ) -> Result<ContentRecord, RepoError> {
        let sql = format!(
            "INSERT INTO content_items \
             (id, kind, author_id, title, body, tag_ids, topic_id, image, markdown, accepted, event_date, place) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             RETURNING {CONTENT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ContentRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(params.kind)
            .bind(params.author_id)
            .bind(&params.title)
            .bind(&params.body)
            .bind(&params.tag_ids)
            .bind(params.topic_id)
            .bind(&params.image)
            .bind(params.markdown)
            .bind(params.accepted)
            .bind(params.event_date)
            .bind(&params.place)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn find_content(
        &self,
        kind: ContentKind,
        id: Uuid,
    ) -> Result<Option<ContentRecord>, RepoError> {
        let sql = format!("SELECT {CONTENT_COLUMNS} FROM content_items WHERE id = $1 AND kind = $2");
        let row = sqlx::query_as::<_, ContentRow>(&sql)
            .bind(id)
            .bind(kind)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(ContentRecord::from))
    }

    async fn locate_content(&self, id: Uuid) -> Result<Option<ContentRecord>, RepoError> {
        let sql = format!("SELECT {CONTENT_COLUMNS} FROM content_items WHERE id = $1");
        let row = sqlx::query_as::<_, ContentRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(ContentRecord::from))
    }

    async fn list_content(
        &self,
        kind: ContentKind,
        scope: ContentScope,
    ) -> Result<Vec<ContentRecord>, RepoError> {
        let filter = match scope {
            ContentScope::Public => "accepted IS DISTINCT FROM FALSE",
            ContentScope::Topic(_) => "accepted IS DISTINCT FROM FALSE AND topic_id = $2",
            ContentScope::Unaccepted => "accepted = FALSE",
        };
        let sql = format!(
            "SELECT {CONTENT_COLUMNS} FROM content_items WHERE kind = $1 AND {filter} \
             ORDER BY created_at DESC, id DESC"
        );

        let mut query = sqlx::query_as::<_, ContentRow>(&sql).bind(kind);
        if let ContentScope::Topic(topic_id) = scope {
            query = query.bind(topic_id);
        }
        let rows = query
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(ContentRecord::from).collect())
    }

    async fn update_content(
        &self,
        params: UpdateContentParams,
    ) -> Result<ContentRecord, RepoError> {
        let sql = format!(
            "UPDATE content_items SET title = $3, body = $4, tag_ids = $5, topic_id = $6, \
             markdown = $7, event_date = $8, place = $9 \
             WHERE id = $1 AND kind = $2 RETURNING {CONTENT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ContentRow>(&sql)
            .bind(params.id)
            .bind(params.kind)
            .bind(&params.title)
            .bind(&params.body)
            .bind(&params.tag_ids)
            .bind(params.topic_id)
            .bind(params.markdown)
            .bind(params.event_date)
            .bind(&params.place)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn set_image(
        &self,
        kind: ContentKind,
        id: Uuid,
        image: &str,
    ) -> Result<ContentRecord, RepoError> {
        let sql = format!(
            "UPDATE content_items SET image = $3 WHERE id = $1 AND kind = $2 \
             RETURNING {CONTENT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ContentRow>(&sql)
            .bind(id)
            .bind(kind)
            .bind(image)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn accept_event(&self, id: Uuid) -> Result<ContentRecord, RepoError> {
        let sql = format!(
            "UPDATE content_items SET accepted = TRUE WHERE id = $1 AND kind = 'event' \
             RETURNING {CONTENT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ContentRow>(&sql)
            .bind(id)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn toggle_like(
        &self,
        kind: ContentKind,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Vec<Uuid>>, RepoError> {
        sqlx::query_scalar::<_, Vec<Uuid>>(
            "UPDATE content_items SET likes = CASE \
                 WHEN $3 = ANY(likes) THEN array_remove(likes, $3) \
                 ELSE array_append(likes, $3) END \
             WHERE id = $1 AND kind = $2 RETURNING likes",
        )
        .bind(id)
        .bind(kind)
        .bind(user_id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn record_view(
        &self,
        kind: ContentKind,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<ViewOutcome, RepoError> {
        let recorded = sqlx::query_scalar::<_, Vec<Uuid>>(
            "UPDATE content_items SET views = array_append(views, $3) \
             WHERE id = $1 AND kind = $2 AND NOT ($3 = ANY(views)) RETURNING views",
        )
        .bind(id)
        .bind(kind)
        .bind(user_id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        if let Some(views) = recorded {
            return Ok(ViewOutcome::Recorded(views));
        }

        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM content_items WHERE id = $1 AND kind = $2)",
        )
        .bind(id)
        .bind(kind)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(if exists {
            ViewOutcome::AlreadyViewed
        } else {
            ViewOutcome::Missing
        })
    }

    async fn delete_content(&self, kind: ContentKind, id: Uuid) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM content_items WHERE id = $1 AND kind = $2")
            .bind(id)
            .bind(kind)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_content(&self, kind: ContentKind) -> Result<u64, RepoError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM content_items WHERE kind = $1")
            .bind(kind)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        convert_count(count)
    }
}

#[async_trait]
impl CommentsRepo for PostgresRepositories {
    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError> {
        let sql = format!(
            "INSERT INTO comments (id, author_id, content_id, reply_to, body) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {COMMENT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, CommentRow>(&sql)
            .bind(params.id)
            .bind(params.author_id)
            .bind(params.content_id)
            .bind(params.reply_to)
            .bind(&params.body)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn find_comment(&self, id: Uuid) -> Result<Option<CommentRecord>, RepoError> {
        let sql = format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = $1");
        let row = sqlx::query_as::<_, CommentRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(CommentRecord::from))
    }

    async fn list_for_content(&self, content_id: Uuid) -> Result<Vec<CommentRecord>, RepoError> {
        let sql = format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE content_id = $1 \
             ORDER BY created_at, id"
        );
        let rows = sqlx::query_as::<_, CommentRow>(&sql)
            .bind(content_id)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(CommentRecord::from).collect())
    }

    async fn latest_by_author(
        &self,
        author_id: Uuid,
        limit: u32,
    ) -> Result<Vec<CommentRecord>, RepoError> {
        let sql = format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE author_id = $1 \
             ORDER BY created_at DESC, id DESC LIMIT $2"
        );
        let rows = sqlx::query_as::<_, CommentRow>(&sql)
            .bind(author_id)
            .bind(i64::from(limit))
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(CommentRecord::from).collect())
    }

    async fn toggle_like(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Vec<Uuid>>, RepoError> {
        sqlx::query_scalar::<_, Vec<Uuid>>(
            "UPDATE comments SET likes = CASE \
                 WHEN $2 = ANY(likes) THEN array_remove(likes, $2) \
                 ELSE array_append(likes, $2) END \
             WHERE id = $1 RETURNING likes",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn delete_comment(&self, id: Uuid) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_for_content(&self, content_id: Uuid) -> Result<u64, RepoError> {
        let result = sqlx::query("DELETE FROM comments WHERE content_id = $1")
            .bind(content_id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected())
    }
}
