use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::PostgresRepositories;
use super::util::map_sqlx_error;
use crate::application::repos::{CreateItemParams, MarketRepo, RepoError};
use crate::domain::entities::{ChatMessage, ChatRecord, ItemRecord};
use crate::domain::types::ItemStatus;

const ITEM_COLUMNS: &str = "id, seller_id, title, description, price_cents, photos, status, \
    buyer_id, created_at, updated_at";

const CHAT_COLUMNS: &str = "id, item_id, participants, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct ItemRow {
    id: Uuid,
    seller_id: Uuid,
    title: String,
    description: String,
    price_cents: i64,
    photos: Vec<String>,
    status: ItemStatus,
    buyer_id: Option<Uuid>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<ItemRow> for ItemRecord {
    fn from(row: ItemRow) -> Self {
        Self {
            id: row.id,
            seller_id: row.seller_id,
            title: row.title,
            description: row.description,
            price_cents: row.price_cents,
            photos: row.photos,
            status: row.status,
            buyer_id: row.buyer_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ChatRow {
    id: Uuid,
    item_id: Uuid,
    participants: Vec<Uuid>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

#[derive(sqlx::FromRow)]
struct MessageRow {
    chat_id: Uuid,
    sender_id: Uuid,
    body: String,
    sent_at: OffsetDateTime,
}

impl PostgresRepositories {
    /// Attach each chat's messages, oldest first.
    async fn hydrate_chats(&self, rows: Vec<ChatRow>) -> Result<Vec<ChatRecord>, RepoError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
        let messages = sqlx::query_as::<_, MessageRow>(
            "SELECT chat_id, sender_id, body, sent_at FROM chat_messages \
             WHERE chat_id = ANY($1) ORDER BY id",
        )
        .bind(&ids)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        let mut by_chat: HashMap<Uuid, Vec<ChatMessage>> = HashMap::new();
        for message in messages {
            by_chat.entry(message.chat_id).or_default().push(ChatMessage {
                sender_id: message.sender_id,
                body: message.body,
                sent_at: message.sent_at,
            });
        }

        Ok(rows
            .into_iter()
            .map(|row| ChatRecord {
                messages: by_chat.remove(&row.id).unwrap_or_default(),
                id: row.id,
                item_id: row.item_id,
                participants: row.participants,
                created_at: row.created_at,
                updated_at: row.updated_at,
            })
            .collect())
    }

    async fn fetch_items(&self, condition: &str, value: Uuid) -> Result<Vec<ItemRecord>, RepoError> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE {condition} ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, ItemRow>(&sql)
            .bind(value)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(ItemRecord::from).collect())
    }
}

#[async_trait]
impl MarketRepo for PostgresRepositories {
    async fn create_item(&self, params: CreateItemParams) -> Result<ItemRecord, RepoError> {
        let sql = format!(
            "INSERT INTO items (id, seller_id, title, description, price_cents, photos) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {ITEM_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ItemRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(params.seller_id)
            .bind(&params.title)
            .bind(&params.description)
            .bind(params.price_cents)
            .bind(&params.photos)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn find_item(&self, id: Uuid) -> Result<Option<ItemRecord>, RepoError> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = $1");
        let row = sqlx::query_as::<_, ItemRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(ItemRecord::from))
    }

    async fn list_available(&self) -> Result<Vec<ItemRecord>, RepoError> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE status = 'available' \
             ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, ItemRow>(&sql)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(ItemRecord::from).collect())
    }

    async fn list_by_seller(&self, seller_id: Uuid) -> Result<Vec<ItemRecord>, RepoError> {
        self.fetch_items("seller_id = $1", seller_id).await
    }

    async fn mark_sold(&self, id: Uuid, buyer_id: Uuid) -> Result<Option<ItemRecord>, RepoError> {
        let sql = format!(
            "UPDATE items SET status = 'sold', buyer_id = $2, updated_at = now() \
             WHERE id = $1 AND status = 'available' RETURNING {ITEM_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ItemRow>(&sql)
            .bind(id)
            .bind(buyer_id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(ItemRecord::from))
    }

    async fn create_chat(
        &self,
        item_id: Uuid,
        participants: &[Uuid],
    ) -> Result<ChatRecord, RepoError> {
        let sql = format!(
            "INSERT INTO chats (id, item_id, participants) VALUES ($1, $2, $3) \
             RETURNING {CHAT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ChatRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(item_id)
            .bind(participants)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(ChatRecord {
            id: row.id,
            item_id: row.item_id,
            participants: row.participants,
            messages: Vec::new(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    async fn find_chat(&self, id: Uuid) -> Result<Option<ChatRecord>, RepoError> {
        let sql = format!("SELECT {CHAT_COLUMNS} FROM chats WHERE id = $1");
        let row = sqlx::query_as::<_, ChatRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        let Some(row) = row else {
            return Ok(None);
        };
        Ok(self.hydrate_chats(vec![row]).await?.into_iter().next())
    }

    async fn find_chat_between(
        &self,
        item_id: Uuid,
        first: Uuid,
        second: Uuid,
    ) -> Result<Option<ChatRecord>, RepoError> {
        let sql = format!(
            "SELECT {CHAT_COLUMNS} FROM chats \
             WHERE item_id = $1 AND participants @> ARRAY[$2, $3]::uuid[] \
             ORDER BY created_at LIMIT 1"
        );
        let row = sqlx::query_as::<_, ChatRow>(&sql)
            .bind(item_id)
            .bind(first)
            .bind(second)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        let Some(row) = row else {
            return Ok(None);
        };
        Ok(self.hydrate_chats(vec![row]).await?.into_iter().next())
    }

    async fn list_chats_for_user(&self, user_id: Uuid) -> Result<Vec<ChatRecord>, RepoError> {
        let sql = format!(
            "SELECT {CHAT_COLUMNS} FROM chats WHERE $1 = ANY(participants) \
             ORDER BY updated_at DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, ChatRow>(&sql)
            .bind(user_id)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        self.hydrate_chats(rows).await
    }

    async fn append_message(
        &self,
        chat_id: Uuid,
        message: ChatMessage,
    ) -> Result<Option<ChatRecord>, RepoError> {
        let mut tx = self.pool().begin().await.map_err(map_sqlx_error)?;
        let touched = sqlx::query("UPDATE chats SET updated_at = $2 WHERE id = $1")
            .bind(chat_id)
            .bind(message.sent_at)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        if touched.rows_affected() == 0 {
            return Ok(None);
        }
        sqlx::query(
            "INSERT INTO chat_messages (chat_id, sender_id, body, sent_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(chat_id)
        .bind(message.sender_id)
        .bind(&message.body)
        .bind(message.sent_at)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;
        tx.commit().await.map_err(map_sqlx_error)?;

        self.find_chat(chat_id).await
    }
}
