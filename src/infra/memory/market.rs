use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{MemoryRepositories, newest_first};
use crate::application::repos::{CreateItemParams, MarketRepo, RepoError};
use crate::domain::entities::{ChatMessage, ChatRecord, ItemRecord};
use crate::domain::types::ItemStatus;

#[async_trait]
impl MarketRepo for MemoryRepositories {
    async fn create_item(&self, params: CreateItemParams) -> Result<ItemRecord, RepoError> {
        let now = OffsetDateTime::now_utc();
        let record = ItemRecord {
            id: Uuid::new_v4(),
            seller_id: params.seller_id,
            title: params.title,
            description: params.description,
            price_cents: params.price_cents,
            photos: params.photos,
            status: ItemStatus::Available,
            buyer_id: None,
            created_at: now,
            updated_at: now,
        };
        self.items.write().await.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_item(&self, id: Uuid) -> Result<Option<ItemRecord>, RepoError> {
        Ok(self.items.read().await.get(&id).cloned())
    }

    async fn list_available(&self) -> Result<Vec<ItemRecord>, RepoError> {
        let mut items: Vec<ItemRecord> = self
            .items
            .read()
            .await
            .values()
            .filter(|item| item.status == ItemStatus::Available)
            .cloned()
            .collect();
        newest_first(&mut items, |item| (item.created_at, item.id));
        Ok(items)
    }

    async fn list_by_seller(&self, seller_id: Uuid) -> Result<Vec<ItemRecord>, RepoError> {
        let mut items: Vec<ItemRecord> = self
            .items
            .read()
            .await
            .values()
            .filter(|item| item.seller_id == seller_id)
            .cloned()
            .collect();
        newest_first(&mut items, |item| (item.created_at, item.id));
        Ok(items)
    }

    async fn mark_sold(&self, id: Uuid, buyer_id: Uuid) -> Result<Option<ItemRecord>, RepoError> {
        let mut items = self.items.write().await;
        Ok(items
            .get_mut(&id)
            .filter(|item| item.status == ItemStatus::Available)
            .map(|item| {
                item.status = ItemStatus::Sold;
                item.buyer_id = Some(buyer_id);
                item.updated_at = OffsetDateTime::now_utc();
                item.clone()
            }))
    }

    async fn create_chat(
        &self,
        item_id: Uuid,
        participants: &[Uuid],
    ) -> Result<ChatRecord, RepoError> {
        let now = OffsetDateTime::now_utc();
        let record = ChatRecord {
            id: Uuid::new_v4(),
            item_id,
            participants: participants.to_vec(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        self.chats.write().await.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_chat(&self, id: Uuid) -> Result<Option<ChatRecord>, RepoError> {
        Ok(self.chats.read().await.get(&id).cloned())
    }

    async fn find_chat_between(
        &self,
        item_id: Uuid,
        first: Uuid,
        second: Uuid,
    ) -> Result<Option<ChatRecord>, RepoError> {
        Ok(self
            .chats
            .read()
            .await
            .values()
            .find(|chat| {
                chat.item_id == item_id && chat.has_participant(first) && chat.has_participant(second)
            })
            .cloned())
    }

    async fn list_chats_for_user(&self, user_id: Uuid) -> Result<Vec<ChatRecord>, RepoError> {
        let mut chats: Vec<ChatRecord> = self
            .chats
            .read()
            .await
            .values()
            .filter(|chat| chat.has_participant(user_id))
            .cloned()
            .collect();
        newest_first(&mut chats, |chat| (chat.updated_at, chat.id));
        Ok(chats)
    }

    async fn append_message(
        &self,
        chat_id: Uuid,
        message: ChatMessage,
    ) -> Result<Option<ChatRecord>, RepoError> {
        let mut chats = self.chats.write().await;
        Ok(chats.get_mut(&chat_id).map(|chat| {
            chat.updated_at = message.sent_at;
            chat.messages.push(message);
            chat.clone()
        }))
    }
}
