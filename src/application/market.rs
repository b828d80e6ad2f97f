//! Marketplace items and the buyer/seller chats attached to them.

use std::sync::Arc;

use metrics::counter;
use serde_json::json;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::error::AppError;
use crate::application::identity::Principal;
use crate::application::realtime::{RealtimeChannel, chat_room};
use crate::application::repos::{CreateItemParams, MarketRepo};
use crate::domain::entities::{ChatMessage, ChatRecord, ItemRecord};
use crate::domain::types::ItemStatus;

const TARGET: &str = "agora::application::market";
pub const NEW_MESSAGE_EVENT: &str = "new-message";

#[derive(Debug, Clone)]
pub struct CreateItemCommand {
    pub title: String,
    pub description: String,
    pub price_cents: i64,
    pub photos: Vec<String>,
}

#[derive(Clone)]
pub struct MarketService {
    repo: Arc<dyn MarketRepo>,
    realtime: Arc<dyn RealtimeChannel>,
}

impl MarketService {
    pub fn new(repo: Arc<dyn MarketRepo>, realtime: Arc<dyn RealtimeChannel>) -> Self {
        Self { repo, realtime }
    }

    pub async fn create_item(
        &self,
        principal: &Principal,
        command: CreateItemCommand,
    ) -> Result<ItemRecord, AppError> {
        if command.title.trim().is_empty() {
            return Err(AppError::validation("title must not be empty"));
        }
        if command.price_cents < 0 {
            return Err(AppError::validation("price must not be negative"));
        }
        if command.photos.is_empty() {
            return Err(AppError::validation("at least one photo is required"));
        }

        let item = self
            .repo
            .create_item(CreateItemParams {
                seller_id: principal.user_id,
                title: command.title.trim().to_string(),
                description: command.description,
                price_cents: command.price_cents,
                photos: command.photos,
            })
            .await?;
        info!(target: TARGET, item = %item.id, seller = %principal.user_id, "item listed");
        Ok(item)
    }

    pub async fn list_available(&self) -> Result<Vec<ItemRecord>, AppError> {
        Ok(self.repo.list_available().await?)
    }

    pub async fn list_mine(&self, principal: &Principal) -> Result<Vec<ItemRecord>, AppError> {
        Ok(self.repo.list_by_seller(principal.user_id).await?)
    }

    pub async fn get_item(&self, id: Uuid) -> Result<ItemRecord, AppError> {
        self.require_item(id).await
    }

    pub async fn purchase(&self, principal: &Principal, id: Uuid) -> Result<ItemRecord, AppError> {
        let item = self.require_item(id).await?;
        if item.seller_id == principal.user_id {
            return Err(AppError::validation("sellers cannot buy their own items"));
        }
        if item.status == ItemStatus::Sold {
            return Err(AppError::conflict("item is already sold"));
        }

        // The store only flips available items, so a concurrent buyer loses here.
        let sold = self
            .repo
            .mark_sold(id, principal.user_id)
            .await?
            .ok_or_else(|| AppError::conflict("item is already sold"))?;
        info!(target: TARGET, item = %id, buyer = %principal.user_id, "item sold");
        Ok(sold)
    }

    /// Open (or reuse) the chat between the caller and the item's seller.
    pub async fn open_chat(&self, principal: &Principal, item_id: Uuid) -> Result<ChatRecord, AppError> {
        let item = self.require_item(item_id).await?;
        if item.seller_id == principal.user_id {
            return Err(AppError::validation("sellers cannot open a chat with themselves"));
        }

        if let Some(chat) = self
            .repo
            .find_chat_between(item.id, principal.user_id, item.seller_id)
            .await?
        {
            return Ok(chat);
        }
        Ok(self
            .repo
            .create_chat(item.id, &[principal.user_id, item.seller_id])
            .await?)
    }

    pub async fn list_chats(&self, principal: &Principal) -> Result<Vec<ChatRecord>, AppError> {
        Ok(self.repo.list_chats_for_user(principal.user_id).await?)
    }

    pub async fn get_chat(&self, principal: &Principal, id: Uuid) -> Result<ChatRecord, AppError> {
        let chat = self
            .repo
            .find_chat(id)
            .await?
            .ok_or_else(|| AppError::not_found("chat"))?;
        if !chat.has_participant(principal.user_id) {
            return Err(AppError::Forbidden("only chat participants may read this chat"));
        }
        Ok(chat)
    }

    /// Append a message and push it to the chat room.
    pub async fn send_message(
        &self,
        principal: &Principal,
        chat_id: Uuid,
        body: &str,
    ) -> Result<ChatMessage, AppError> {
        if body.trim().is_empty() {
            return Err(AppError::validation("message must not be empty"));
        }
        self.get_chat(principal, chat_id).await?;

        let message = ChatMessage {
            sender_id: principal.user_id,
            body: body.to_string(),
            sent_at: OffsetDateTime::now_utc(),
        };
        self.repo
            .append_message(chat_id, message.clone())
            .await?
            .ok_or_else(|| AppError::not_found("chat"))?;

        let room = chat_room(chat_id);
        let payload = json!({ "chatId": chat_id, "message": &message });
        match self.realtime.publish(&room, NEW_MESSAGE_EVENT, payload).await {
            Ok(_) => {
                counter!("agora_realtime_publish_total", "event" => NEW_MESSAGE_EVENT).increment(1);
            }
            Err(err) => warn!(target: TARGET, room = %room, error = %err, "failed to publish chat message"),
        }
        Ok(message)
    }

    async fn require_item(&self, id: Uuid) -> Result<ItemRecord, AppError> {
        self.repo
            .find_item(id)
            .await?
            .ok_or_else(|| AppError::not_found("item"))
    }
}
