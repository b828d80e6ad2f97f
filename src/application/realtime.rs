//! Push channel contract used to deliver events to connected clients.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::broadcast;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum RealtimeError {
    #[error("failed to encode realtime payload: {0}")]
    Encode(#[from] serde_json::Error),
}

/// One named event delivered to every subscriber of a room.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RealtimeEvent {
    pub event: String,
    pub payload: Value,
}

#[async_trait]
pub trait RealtimeChannel: Send + Sync {
    /// Deliver to current subscribers of `room`, returning how many received it.
    /// Rooms without subscribers drop the event.
    async fn publish(&self, room: &str, event: &str, payload: Value)
    -> Result<usize, RealtimeError>;

    fn join(&self, room: &str) -> broadcast::Receiver<RealtimeEvent>;

    /// Release the room once its last subscriber is gone.
    fn leave(&self, room: &str);
}

pub fn notification_room(user_id: Uuid) -> String {
    format!("notifications:{user_id}")
}

pub fn chat_room(chat_id: Uuid) -> String {
    format!("chat:{chat_id}")
}
