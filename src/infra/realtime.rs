//! In-process realtime hub: one broadcast channel per room.

use async_trait::async_trait;
use dashmap::DashMap;
use metrics::gauge;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::trace;

use crate::application::realtime::{RealtimeChannel, RealtimeError, RealtimeEvent};

const TARGET: &str = "agora::infra::realtime";
const DEFAULT_ROOM_CAPACITY: usize = 64;

pub struct RealtimeHub {
    rooms: DashMap<String, broadcast::Sender<RealtimeEvent>>,
    capacity: usize,
}

impl RealtimeHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            rooms: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    fn record_rooms(&self) {
        gauge!("agora_realtime_rooms").set(self.rooms.len() as f64);
    }
}

impl Default for RealtimeHub {
    fn default() -> Self {
        Self::new(DEFAULT_ROOM_CAPACITY)
    }
}

#[async_trait]
impl RealtimeChannel for RealtimeHub {
    async fn publish(
        &self,
        room: &str,
        event: &str,
        payload: Value,
    ) -> Result<usize, RealtimeError> {
        let Some(sender) = self.rooms.get(room).map(|entry| entry.value().clone()) else {
            trace!(target: TARGET, room, event, "no subscribers; event dropped");
            return Ok(0);
        };

        let delivered = sender
            .send(RealtimeEvent {
                event: event.to_string(),
                payload,
            })
            .unwrap_or(0);
        trace!(target: TARGET, room, event, delivered, "event published");
        Ok(delivered)
    }

    fn join(&self, room: &str) -> broadcast::Receiver<RealtimeEvent> {
        let receiver = self
            .rooms
            .entry(room.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe();
        self.record_rooms();
        receiver
    }

    fn leave(&self, room: &str) {
        self.rooms
            .remove_if(room, |_, sender| sender.receiver_count() == 0);
        self.record_rooms();
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let hub = RealtimeHub::default();
        let mut receiver = hub.join("chat:1");

        let delivered = hub
            .publish("chat:1", "new-message", json!({ "body": "hi" }))
            .await
            .expect("publish");

        assert_eq!(delivered, 1);
        let event = receiver.recv().await.expect("event");
        assert_eq!(event.event, "new-message");
        assert_eq!(event.payload["body"], "hi");
    }

    #[tokio::test]
    async fn rooms_without_subscribers_drop_events() {
        let hub = RealtimeHub::default();
        let delivered = hub
            .publish("notifications:nobody", "notification", json!({}))
            .await
            .expect("publish");
        assert_eq!(delivered, 0);
        assert_eq!(hub.room_count(), 0);
    }

    #[test]
    fn leaving_prunes_only_empty_rooms() {
        let hub = RealtimeHub::default();
        let first = hub.join("chat:2");
        let second = hub.join("chat:2");

        drop(first);
        hub.leave("chat:2");
        assert_eq!(hub.room_count(), 1);

        drop(second);
        hub.leave("chat:2");
        assert_eq!(hub.room_count(), 0);
    }
}
