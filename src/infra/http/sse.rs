//! Server-sent event streams bound to a real-time room.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use async_stream::stream;
use axum::response::{
    IntoResponse, Response,
    sse::{Event, KeepAlive, Sse},
};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::application::realtime::RealtimeChannel;

const TARGET: &str = "agora::http::sse";
const KEEP_ALIVE: Duration = Duration::from_secs(15);

/// Leaves the room when the client disconnects and the stream is dropped.
struct RoomGuard {
    realtime: Arc<dyn RealtimeChannel>,
    room: String,
}

impl Drop for RoomGuard {
    fn drop(&mut self) {
        self.realtime.leave(&self.room);
        debug!(target: TARGET, room = %self.room, "left room");
    }
}

/// Join `room` and forward every published event as an SSE frame named after the event.
pub fn room_stream(realtime: Arc<dyn RealtimeChannel>, room: String) -> Response {
    let receiver = realtime.join(&room);
    debug!(target: TARGET, room = %room, "joined room");
    let guard = RoomGuard { realtime, room };

    let events = stream! {
        let guard = guard;
        let mut receiver = receiver;
        loop {
            match receiver.recv().await {
                Ok(message) => match Event::default().event(message.event).json_data(message.payload) {
                    Ok(event) => yield Ok::<Event, Infallible>(event),
                    Err(err) => {
                        warn!(target: TARGET, room = %guard.room, error = %err, "dropping unencodable event");
                    }
                },
                Err(RecvError::Lagged(skipped)) => {
                    warn!(target: TARGET, room = %guard.room, skipped, "subscriber lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    };

    Sse::new(events)
        .keep_alive(KeepAlive::new().interval(KEEP_ALIVE))
        .into_response()
}
