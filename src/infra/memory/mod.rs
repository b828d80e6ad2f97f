//! In-process repositories for development and tests.
//!
//! Each table sits behind its own `tokio::sync::RwLock`; every trait method
//! takes the lock once, so set toggles and view-once checks are atomic with
//! respect to each other just like the single-statement SQL versions.

mod content;
mod market;
mod social;
mod users;

use std::collections::HashMap;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::entities::{
    BanRecord, ChatRecord, CommentRecord, ContentRecord, ItemRecord, NotificationRecord,
    TagRecord, TopicRecord, UserRecord,
};

#[derive(Default)]
pub struct MemoryRepositories {
    users: RwLock<HashMap<Uuid, UserRecord>>,
    bans: RwLock<HashMap<Uuid, BanRecord>>,
    content: RwLock<HashMap<Uuid, ContentRecord>>,
    comments: RwLock<HashMap<Uuid, CommentRecord>>,
    notifications: RwLock<HashMap<Uuid, NotificationRecord>>,
    topics: RwLock<HashMap<Uuid, TopicRecord>>,
    tags: RwLock<HashMap<Uuid, TagRecord>>,
    items: RwLock<HashMap<Uuid, ItemRecord>>,
    chats: RwLock<HashMap<Uuid, ChatRecord>>,
}

impl MemoryRepositories {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Sort newest first by a timestamp, breaking ties on id for stable output.
fn newest_first<T, K: Ord>(records: &mut [T], key: impl Fn(&T) -> (K, Uuid)) {
    records.sort_by(|a, b| key(b).cmp(&key(a)));
}
