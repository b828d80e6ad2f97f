//! Cache storage.
//!
//! `CacheStore` is the key-value contract the coordinator and session layer
//! talk to. `MemoryCacheStore` is the in-process implementation: an LRU map
//! of JSON strings with per-entry expiry. Sessions get their own unbounded
//! instance so snapshot traffic can never evict a live login.

use std::sync::RwLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use lru::LruCache;
use metrics::counter;
use thiserror::Error;

use super::config::CacheConfig;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Backend(String),
    #[error("cached value could not be encoded or decoded: {0}")]
    Codec(#[from] serde_json::Error),
}

impl CacheError {
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }
}

#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Keys matching a glob pattern (`*` any run, `?` one character).
    async fn scan(&self, pattern: &str) -> Result<Vec<String>, CacheError>;

    /// Delete every key matching `pattern`, returning how many were removed.
    async fn delete_pattern(&self, pattern: &str) -> Result<u64, CacheError>;
}

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at <= now
    }
}

/// In-process TTL store with LRU eviction once `capacity` keys are held.
pub struct MemoryCacheStore {
    entries: RwLock<LruCache<String, Entry>>,
}

impl MemoryCacheStore {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(config.capacity_non_zero())),
        }
    }

    /// A store that never evicts; entries leave only by expiry or deletion.
    pub fn unbounded() -> Self {
        Self {
            entries: RwLock::new(LruCache::unbounded()),
        }
    }

    /// Drop every expired entry, returning how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = rw_write(&self.entries, SOURCE, "sweep_expired");
        let expired: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            entries.pop(key);
        }
        expired.len()
    }

    /// Number of live (unexpired) keys.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        rw_read(&self.entries, SOURCE, "len")
            .iter()
            .filter(|(_, entry)| !entry.is_expired(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = Instant::now();
        let mut entries = rw_write(&self.entries, SOURCE, "get");
        let expired = match entries.get(key) {
            Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.value.clone())),
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let entry = Entry {
            value,
            expires_at: Instant::now() + ttl,
        };
        let evicted = rw_write(&self.entries, SOURCE, "set").push(key.to_string(), entry);
        if let Some((evicted_key, _)) = evicted
            && evicted_key != key
        {
            counter!("agora_cache_evict_total").increment(1);
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        rw_write(&self.entries, SOURCE, "delete").pop(key);
        Ok(())
    }

    async fn scan(&self, pattern: &str) -> Result<Vec<String>, CacheError> {
        let now = Instant::now();
        let keys = rw_read(&self.entries, SOURCE, "scan")
            .iter()
            .filter(|(key, entry)| !entry.is_expired(now) && glob_match(pattern, key))
            .map(|(key, _)| key.clone())
            .collect();
        Ok(keys)
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<u64, CacheError> {
        let mut entries = rw_write(&self.entries, SOURCE, "delete_pattern");
        let matching: Vec<String> = entries
            .iter()
            .filter(|(key, _)| glob_match(pattern, key))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &matching {
            entries.pop(key);
        }
        Ok(matching.len() as u64)
    }
}

/// Redis-style glob restricted to `*` and `?`.
pub fn glob_match(pattern: &str, candidate: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let candidate: Vec<char> = candidate.chars().collect();

    let (mut p, mut c) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while c < candidate.len() {
        match pattern.get(p) {
            Some('*') => {
                backtrack = Some((p, c));
                p += 1;
            }
            Some('?') => {
                p += 1;
                c += 1;
            }
            Some(ch) if *ch == candidate[c] => {
                p += 1;
                c += 1;
            }
            _ => match backtrack {
                Some((star_p, star_c)) => {
                    p = star_p + 1;
                    c = star_c + 1;
                    backtrack = Some((star_p, star_c + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|ch| *ch == '*')
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use super::*;

    const TTL: Duration = Duration::from_secs(60);

    fn store_with_capacity(capacity: usize) -> MemoryCacheStore {
        MemoryCacheStore::new(&CacheConfig {
            capacity,
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn set_get_delete() {
        let store = store_with_capacity(8);
        store
            .set("post:1", "{}".to_string(), TTL)
            .await
            .expect("set");
        assert_eq!(
            store.get("post:1").await.expect("get").as_deref(),
            Some("{}")
        );

        store.delete("post:1").await.expect("delete");
        assert!(store.get("post:1").await.expect("get").is_none());
    }

    #[tokio::test]
    async fn expired_entries_read_as_missing() {
        let store = store_with_capacity(8);
        store
            .set("allPosts", "[]".to_string(), Duration::ZERO)
            .await
            .expect("set");

        assert!(store.get("allPosts").await.expect("get").is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn lru_eviction_drops_oldest_key() {
        let store = store_with_capacity(2);
        store.set("a", "1".to_string(), TTL).await.expect("set a");
        store.set("b", "2".to_string(), TTL).await.expect("set b");
        store.set("c", "3".to_string(), TTL).await.expect("set c");

        assert!(store.get("a").await.expect("get a").is_none());
        assert!(store.get("b").await.expect("get b").is_some());
        assert!(store.get("c").await.expect("get c").is_some());
    }

    #[tokio::test]
    async fn unbounded_store_keeps_every_key() {
        let store = MemoryCacheStore::unbounded();
        for i in 0..20_000 {
            store
                .set(&format!("token:{i}"), "user".to_string(), TTL)
                .await
                .expect("set");
        }
        assert_eq!(store.len(), 20_000);
        assert!(store.get("token:0").await.expect("get").is_some());
    }

    #[tokio::test]
    async fn sweep_removes_only_expired_entries() {
        let store = MemoryCacheStore::unbounded();
        store
            .set("token:old", "a".to_string(), Duration::ZERO)
            .await
            .expect("set old");
        store
            .set("token:live", "b".to_string(), TTL)
            .await
            .expect("set live");

        assert_eq!(store.sweep_expired(), 1);
        assert!(store.get("token:live").await.expect("get").is_some());
        assert_eq!(store.sweep_expired(), 0);
    }

    #[tokio::test]
    async fn scan_and_delete_by_pattern() {
        let store = store_with_capacity(16);
        for key in ["token:a", "token:b", "userInfo:1", "topicPosts:9"] {
            store.set(key, "x".to_string(), TTL).await.expect("set");
        }

        let mut tokens = store.scan("token:*").await.expect("scan");
        tokens.sort();
        assert_eq!(tokens, vec!["token:a".to_string(), "token:b".to_string()]);

        let removed = store.delete_pattern("token:*").await.expect("delete");
        assert_eq!(removed, 2);
        assert!(store.get("userInfo:1").await.expect("get").is_some());
        assert!(store.scan("token:*").await.expect("scan").is_empty());
    }

    #[test]
    fn glob_matching() {
        assert!(glob_match("*", "anything"));
        assert!(glob_match("token:*", "token:abc"));
        assert!(glob_match("topic*:*", "topicNews:1"));
        assert!(glob_match("post:?", "post:1"));
        assert!(!glob_match("post:?", "post:12"));
        assert!(!glob_match("token:*", "userInfo:1"));
        assert!(glob_match("*Posts", "allPosts"));
    }

    #[tokio::test]
    async fn store_recovers_from_poisoned_lock() {
        let store = store_with_capacity(4);

        let _ = catch_unwind(AssertUnwindSafe(|| {
            let _guard = store
                .entries
                .write()
                .expect("entries lock should be acquired");
            panic!("poison entries lock");
        }));

        store.set("k", "v".to_string(), TTL).await.expect("set");
        assert_eq!(store.get("k").await.expect("get").as_deref(), Some("v"));
    }
}
