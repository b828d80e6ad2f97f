//! Read-through and write-side consistency for cached snapshots.
//!
//! Reads go cache-first and fall back to a loader whose result is written
//! back with a TTL. Writes hand a [`Mutation`] to [`CacheCoordinator::apply`]
//! after the store commit. Cache failures never surface to callers: they are
//! logged, counted and treated as misses.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use super::config::CacheConfig;
use super::events::Mutation;
use super::keys::CacheKey;
use super::planner::{DetailPatch, InvalidationPlan};
use super::store::{CacheError, CacheStore};

const TARGET: &str = "agora::cache";

pub struct CacheCoordinator {
    config: CacheConfig,
    store: Arc<dyn CacheStore>,
}

impl CacheCoordinator {
    pub fn new(config: CacheConfig, store: Arc<dyn CacheStore>) -> Self {
        Self { config, store }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    /// Serve `key` from cache, or run `load` and cache its result for `ttl`.
    ///
    /// A hit is returned verbatim without freshness checks. `Ok(None)` from
    /// the loader is passed through and not cached.
    pub async fn read_through<T, E, F, Fut>(
        &self,
        key: &CacheKey,
        ttl: Duration,
        load: F,
    ) -> Result<Option<T>, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>, E>>,
    {
        if !self.config.is_enabled() {
            return load().await;
        }

        let rendered = key.to_string();
        if let Some(value) = self.lookup::<T>(key, &rendered).await {
            counter!("agora_cache_hit_total", "family" => key.family()).increment(1);
            return Ok(Some(value));
        }
        counter!("agora_cache_miss_total", "family" => key.family()).increment(1);

        let loaded = load().await?;
        if let Some(value) = loaded.as_ref() {
            self.populate(key, &rendered, value, ttl).await;
        }
        Ok(loaded)
    }

    /// Bring the cache in line with a committed mutation.
    pub async fn apply(&self, mutation: &Mutation) {
        if !self.config.is_enabled() {
            debug!(target: TARGET, mutation = mutation.name(), "cache apply skipped: cache disabled");
            return;
        }

        let plan = InvalidationPlan::for_mutation(mutation);
        debug!(target: TARGET, mutation = mutation.name(), plan = %plan, "applying invalidation plan");
        self.execute(&plan).await;
    }

    pub async fn execute(&self, plan: &InvalidationPlan) {
        self.invalidate(&plan.invalidate).await;
        if let Some(patch) = plan.patch.as_ref() {
            self.patch_detail(patch).await;
        }
    }

    /// Delete the given keys, logging and swallowing failures.
    pub async fn invalidate(&self, keys: &[CacheKey]) {
        for key in keys {
            let rendered = key.to_string();
            match self.store.delete(&rendered).await {
                Ok(()) => {
                    counter!("agora_cache_invalidate_total", "family" => key.family())
                        .increment(1);
                }
                Err(err) => self.report("delete", &rendered, &err),
            }
        }
    }

    /// Delete every key matching a glob pattern.
    pub async fn purge(&self, pattern: &str) -> Result<u64, CacheError> {
        let removed = self.store.delete_pattern(pattern).await?;
        debug!(target: TARGET, pattern, removed, "cache purge completed");
        Ok(removed)
    }

    /// Overwrite one field of a cached detail and refresh its TTL. Absent
    /// details stay absent; the next read repopulates from the store.
    async fn patch_detail(&self, patch: &DetailPatch) {
        let rendered = patch.key.to_string();
        let cached = match self.store.get(&rendered).await {
            Ok(Some(cached)) => cached,
            Ok(None) => return,
            Err(err) => {
                self.report("patch.get", &rendered, &err);
                return;
            }
        };

        let mut snapshot: Value = match serde_json::from_str(&cached) {
            Ok(Value::Object(map)) => Value::Object(map),
            Ok(_) | Err(_) => {
                warn!(target: TARGET, key = %rendered, "cached detail is not an object; dropping");
                if let Err(err) = self.store.delete(&rendered).await {
                    self.report("patch.delete", &rendered, &err);
                }
                return;
            }
        };

        snapshot[patch.field.as_str()] = Value::Array(
            patch
                .members
                .iter()
                .map(|member| Value::String(member.to_string()))
                .collect(),
        );

        match self
            .store
            .set(&rendered, snapshot.to_string(), self.config.detail_ttl())
            .await
        {
            Ok(()) => {
                counter!(
                    "agora_cache_patch_total",
                    "family" => patch.key.family(),
                    "field" => patch.field.as_str()
                )
                .increment(1);
            }
            Err(err) => self.report("patch.set", &rendered, &err),
        }
    }

    async fn lookup<T: DeserializeOwned>(&self, key: &CacheKey, rendered: &str) -> Option<T> {
        let raw = match self.store.get(rendered).await {
            Ok(raw) => raw?,
            Err(err) => {
                self.report("get", rendered, &err);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(
                    target: TARGET,
                    key = %rendered,
                    family = key.family(),
                    error = %err,
                    "cached snapshot failed to decode; treating as miss"
                );
                None
            }
        }
    }

    async fn populate<T: Serialize>(&self, key: &CacheKey, rendered: &str, value: &T, ttl: Duration) {
        let encoded = match serde_json::to_string(value) {
            Ok(encoded) => encoded,
            Err(err) => {
                self.report("encode", rendered, &CacheError::from(err));
                return;
            }
        };
        if let Err(err) = self.store.set(rendered, encoded, ttl).await {
            self.report("set", rendered, &err);
            return;
        }
        debug!(target: TARGET, key = %rendered, family = key.family(), ttl_secs = ttl.as_secs(), "cache populated");
    }

    fn report(&self, op: &'static str, key: &str, err: &CacheError) {
        counter!("agora_cache_error_total", "op" => op).increment(1);
        warn!(target: TARGET, op, key, error = %err, "cache operation failed; continuing without cache");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde::Deserialize;
    use uuid::Uuid;

    use super::*;
    use crate::cache::store::MemoryCacheStore;
    use crate::domain::types::ContentKind;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Snapshot {
        title: String,
        likes: Vec<Uuid>,
        views: Vec<Uuid>,
    }

    fn coordinator() -> (CacheCoordinator, Arc<MemoryCacheStore>) {
        let config = CacheConfig::default();
        let store = Arc::new(MemoryCacheStore::new(&config));
        (CacheCoordinator::new(config, store.clone()), store)
    }

    fn snapshot() -> Snapshot {
        Snapshot {
            title: "hello".to_string(),
            likes: Vec::new(),
            views: Vec::new(),
        }
    }

    #[tokio::test]
    async fn miss_populates_then_hit_skips_loader() {
        let (coordinator, store) = coordinator();
        let key = CacheKey::Detail(ContentKind::Post, Uuid::new_v4());
        let loads = AtomicUsize::new(0);

        for _ in 0..2 {
            let value: Option<Snapshot> = coordinator
                .read_through(&key, Duration::from_secs(60), || async {
                    loads.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, ()>(Some(snapshot()))
                })
                .await
                .expect("read");
            assert_eq!(value, Some(snapshot()));
        }

        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert!(store.get(&key.to_string()).await.expect("get").is_some());
    }

    #[tokio::test]
    async fn absent_results_are_not_cached() {
        let (coordinator, store) = coordinator();
        let key = CacheKey::Detail(ContentKind::Post, Uuid::new_v4());

        let value: Option<Snapshot> = coordinator
            .read_through(&key, Duration::from_secs(60), || async { Ok::<_, ()>(None) })
            .await
            .expect("read");

        assert!(value.is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn patch_rewrites_only_cached_details() {
        let (coordinator, store) = coordinator();
        let id = Uuid::new_v4();
        let liker = Uuid::new_v4();
        let key = CacheKey::Detail(ContentKind::Post, id);

        let patch_plan = InvalidationPlan::for_mutation(&Mutation::ContentLiked {
            kind: ContentKind::Post,
            id,
            topic_id: None,
            likes: vec![liker],
        });

        coordinator.execute(&patch_plan).await;
        assert!(store.get(&key.to_string()).await.expect("get").is_none());

        let _: Option<Snapshot> = coordinator
            .read_through(&key, Duration::from_secs(60), || async {
                Ok::<_, ()>(Some(snapshot()))
            })
            .await
            .expect("read");
        coordinator.execute(&patch_plan).await;

        let cached: Snapshot = serde_json::from_str(
            &store
                .get(&key.to_string())
                .await
                .expect("get")
                .expect("cached"),
        )
        .expect("decode");
        assert_eq!(cached.likes, vec![liker]);
        assert_eq!(cached.title, "hello");
    }

    struct FailingStore;

    #[async_trait]
    impl CacheStore for FailingStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
            Err(CacheError::backend("down"))
        }

        async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> Result<(), CacheError> {
            Err(CacheError::backend("down"))
        }

        async fn delete(&self, _key: &str) -> Result<(), CacheError> {
            Err(CacheError::backend("down"))
        }

        async fn scan(&self, _pattern: &str) -> Result<Vec<String>, CacheError> {
            Err(CacheError::backend("down"))
        }

        async fn delete_pattern(&self, _pattern: &str) -> Result<u64, CacheError> {
            Err(CacheError::backend("down"))
        }
    }

    #[tokio::test]
    async fn backend_failures_degrade_to_store_reads() {
        let coordinator = CacheCoordinator::new(CacheConfig::default(), Arc::new(FailingStore));
        let key = CacheKey::Listing(ContentKind::Post);

        let value: Option<Snapshot> = coordinator
            .read_through(&key, Duration::from_secs(60), || async {
                Ok::<_, ()>(Some(snapshot()))
            })
            .await
            .expect("read succeeds despite cache failure");
        assert_eq!(value, Some(snapshot()));

        coordinator
            .apply(&Mutation::ContentDeleted {
                kind: ContentKind::Post,
                id: Uuid::new_v4(),
                topic_id: None,
            })
            .await;
    }

    #[tokio::test]
    async fn disabled_cache_always_loads() {
        let config = CacheConfig {
            enabled: false,
            ..Default::default()
        };
        let store = Arc::new(MemoryCacheStore::new(&config));
        let coordinator = CacheCoordinator::new(config, store.clone());
        let key = CacheKey::AllTags;

        let _: Option<Vec<String>> = coordinator
            .read_through(&key, Duration::from_secs(60), || async {
                Ok::<_, ()>(Some(vec!["rust".to_string()]))
            })
            .await
            .expect("read");

        assert!(store.is_empty());
    }
}
