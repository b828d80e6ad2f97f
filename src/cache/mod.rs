//! Agora cache layer
//!
//! A read-through snapshot cache in front of the entity store:
//!
//! - **Store**: key-value contract with TTLs (`CacheStore`), in-process LRU
//!   implementation (`MemoryCacheStore`)
//! - **Planner**: maps a committed mutation to the keys it invalidates or patches
//! - **Coordinator**: cache-first reads, invalidation and patch-in-place writes
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! enabled = true
//! capacity = 10000
//! detail_ttl_secs = 900
//! comments_ttl_secs = 300
//! ```

mod config;
mod coordinator;
mod events;
mod keys;
mod lock;
mod planner;
mod store;

pub use config::CacheConfig;
pub use coordinator::CacheCoordinator;
pub use events::Mutation;
pub use keys::{CacheKey, SESSION_PATTERN};
pub use planner::{DetailPatch, InvalidationPlan, PatchField};
pub use store::{CacheError, CacheStore, MemoryCacheStore, glob_match};
