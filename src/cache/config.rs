//! Cache configuration.
//!
//! Controls the read-through entity cache via the `[cache]` table of `agora.toml`.

use std::num::NonZeroUsize;
use std::time::Duration;

use serde::Deserialize;

const DEFAULT_CAPACITY: usize = 10_000;
const DEFAULT_DETAIL_TTL_SECS: u64 = 900;
const DEFAULT_COMMENTS_TTL_SECS: u64 = 300;
const DEFAULT_USER_INFO_TTL_SECS: u64 = 30 * 24 * 60 * 60;
const DEFAULT_SESSION_TTL_SECS: u64 = 30 * 24 * 60 * 60;

/// Cache configuration from `agora.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Enable read-through caching. Session tokens are stored regardless.
    pub enabled: bool,
    /// Maximum number of keys held by the in-process store.
    pub capacity: usize,
    /// TTL for content details, listings, tags and topics.
    pub detail_ttl_secs: u64,
    /// TTL for comment listings.
    pub comments_ttl_secs: u64,
    /// TTL for `userInfo:<id>` snapshots.
    pub user_info_ttl_secs: u64,
    /// TTL for `token:<token>` sessions.
    pub session_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: DEFAULT_CAPACITY,
            detail_ttl_secs: DEFAULT_DETAIL_TTL_SECS,
            comments_ttl_secs: DEFAULT_COMMENTS_TTL_SECS,
            user_info_ttl_secs: DEFAULT_USER_INFO_TTL_SECS,
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            capacity: settings.capacity.get(),
            detail_ttl_secs: settings.detail_ttl.as_secs(),
            comments_ttl_secs: settings.comments_ttl.as_secs(),
            user_info_ttl_secs: settings.user_info_ttl.as_secs(),
            session_ttl_secs: settings.session_ttl.as_secs(),
        }
    }
}

impl CacheConfig {
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns the capacity as NonZeroUsize, clamping to 1 if zero.
    pub fn capacity_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.capacity).unwrap_or(NonZeroUsize::MIN)
    }

    pub fn detail_ttl(&self) -> Duration {
        Duration::from_secs(self.detail_ttl_secs)
    }

    pub fn comments_ttl(&self) -> Duration {
        Duration::from_secs(self.comments_ttl_secs)
    }

    pub fn user_info_ttl(&self) -> Duration {
        Duration::from_secs(self.user_info_ttl_secs)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = CacheConfig::default();
        assert!(config.is_enabled());
        assert_eq!(config.capacity, 10_000);
        assert_eq!(config.detail_ttl(), Duration::from_secs(900));
        assert_eq!(config.comments_ttl(), Duration::from_secs(300));
        assert_eq!(config.user_info_ttl(), Duration::from_secs(2_592_000));
        assert_eq!(config.session_ttl(), Duration::from_secs(2_592_000));
    }

    #[test]
    fn non_zero_clamps_to_min() {
        let config = CacheConfig {
            capacity: 0,
            ..Default::default()
        };
        assert_eq!(config.capacity_non_zero().get(), 1);
    }
}
