//! Authentication engine configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::duration_secs;

/// Tuning knobs for the authentication engine.
///
/// Every duration is a ceiling or interval in whole seconds on the wire;
/// a zero duration or zero size disables the corresponding feature.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineSettings {
    /// How often the background task re-queries the realm map provider
    #[serde(with = "duration_secs", default = "defaults::realm_map_load_interval")]
    pub realm_map_load_interval: Duration,

    /// Positive cache per-entry TTL ceiling; zero disables positive caching
    #[serde(with = "duration_secs", default = "defaults::cache_ttl")]
    pub cache_ttl: Duration,

    /// Positive cache capacity; zero disables the cache entirely
    #[serde(default = "defaults::max_cache_size")]
    pub max_cache_size: usize,

    /// Negative cache per-entry TTL ceiling; zero disables negative caching
    #[serde(with = "duration_secs", default = "defaults::nak_cache_ttl")]
    pub nak_cache_ttl: Duration,

    /// Negative cache capacity; zero disables the cache entirely
    #[serde(default = "defaults::max_nak_cache_size")]
    pub max_nak_cache_size: usize,

    /// Background flush interval for both caches
    #[serde(with = "duration_secs", default = "defaults::cache_flush_interval")]
    pub cache_flush_interval: Duration,

    /// Period of the engine background task
    #[serde(with = "duration_secs", default = "defaults::bk_task_interval")]
    pub bk_task_interval: Duration,

    /// Emit a security log entry on successful authentication
    #[serde(default = "defaults::log_flag")]
    pub log_auth_success: bool,

    /// Emit a security log entry on failed authentication
    #[serde(default = "defaults::log_flag")]
    pub log_auth_failure: bool,

    /// Default maximum consecutive failures before an account locks
    /// (per-realm override via the mapping arg string)
    #[serde(default = "defaults::lockout_count")]
    pub lockout_count: u32,

    /// Sliding window within which failures accumulate; zero disables
    /// lockout (per-realm override)
    #[serde(with = "duration_secs", default = "defaults::lockout_threshold")]
    pub lockout_threshold: Duration,

    /// How long a locked account stays locked (per-realm override)
    #[serde(with = "duration_secs", default = "defaults::lockout_time")]
    pub lockout_time: Duration,
}

mod defaults {
    use std::time::Duration;

    pub fn realm_map_load_interval() -> Duration {
        Duration::from_secs(600)
    }
    pub fn cache_ttl() -> Duration {
        Duration::from_secs(600)
    }
    pub fn max_cache_size() -> usize {
        100_000
    }
    pub fn nak_cache_ttl() -> Duration {
        Duration::from_secs(900)
    }
    pub fn max_nak_cache_size() -> usize {
        100_000
    }
    pub fn cache_flush_interval() -> Duration {
        Duration::from_secs(60)
    }
    pub fn bk_task_interval() -> Duration {
        Duration::from_secs(5)
    }
    pub fn log_flag() -> bool {
        true
    }
    pub fn lockout_count() -> u32 {
        5
    }
    pub fn lockout_threshold() -> Duration {
        Duration::from_secs(60)
    }
    pub fn lockout_time() -> Duration {
        Duration::from_secs(300)
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            realm_map_load_interval: defaults::realm_map_load_interval(),
            cache_ttl: defaults::cache_ttl(),
            max_cache_size: defaults::max_cache_size(),
            nak_cache_ttl: defaults::nak_cache_ttl(),
            max_nak_cache_size: defaults::max_nak_cache_size(),
            cache_flush_interval: defaults::cache_flush_interval(),
            bk_task_interval: defaults::bk_task_interval(),
            log_auth_success: defaults::log_flag(),
            log_auth_failure: defaults::log_flag(),
            lockout_count: defaults::lockout_count(),
            lockout_threshold: defaults::lockout_threshold(),
            lockout_time: defaults::lockout_time(),
        }
    }
}

impl EngineSettings {
    /// Whether the positive cache is enabled at all
    pub fn positive_cache_enabled(&self) -> bool {
        self.max_cache_size > 0 && !self.cache_ttl.is_zero()
    }

    /// Whether the negative cache is enabled at all
    pub fn negative_cache_enabled(&self) -> bool {
        self.max_nak_cache_size > 0 && !self.nak_cache_ttl.is_zero()
    }

    /// Set the positive cache TTL ceiling
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Set the positive cache capacity
    pub fn with_max_cache_size(mut self, size: usize) -> Self {
        self.max_cache_size = size;
        self
    }

    /// Set the negative cache TTL ceiling
    pub fn with_nak_cache_ttl(mut self, ttl: Duration) -> Self {
        self.nak_cache_ttl = ttl;
        self
    }

    /// Set the negative cache capacity
    pub fn with_max_nak_cache_size(mut self, size: usize) -> Self {
        self.max_nak_cache_size = size;
        self
    }

    /// Set the default lockout policy triple
    pub fn with_lockout(mut self, count: u32, threshold: Duration, time: Duration) -> Self {
        self.lockout_count = count;
        self.lockout_threshold = threshold;
        self.lockout_time = time;
        self
    }

    /// Set the background task period
    pub fn with_bk_task_interval(mut self, interval: Duration) -> Self {
        self.bk_task_interval = interval;
        self
    }

    /// Set the realm map reload interval
    pub fn with_realm_map_load_interval(mut self, interval: Duration) -> Self {
        self.realm_map_load_interval = interval;
        self
    }
}
