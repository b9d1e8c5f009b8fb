//! Engine counter block.
//!
//! Plain atomics updated from the hot path and the background task; the
//! background task refreshes the gauge values and the status surface
//! serializes a [`CounterSnapshot`].

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Shared counter block for one engine instance
#[derive(Debug, Default)]
pub struct EngineCounters {
    total_auths: AtomicU64,
    positive_hits: AtomicU64,
    nak_hits: AtomicU64,
    backend_calls: AtomicU64,
    backend_failures: AtomicU64,
    lockouts: AtomicU64,
    bad_realms: AtomicU64,
    map_loads: AtomicU64,
    // gauges, refreshed by the background task
    positive_cache_size: AtomicU64,
    nak_cache_size: AtomicU64,
    realm_count: AtomicU64,
}

impl EngineCounters {
    pub fn inc_total_auths(&self) {
        self.total_auths.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_positive_hits(&self) {
        self.positive_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_nak_hits(&self) {
        self.nak_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_backend_calls(&self) {
        self.backend_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_backend_failures(&self) {
        self.backend_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_lockouts(&self) {
        self.lockouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_bad_realms(&self) {
        self.bad_realms.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_map_loads(&self) {
        self.map_loads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_cache_gauges(&self, positive: usize, nak: usize) {
        self.positive_cache_size
            .store(positive as u64, Ordering::Relaxed);
        self.nak_cache_size.store(nak as u64, Ordering::Relaxed);
    }

    pub fn set_realm_count(&self, realms: usize) {
        self.realm_count.store(realms as u64, Ordering::Relaxed);
    }

    pub fn backend_calls(&self) -> u64 {
        self.backend_calls.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            total_auths: self.total_auths.load(Ordering::Relaxed),
            positive_hits: self.positive_hits.load(Ordering::Relaxed),
            nak_hits: self.nak_hits.load(Ordering::Relaxed),
            backend_calls: self.backend_calls.load(Ordering::Relaxed),
            backend_failures: self.backend_failures.load(Ordering::Relaxed),
            lockouts: self.lockouts.load(Ordering::Relaxed),
            bad_realms: self.bad_realms.load(Ordering::Relaxed),
            map_loads: self.map_loads.load(Ordering::Relaxed),
            positive_cache_size: self.positive_cache_size.load(Ordering::Relaxed),
            nak_cache_size: self.nak_cache_size.load(Ordering::Relaxed),
            realm_count: self.realm_count.load(Ordering::Relaxed),
            taken_at: Utc::now(),
        }
    }
}

/// Point-in-time view of the counter block
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CounterSnapshot {
    pub total_auths: u64,
    pub positive_hits: u64,
    pub nak_hits: u64,
    pub backend_calls: u64,
    pub backend_failures: u64,
    pub lockouts: u64,
    pub bad_realms: u64,
    pub map_loads: u64,
    pub positive_cache_size: u64,
    pub nak_cache_size: u64,
    pub realm_count: u64,
    pub taken_at: DateTime<Utc>,
}
