//! Generic bounded map with per-entry expiry and LRU eviction.
//!
//! Both engine caches (accepted credentials and lockout records) are
//! instances of [`TtlLruCache`]. The container itself is single-threaded;
//! the engine serializes access through its own mutex, which also makes
//! the cache operations atomic with respect to each other.
//!
//! An optional eviction hook observes every entry leaving the cache —
//! capacity eviction, expiry, explicit removal, and clearing. The negative
//! cache uses it to emit lock-released events when a locked record dies.

use lru::LruCache;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

/// Hit/miss counters for one cache instance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> Entry<V> {
    fn new(value: V, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

type EvictionHook<K, V> = Box<dyn Fn(&K, &V) + Send>;

/// Keyed store with a bounded item count, per-entry TTL, and
/// least-recently-used eviction.
///
/// `max_items == 0` means unbounded; the engine never allocates an
/// unbounded cache (a zero capacity setting disables the cache instead),
/// but the container supports it for direct use.
pub struct TtlLruCache<K: Hash + Eq + Clone, V> {
    entries: LruCache<K, Entry<V>>,
    default_ttl: Duration,
    on_evict: Option<EvictionHook<K, V>>,
    stats: CacheStats,
}

impl<K: Hash + Eq + Clone, V> TtlLruCache<K, V> {
    pub fn new(max_items: usize, default_ttl: Duration) -> Self {
        let entries = match NonZeroUsize::new(max_items) {
            Some(cap) => LruCache::new(cap),
            None => LruCache::unbounded(),
        };
        Self {
            entries,
            default_ttl,
            on_evict: None,
            stats: CacheStats::default(),
        }
    }

    /// Install a hook observing every entry that leaves the cache
    pub fn with_eviction_hook(mut self, hook: impl Fn(&K, &V) + Send + 'static) -> Self {
        self.on_evict = Some(Box::new(hook));
        self
    }

    fn dispose(on_evict: &Option<EvictionHook<K, V>>, key: &K, entry: &Entry<V>) {
        if let Some(hook) = on_evict {
            hook(key, &entry.value);
        }
    }

    /// Look up a live entry, promoting it to most-recently-used.
    /// An expired entry is disposed of on the way.
    pub fn try_get(&mut self, key: &K) -> Option<&V> {
        if self.expire_if_needed(key) || !self.entries.contains(key) {
            self.stats.misses += 1;
            return None;
        }
        self.stats.hits += 1;
        self.entries.get(key).map(|entry| &entry.value)
    }

    /// Mutable variant of [`try_get`](Self::try_get)
    pub fn try_get_mut(&mut self, key: &K) -> Option<&mut V> {
        if self.expire_if_needed(key) || !self.entries.contains(key) {
            self.stats.misses += 1;
            return None;
        }
        self.stats.hits += 1;
        self.entries.get_mut(key).map(|entry| &mut entry.value)
    }

    fn expire_if_needed(&mut self, key: &K) -> bool {
        let expired = matches!(self.entries.peek(key), Some(entry) if entry.is_expired());
        if expired {
            if let Some(entry) = self.entries.pop(key) {
                Self::dispose(&self.on_evict, key, &entry);
            }
        }
        expired
    }

    /// Insert an entry, overriding the default TTL when given. A full
    /// cache evicts its least-recently-used entry through the hook; a
    /// replaced value is disposed the same way.
    pub fn add(&mut self, key: K, value: V, ttl: Option<Duration>) {
        let entry = Entry::new(value, ttl.unwrap_or(self.default_ttl));
        if let Some((evicted_key, evicted)) = self.entries.push(key, entry) {
            Self::dispose(&self.on_evict, &evicted_key, &evicted);
        }
    }

    /// Whether a live entry exists, without disturbing recency or stats
    pub fn contains(&self, key: &K) -> bool {
        self.peek(key).is_some()
    }

    /// Look at a live entry without disturbing recency or stats
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.entries
            .peek(key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| &entry.value)
    }

    /// Restart an entry's lifetime with a new TTL, promoting it.
    /// Returns false when the key is absent or already expired.
    pub fn touch(&mut self, key: &K, new_ttl: Duration) -> bool {
        if self.expire_if_needed(key) {
            return false;
        }
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.expires_at = Instant::now() + new_ttl;
                true
            }
            None => false,
        }
    }

    /// Remove an entry, disposing of it through the hook
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let entry = self.entries.pop(key)?;
        Self::dispose(&self.on_evict, key, &entry);
        Some(entry.value)
    }

    /// Remove every entry, disposing of each
    pub fn clear(&mut self) {
        while let Some((key, entry)) = self.entries.pop_lru() {
            Self::dispose(&self.on_evict, &key, &entry);
        }
    }

    /// Drop every expired entry in one pass; returns how many were removed
    pub fn flush_expired(&mut self) -> usize {
        let expired: Vec<K> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            if let Some(entry) = self.entries.pop(key) {
                Self::dispose(&self.on_evict, key, &entry);
            }
        }
        expired.len()
    }

    /// Snapshot of the keys, most-recently-used first
    pub fn keys(&self) -> Vec<K> {
        self.entries.iter().map(|(key, _)| key.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}

impl<K: Hash + Eq + Clone, V> std::fmt::Debug for TtlLruCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlLruCache")
            .field("len", &self.entries.len())
            .field("default_ttl", &self.default_ttl)
            .field("stats", &self.stats)
            .finish()
    }
}
