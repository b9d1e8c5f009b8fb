//! Unit tests for cache bounds, expiry, and the eviction hook

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::cache::ttl_lru::TtlLruCache;

const TTL: Duration = Duration::from_secs(60);

#[test]
fn stores_and_retrieves() {
    let mut cache: TtlLruCache<String, u32> = TtlLruCache::new(10, TTL);
    cache.add("a".into(), 1, None);
    assert_eq!(cache.try_get(&"a".to_string()), Some(&1));
    assert_eq!(cache.try_get(&"b".to_string()), None);
    assert_eq!(cache.stats().hits, 1);
    assert_eq!(cache.stats().misses, 1);
}

#[test]
fn capacity_evicts_least_recently_used() {
    let mut cache: TtlLruCache<u32, u32> = TtlLruCache::new(2, TTL);
    cache.add(1, 10, None);
    cache.add(2, 20, None);
    // touch 1 so 2 becomes the LRU entry
    assert!(cache.try_get(&1).is_some());
    cache.add(3, 30, None);

    assert_eq!(cache.len(), 2);
    assert!(cache.try_get(&2).is_none());
    assert!(cache.try_get(&1).is_some());
    assert!(cache.try_get(&3).is_some());
}

#[test]
fn entries_expire() {
    let mut cache: TtlLruCache<u32, u32> = TtlLruCache::new(10, Duration::from_millis(20));
    cache.add(1, 10, None);
    assert!(cache.try_get(&1).is_some());
    std::thread::sleep(Duration::from_millis(40));
    assert!(cache.try_get(&1).is_none());
    assert_eq!(cache.len(), 0);
}

#[test]
fn per_entry_ttl_overrides_default() {
    let mut cache: TtlLruCache<u32, u32> = TtlLruCache::new(10, Duration::from_millis(20));
    cache.add(1, 10, Some(Duration::from_secs(60)));
    std::thread::sleep(Duration::from_millis(40));
    assert!(cache.try_get(&1).is_some());
}

#[test]
fn touch_restarts_lifetime() {
    let mut cache: TtlLruCache<u32, u32> = TtlLruCache::new(10, Duration::from_millis(40));
    cache.add(1, 10, None);
    std::thread::sleep(Duration::from_millis(25));
    assert!(cache.touch(&1, Duration::from_millis(60)));
    std::thread::sleep(Duration::from_millis(30));
    // original deadline passed, touched deadline has not
    assert!(cache.try_get(&1).is_some());
    assert!(!cache.touch(&2, Duration::from_secs(1)));
}

#[test]
fn flush_removes_only_expired() {
    let mut cache: TtlLruCache<u32, u32> = TtlLruCache::new(10, Duration::from_millis(20));
    cache.add(1, 10, None);
    cache.add(2, 20, Some(Duration::from_secs(60)));
    std::thread::sleep(Duration::from_millis(40));
    assert_eq!(cache.flush_expired(), 1);
    assert_eq!(cache.len(), 1);
    assert!(cache.contains(&2));
}

#[test]
fn eviction_hook_sees_capacity_eviction_removal_and_clear() {
    let disposed: Arc<Mutex<Vec<u32>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&disposed);
    let mut cache: TtlLruCache<u32, u32> = TtlLruCache::new(2, TTL)
        .with_eviction_hook(move |_, value| sink.lock().unwrap().push(*value));

    cache.add(1, 10, None);
    cache.add(2, 20, None);
    cache.add(3, 30, None); // evicts 10
    cache.remove(&2); // disposes 20
    cache.clear(); // disposes 30

    assert_eq!(*disposed.lock().unwrap(), vec![10, 20, 30]);
}

#[test]
fn eviction_hook_fires_on_expiry() {
    let fired = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&fired);
    let mut cache: TtlLruCache<u32, u32> = TtlLruCache::new(10, Duration::from_millis(20))
        .with_eviction_hook(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

    cache.add(1, 10, None);
    std::thread::sleep(Duration::from_millis(40));
    assert!(cache.try_get(&1).is_none());
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[test]
fn zero_capacity_is_unbounded() {
    let mut cache: TtlLruCache<u32, u32> = TtlLruCache::new(0, TTL);
    for i in 0..1000 {
        cache.add(i, i, None);
    }
    assert_eq!(cache.len(), 1000);
}

#[test]
fn keys_lists_current_entries() {
    let mut cache: TtlLruCache<String, u32> = TtlLruCache::new(10, TTL);
    cache.add("test.com/jeff".into(), 1, None);
    cache.add("test.com/jane".into(), 2, None);
    cache.add("example.com/sam".into(), 3, None);

    let mut keys = cache.keys();
    keys.sort();
    assert_eq!(
        keys,
        vec!["example.com/sam", "test.com/jane", "test.com/jeff"]
    );
}
