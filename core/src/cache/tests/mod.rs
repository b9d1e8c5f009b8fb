//! Tests for the TTL+LRU cache

#[cfg(test)]
mod ttl_lru_tests;
