//! Cluster transport implementations.

pub mod redis;

// Re-export commonly used types
pub use self::redis::RedisPeerTransport;
