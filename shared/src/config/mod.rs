//! Configuration module for the AuthGrid server
//!
//! Configuration is organized by concern:
//! - `engine` - Authentication engine tuning (caches, lockout, background task)
//! - `cluster` - Peer synchronization transport
//! - `database` - Connection pooling for the SQL backend and realm map provider

pub mod cluster;
pub mod database;
pub mod engine;

// Re-export commonly used types
pub use cluster::ClusterSettings;
pub use database::DatabaseSettings;
pub use engine::EngineSettings;

/// Serde adapter storing a `std::time::Duration` as whole seconds.
pub mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
