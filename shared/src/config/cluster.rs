//! Cluster synchronization transport configuration

use serde::{Deserialize, Serialize};

/// Settings for the peer synchronization transport.
///
/// When `enabled` is false the engine runs standalone and no transport is
/// constructed.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClusterSettings {
    /// Whether peer synchronization is active
    #[serde(default)]
    pub enabled: bool,

    /// Redis connection URL for the pub/sub transport
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Pub/sub channel shared by all engine instances
    #[serde(default = "default_channel")]
    pub channel: String,
}

fn default_redis_url() -> String {
    String::from("redis://127.0.0.1:6379")
}

fn default_channel() -> String {
    String::from("authgrid:sync")
}

impl Default for ClusterSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            redis_url: default_redis_url(),
            channel: default_channel(),
        }
    }
}

impl ClusterSettings {
    /// Enable synchronization over the given Redis instance
    pub fn with_redis(url: impl Into<String>) -> Self {
        Self {
            enabled: true,
            redis_url: url.into(),
            ..Default::default()
        }
    }

    /// Use a non-default pub/sub channel
    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = channel.into();
        self
    }
}
