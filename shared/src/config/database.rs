//! Database connection configuration for SQL-backed components

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::duration_secs;

/// Connection pool settings for the SQL authentication backend and the SQL
/// realm map provider.
///
/// The SQL backend builds one of these from its mapping arguments
/// (`Url`, `MaxConnections`, `MinConnections`, `ConnectTimeout`,
/// `IdleTimeout`); the realm map provider takes the url from its source
/// descriptor and the tuning from service configuration when present.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseSettings {
    /// Database connection URL
    pub url: String,

    /// Maximum connections in the pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum idle connections kept alive
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Timeout for acquiring a connection from the pool
    #[serde(with = "duration_secs", default = "default_connect_timeout")]
    pub connect_timeout: Duration,

    /// How long an idle connection may linger before being closed
    #[serde(with = "duration_secs", default = "default_idle_timeout")]
    pub idle_timeout: Duration,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_idle_timeout() -> Duration {
    Duration::from_secs(600)
}

impl DatabaseSettings {
    /// Create settings for the given connection URL with pool defaults
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout: default_connect_timeout(),
            idle_timeout: default_idle_timeout(),
        }
    }

    /// Replace the connection URL, keeping the pool tuning
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Set the maximum pool size
    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the minimum idle connection count
    pub fn with_min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Set the connection acquire timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the idle connection timeout
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }
}
