//! Service configuration.
//!
//! Layered loading: `authgrid.toml` (optional, path overridable through
//! `AUTHGRID_CONFIG`) first, then `AUTHGRID__`-prefixed environment
//! variables (`AUTHGRID__SERVER__PORT=9000`,
//! `AUTHGRID__ENGINE__CACHE_TTL=300`, ...).

use serde::{Deserialize, Serialize};

use ag_shared::config::{ClusterSettings, DatabaseSettings, EngineSettings};

/// HTTP listener settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    String::from("127.0.0.1")
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerSettings {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Where the realm map comes from
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RealmMapSource {
    /// `realm$$type$$args$$query` lines in a file
    File { path: String },
    /// `connectionUrl$$query` descriptor for a SQL source
    Sql { descriptor: String },
    /// Entries inline in the configuration
    Static { entries: Vec<String> },
}

impl Default for RealmMapSource {
    fn default() -> Self {
        Self::File {
            path: String::from("authgrid.map"),
        }
    }
}

/// Complete service configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub engine: EngineSettings,

    #[serde(default)]
    pub cluster: ClusterSettings,

    #[serde(default)]
    pub realm_map: RealmMapSource,

    /// Pool tuning for the SQL realm map provider. The connection url in
    /// the provider's descriptor wins over the one configured here.
    #[serde(default)]
    pub database: Option<DatabaseSettings>,
}

impl ApiConfig {
    /// Load configuration from the optional TOML file plus environment
    /// overrides
    pub fn load() -> anyhow::Result<Self> {
        let config_path =
            std::env::var("AUTHGRID_CONFIG").unwrap_or_else(|_| String::from("authgrid"));
        let settings = config::Config::builder()
            .add_source(config::File::with_name(&config_path).required(false))
            .add_source(
                config::Environment::with_prefix("AUTHGRID")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn defaults_are_sane() {
        let config = ApiConfig::default();
        assert_eq!(config.server.bind_address(), "127.0.0.1:8080");
        assert!(!config.cluster.enabled);
        assert_eq!(config.engine.cache_ttl, Duration::from_secs(600));
        assert!(matches!(config.realm_map, RealmMapSource::File { .. }));
        assert!(config.database.is_none());
    }

    #[test]
    fn database_pool_tuning_deserializes() {
        let config: ApiConfig = serde_json::from_str(
            r#"{"database": {"url": "mysql://auth@dbhost/auth", "max_connections": 25}}"#,
        )
        .unwrap();
        let database = config.database.unwrap();
        assert_eq!(database.url, "mysql://auth@dbhost/auth");
        assert_eq!(database.max_connections, 25);
        // unspecified tuning falls back to defaults
        assert_eq!(database.min_connections, 1);
        assert_eq!(database.connect_timeout, Duration::from_secs(10));
    }

    #[test]
    fn realm_map_source_deserializes_by_kind() {
        let source: RealmMapSource = serde_json::from_str(
            r#"{"kind": "static", "entries": ["test.com$$config$$$$test.com;jeff;foobar"]}"#,
        )
        .unwrap();
        match source {
            RealmMapSource::Static { entries } => assert_eq!(entries.len(), 1),
            other => panic!("unexpected source {:?}", other),
        }

        let source: RealmMapSource =
            serde_json::from_str(r#"{"kind": "file", "path": "/etc/authgrid.map"}"#).unwrap();
        assert!(matches!(source, RealmMapSource::File { .. }));
    }
}
