//! Shared MySQL pool construction for the SQL-backed components.

use sqlx::mysql::{MySqlPool, MySqlPoolOptions};

use ag_core::errors::{EngineError, EngineResult};
use ag_shared::config::DatabaseSettings;

/// Build a lazy pool from shared settings. Connections are established on
/// first use, so a briefly unreachable database does not fail the owning
/// component's open.
pub fn connect_lazy_pool(settings: &DatabaseSettings) -> EngineResult<MySqlPool> {
    MySqlPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(settings.connect_timeout)
        .idle_timeout(settings.idle_timeout)
        .connect_lazy(&settings.url)
        .map_err(|err| EngineError::configuration(format!("invalid database url: {}", err)))
}
