//! Realm map provider querying a SQL database.
//!
//! The source descriptor has the form `connectionUrl$$query`. The query
//! must return the columns `Realm`, `ProviderType`, `Args`, and `Query`;
//! each row becomes one realm map entry. `$(NAME)` environment macros in
//! the `Args` column are expanded. Duplicate realms are left for the
//! engine to skip at adoption time, matching the other non-file sources.

use async_trait::async_trait;
use sqlx::mysql::MySqlPool;
use sqlx::Row;
use tokio::sync::RwLock;
use tracing::debug;

use ag_core::domain::entities::RealmMappingSpec;
use ag_core::errors::{EngineError, EngineResult};
use ag_core::realm_map::RealmMapProvider;

use ag_shared::config::{DatabaseSettings, EngineSettings};
use ag_shared::utils::args::{expand_env_macros, ArgMap};

use crate::database::connect_lazy_pool;

/// SQL-backed realm map source
pub struct SqlRealmMapProvider {
    descriptor: String,
    pool_defaults: Option<DatabaseSettings>,
    state: RwLock<Option<SqlMapState>>,
}

struct SqlMapState {
    pool: MySqlPool,
    query: String,
}

impl SqlRealmMapProvider {
    /// Create a provider from a `connectionUrl$$query` descriptor
    pub fn new(descriptor: impl Into<String>) -> Self {
        Self {
            descriptor: descriptor.into(),
            pool_defaults: None,
            state: RwLock::new(None),
        }
    }

    /// Use pool tuning from service configuration. The descriptor's
    /// connection url still wins over the one carried by the settings.
    pub fn with_database(mut self, settings: DatabaseSettings) -> Self {
        self.pool_defaults = Some(settings);
        self
    }

    fn row_to_spec(row: &sqlx::mysql::MySqlRow) -> EngineResult<RealmMappingSpec> {
        let realm: String = row
            .try_get("Realm")
            .map_err(|err| EngineError::configuration(format!("realm map row: {}", err)))?;
        let provider_type: String = row
            .try_get("ProviderType")
            .map_err(|err| EngineError::configuration(format!("realm map row: {}", err)))?;
        let args: Option<String> = row
            .try_get("Args")
            .map_err(|err| EngineError::configuration(format!("realm map row: {}", err)))?;
        let query: Option<String> = row
            .try_get("Query")
            .map_err(|err| EngineError::configuration(format!("realm map row: {}", err)))?;

        let args = match args.as_deref() {
            Some(raw) if !raw.is_empty() => ArgMap::parse(&expand_env_macros(raw))?,
            _ => ArgMap::new(),
        };
        let mut spec = RealmMappingSpec::new(realm, provider_type).with_args(args);
        if let Some(query) = query.filter(|q| !q.is_empty()) {
            spec = spec.with_query(query);
        }
        Ok(spec)
    }
}

#[async_trait]
impl RealmMapProvider for SqlRealmMapProvider {
    fn name(&self) -> &str {
        "sql"
    }

    async fn open(&self, _defaults: &EngineSettings) -> EngineResult<()> {
        let (url, query) = self.descriptor.split_once("$$").ok_or_else(|| {
            EngineError::configuration(
                "sql realm map descriptor must have the form connectionUrl$$query",
            )
        })?;
        let url = url.trim();
        let query = query.trim();
        if url.is_empty() || query.is_empty() {
            return Err(EngineError::configuration(
                "sql realm map descriptor has an empty connection url or query",
            ));
        }

        let settings = match self.pool_defaults.clone() {
            Some(defaults) => defaults.with_url(url),
            None => DatabaseSettings::new(url),
        };
        let pool = connect_lazy_pool(&settings)?;

        let mut state = self.state.write().await;
        if state.is_some() {
            return Err(EngineError::invariant("sql realm map provider is already open"));
        }
        *state = Some(SqlMapState {
            pool,
            query: query.to_string(),
        });
        Ok(())
    }

    async fn get_map(&self) -> EngineResult<Vec<RealmMappingSpec>> {
        let (pool, query) = {
            let state = self.state.read().await;
            let state = state
                .as_ref()
                .ok_or_else(|| EngineError::invariant("sql realm map provider is not open"))?;
            (state.pool.clone(), state.query.clone())
        };

        let rows = sqlx::query(&query)
            .fetch_all(&pool)
            .await
            .map_err(|err| EngineError::Internal {
                message: format!("realm map query failed: {}", err),
            })?;

        let mut specs = Vec::with_capacity(rows.len());
        for row in &rows {
            specs.push(Self::row_to_spec(row)?);
        }
        debug!(realms = specs.len(), "realm map query completed");
        Ok(specs)
    }

    async fn close(&self) {
        let state = self.state.write().await.take();
        if let Some(state) = state {
            state.pool.close().await;
        }
    }
}
