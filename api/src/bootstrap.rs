//! Assembly of the engine and its collaborators from configuration

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use ag_core::backends::BackendRegistry;
use ag_core::engine::AuthEngine;
use ag_core::realm_map::{RealmMapProvider, StaticRealmMapProvider};
use ag_core::sync::ClusterSync;
use ag_infra::realm_map::{FileRealmMapProvider, SqlRealmMapProvider};
use ag_infra::sync::RedisPeerTransport;

use crate::config::{ApiConfig, RealmMapSource};

/// Registry with every built-in backend type: the pure in-process
/// variants plus the infrastructure ones.
pub fn build_registry() -> BackendRegistry {
    let mut registry = BackendRegistry::with_builtins();
    ag_infra::backends::register_builtin_backends(&mut registry);
    registry
}

fn build_provider(config: &ApiConfig) -> Box<dyn RealmMapProvider> {
    match &config.realm_map {
        RealmMapSource::File { path } => Box::new(FileRealmMapProvider::new(path)),
        RealmMapSource::Sql { descriptor } => {
            let mut provider = SqlRealmMapProvider::new(descriptor);
            if let Some(database) = &config.database {
                provider = provider.with_database(database.clone());
            }
            Box::new(provider)
        }
        RealmMapSource::Static { entries } => {
            Box::new(StaticRealmMapProvider::new(entries.clone()))
        }
    }
}

/// Build and start the engine, then attach cluster sync when enabled.
pub async fn start_engine(
    config: &ApiConfig,
) -> anyhow::Result<(Arc<AuthEngine>, Option<Arc<ClusterSync>>)> {
    let registry = Arc::new(build_registry());
    let engine = Arc::new(AuthEngine::new(config.engine.clone(), registry));

    let provider = build_provider(config);
    engine
        .start(provider)
        .await
        .context("engine start failed")?;

    let sync = if config.cluster.enabled {
        let transport =
            RedisPeerTransport::new(&config.cluster).context("cluster transport setup failed")?;
        let sync = ClusterSync::start(Arc::clone(&engine), Arc::new(transport))
            .await
            .context("cluster sync start failed")?;
        info!(channel = %config.cluster.channel, "cluster synchronization enabled");
        Some(sync)
    } else {
        None
    };

    Ok((engine, sync))
}
