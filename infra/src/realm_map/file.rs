//! Realm map provider reading `realm$$type$$args$$query` lines from a
//! file. The file is re-read on every `get_map`, so edits take effect at
//! the next scheduled reload. Duplicate realms are a hard error.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use ag_core::domain::entities::RealmMappingSpec;
use ag_core::errors::{EngineError, EngineResult};
use ag_core::realm_map::{parse_map_entries, RealmMapProvider};

use ag_shared::config::EngineSettings;

/// File-backed realm map source
pub struct FileRealmMapProvider {
    path: PathBuf,
}

impl FileRealmMapProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn read_entries(&self) -> EngineResult<Vec<RealmMappingSpec>> {
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|err| {
                EngineError::configuration(format!(
                    "cannot read realm map file {}: {}",
                    self.path.display(),
                    err
                ))
            })?;
        let specs = parse_map_entries(text.lines())?;
        debug!(path = %self.path.display(), realms = specs.len(), "realm map file parsed");
        Ok(specs)
    }
}

#[async_trait]
impl RealmMapProvider for FileRealmMapProvider {
    fn name(&self) -> &str {
        "file"
    }

    async fn open(&self, _defaults: &EngineSettings) -> EngineResult<()> {
        // Validate eagerly so a bad file fails the engine start rather
        // than the first reload
        self.read_entries().await?;
        Ok(())
    }

    async fn get_map(&self) -> EngineResult<Vec<RealmMappingSpec>> {
        self.read_entries().await
    }

    async fn close(&self) {}
}
