//! Realm map provider over a fixed list of entry lines.
//!
//! The config variant: entries come from the service configuration
//! instead of an external source. The entry list can be replaced at
//! runtime, which the next map reload will pick up.

use async_trait::async_trait;
use tokio::sync::RwLock;

use ag_shared::config::EngineSettings;

use crate::domain::entities::RealmMappingSpec;
use crate::errors::EngineResult;
use crate::realm_map::{parse_map_entries, RealmMapProvider};

/// Provider over in-memory `realm$$type$$args$$query` entry lines
pub struct StaticRealmMapProvider {
    entries: RwLock<Vec<String>>,
}

impl StaticRealmMapProvider {
    pub fn new(entries: Vec<String>) -> Self {
        Self {
            entries: RwLock::new(entries),
        }
    }

    pub fn from_lines(lines: &[&str]) -> Self {
        Self::new(lines.iter().map(|l| l.to_string()).collect())
    }

    /// Replace the entry list; takes effect on the next `get_map`
    pub async fn set_entries(&self, entries: Vec<String>) {
        *self.entries.write().await = entries;
    }
}

#[async_trait]
impl RealmMapProvider for StaticRealmMapProvider {
    fn name(&self) -> &str {
        "config"
    }

    async fn open(&self, _defaults: &EngineSettings) -> EngineResult<()> {
        // Validate eagerly so a bad entry fails the engine start rather
        // than the first reload
        let entries = self.entries.read().await;
        parse_map_entries(entries.iter().map(String::as_str))?;
        Ok(())
    }

    async fn get_map(&self) -> EngineResult<Vec<RealmMappingSpec>> {
        let entries = self.entries.read().await;
        parse_map_entries(entries.iter().map(String::as_str))
    }

    async fn close(&self) {}
}
