//! Realm map providers.
//!
//! A provider produces, on demand, the current list of realm map entries
//! binding each realm to a backend type plus its arguments. The engine
//! re-queries the provider periodically and swaps the resulting map in
//! atomically.
//!
//! The file and config variants share one entry format:
//!
//! ```text
//! realm$$extensionTypeRef$$argString$$queryString
//! ```
//!
//! with a `$$` separator, `//` comments, and blank lines ignored. The
//! query field is optional. `$(NAME)` environment macros inside the
//! argument string are expanded at parse time.

pub mod static_provider;

#[cfg(test)]
mod tests;

use async_trait::async_trait;

use ag_shared::config::EngineSettings;
use ag_shared::utils::args::{expand_env_macros, ArgMap};

use crate::domain::entities::RealmMappingSpec;
use crate::errors::{EngineError, EngineResult};

// Re-export commonly used types
pub use static_provider::StaticRealmMapProvider;

/// Source of realm map snapshots
#[async_trait]
pub trait RealmMapProvider: Send + Sync {
    /// Short type name for logs and diagnostics
    fn name(&self) -> &str;

    /// Parse the source descriptor and acquire resources.
    /// Engine defaults are available for validation.
    async fn open(&self, defaults: &EngineSettings) -> EngineResult<()>;

    /// Produce the current snapshot. Duplicate realms within one snapshot
    /// are a hard error for the file and config variants.
    async fn get_map(&self) -> EngineResult<Vec<RealmMappingSpec>>;

    /// Release resources
    async fn close(&self);
}

// A provider handed to the engine by `Arc` keeps working for callers that
// retain a handle, e.g. to swap the entry list at runtime.
#[async_trait]
impl<P: RealmMapProvider + ?Sized> RealmMapProvider for std::sync::Arc<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn open(&self, defaults: &EngineSettings) -> EngineResult<()> {
        (**self).open(defaults).await
    }

    async fn get_map(&self) -> EngineResult<Vec<RealmMappingSpec>> {
        (**self).get_map().await
    }

    async fn close(&self) {
        (**self).close().await
    }
}

/// Parse one realm map line. Returns `None` for blank lines and comments.
pub fn parse_map_line(line: &str) -> EngineResult<Option<RealmMappingSpec>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with("//") {
        return Ok(None);
    }

    let fields: Vec<&str> = line.split("$$").map(str::trim).collect();
    if fields.len() < 2 || fields.len() > 4 {
        return Err(EngineError::configuration(format!(
            "malformed realm map entry '{}' (expected realm$$type$$args$$query)",
            line
        )));
    }

    let realm = fields[0];
    let extension_type = fields[1];
    if realm.is_empty() || extension_type.is_empty() {
        return Err(EngineError::configuration(format!(
            "realm map entry '{}' has an empty realm or type reference",
            line
        )));
    }

    let args = match fields.get(2) {
        Some(raw) if !raw.is_empty() => ArgMap::parse(&expand_env_macros(raw))?,
        _ => ArgMap::new(),
    };
    let query = fields
        .get(3)
        .filter(|q| !q.is_empty())
        .map(|q| q.to_string());

    let mut spec = RealmMappingSpec::new(realm, extension_type).with_args(args);
    if let Some(query) = query {
        spec = spec.with_query(query);
    }
    Ok(Some(spec))
}

/// Parse a whole realm map source, rejecting duplicate realms
pub fn parse_map_entries<'a>(
    lines: impl IntoIterator<Item = &'a str>,
) -> EngineResult<Vec<RealmMappingSpec>> {
    let mut specs: Vec<RealmMappingSpec> = Vec::new();
    for line in lines {
        if let Some(spec) = parse_map_line(line)? {
            if specs.iter().any(|s| s.realm_key() == spec.realm_key()) {
                return Err(EngineError::configuration(format!(
                    "duplicate realm '{}' in realm map",
                    spec.realm
                )));
            }
            specs.push(spec);
        }
    }
    Ok(specs)
}
