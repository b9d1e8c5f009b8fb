//! Realm-to-backend routing records.

use std::sync::Arc;
use std::time::Duration;

use ag_shared::config::EngineSettings;
use ag_shared::utils::args::ArgMap;

use crate::backends::AuthBackend;
use crate::domain::entities::auth_result::DEFAULT_MAX_CACHE_TIME;
use crate::errors::EngineResult;

/// Lockout policy in force for one realm: engine defaults overridden by the
/// mapping's `LockoutCount` / `LockoutThreshold` / `LockoutTime` arguments.
///
/// A snapshot of this policy is captured into every
/// [`LockoutState`](super::LockoutState) so a mid-flight map reload cannot
/// change the rules for an account that is already accumulating failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutPolicy {
    /// Maximum consecutive failures before the account locks
    pub count: u32,
    /// Sliding window within which failures accumulate; zero disables lockout
    pub threshold: Duration,
    /// How long a locked account stays locked
    pub time: Duration,
}

impl LockoutPolicy {
    /// Resolve the effective policy for a mapping: per-realm argument
    /// overrides on top of the engine defaults.
    pub fn resolve(defaults: &EngineSettings, args: &ArgMap) -> EngineResult<Self> {
        let count = args.get_u32("LockoutCount")?.unwrap_or(defaults.lockout_count);
        let threshold = args
            .get_duration("LockoutThreshold")?
            .unwrap_or(defaults.lockout_threshold);
        let time = args.get_duration("LockoutTime")?.unwrap_or(defaults.lockout_time);
        Ok(Self {
            count,
            threshold,
            time,
        })
    }

    /// Lockout is disabled entirely when the threshold window is zero
    pub fn enabled(&self) -> bool {
        !self.threshold.is_zero()
    }
}

/// One realm map entry as produced by a realm map provider, before the
/// engine opens the backend it names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealmMappingSpec {
    /// Realm this entry routes (original casing preserved for display)
    pub realm: String,
    /// Backend type reference (`config`, `file`, `ldap`, `radius`, `sql`,
    /// or a custom registration)
    pub extension_type: String,
    /// Opaque backend arguments
    pub args: ArgMap,
    /// Optional backend-specific query or template string
    pub query: Option<String>,
}

impl RealmMappingSpec {
    pub fn new(realm: impl Into<String>, extension_type: impl Into<String>) -> Self {
        Self {
            realm: realm.into(),
            extension_type: extension_type.into(),
            args: ArgMap::new(),
            query: None,
        }
    }

    pub fn with_args(mut self, args: ArgMap) -> Self {
        self.args = args;
        self
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Lowercased realm, the routing key
    pub fn realm_key(&self) -> String {
        self.realm.to_lowercase()
    }
}

/// A live realm map entry: the spec plus its opened backend and the
/// resolved policy snapshot. Immutable once constructed; the active map is
/// replaced wholesale when the provider is re-queried.
pub struct RealmMapping {
    /// Realm this mapping serves
    pub realm: String,
    /// Backend type reference the extension was created from
    pub extension_type: String,
    /// Effective lockout policy for the realm
    pub lockout: LockoutPolicy,
    /// Ceiling on the cache lifetime a backend may request for this realm
    pub max_cache_time: Duration,
    /// The opened backend bound to this mapping
    pub extension: Arc<dyn AuthBackend>,
}

impl RealmMapping {
    /// Bind an opened backend to a spec, resolving the policy snapshot and
    /// the `MaxCacheTime` ceiling from the mapping arguments.
    pub fn bind(
        spec: &RealmMappingSpec,
        defaults: &EngineSettings,
        extension: Arc<dyn AuthBackend>,
    ) -> EngineResult<Self> {
        let lockout = LockoutPolicy::resolve(defaults, &spec.args)?;
        let max_cache_time = spec
            .args
            .get_duration("MaxCacheTime")?
            .unwrap_or(DEFAULT_MAX_CACHE_TIME);
        Ok(Self {
            realm: spec.realm.clone(),
            extension_type: spec.extension_type.clone(),
            lockout,
            max_cache_time,
            extension,
        })
    }
}

impl std::fmt::Debug for RealmMapping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealmMapping")
            .field("realm", &self.realm)
            .field("extension_type", &self.extension_type)
            .field("lockout", &self.lockout)
            .field("max_cache_time", &self.max_cache_time)
            .finish()
    }
}
