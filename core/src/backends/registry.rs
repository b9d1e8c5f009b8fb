//! Backend type registry.
//!
//! Realm map entries name their backend by a type reference string. The
//! registry maps those references to factories; the engine asks it for a
//! fresh backend instance whenever it adopts a realm map. The pure
//! in-process variants register here; infrastructure backends (file,
//! LDAP, RADIUS, SQL) are added by the hosting crate.

use std::collections::HashMap;
use std::sync::Arc;

use crate::backends::{AuthBackend, ConfigBackend, MemoryBackend};
use crate::errors::{EngineError, EngineResult};

type FactoryFn = Arc<dyn Fn() -> Arc<dyn AuthBackend> + Send + Sync>;

/// Maps backend type references to instance factories
pub struct BackendRegistry {
    factories: HashMap<String, FactoryFn>,
}

impl BackendRegistry {
    /// An empty registry with no types registered
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// A registry with the pure in-process variants (`config`, `memory`)
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("config", || Arc::new(ConfigBackend::new()));
        registry.register("memory", || Arc::new(MemoryBackend::new()));
        registry
    }

    /// Register a factory under a type reference (case-insensitive).
    /// A repeated registration replaces the previous factory, which lets
    /// deployments override a built-in with a custom variant.
    pub fn register(
        &mut self,
        type_ref: impl Into<String>,
        factory: impl Fn() -> Arc<dyn AuthBackend> + Send + Sync + 'static,
    ) {
        self.factories
            .insert(type_ref.into().to_lowercase(), Arc::new(factory));
    }

    /// Instantiate a backend for the given type reference
    pub fn create(&self, type_ref: &str) -> EngineResult<Arc<dyn AuthBackend>> {
        match self.factories.get(&type_ref.to_lowercase()) {
            Some(factory) => Ok(factory()),
            None => Err(EngineError::configuration(format!(
                "unknown backend type reference '{}'",
                type_ref
            ))),
        }
    }

    pub fn contains(&self, type_ref: &str) -> bool {
        self.factories.contains_key(&type_ref.to_lowercase())
    }

    /// Registered type references, sorted
    pub fn known_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.factories.keys().cloned().collect();
        types.sort();
        types
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
