//! Authentication backends against external systems.

pub mod file;
pub mod ldap;
pub mod radius;
pub mod sql;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use ag_core::backends::BackendRegistry;

// Re-export commonly used types
pub use file::FileAuthBackend;
pub use ldap::LdapAuthBackend;
pub use radius::RadiusAuthBackend;
pub use sql::SqlAuthBackend;

/// Register the infrastructure backends (`file`, `ldap`, `radius`, `sql`)
/// on top of the registry's pure in-process variants.
pub fn register_builtin_backends(registry: &mut BackendRegistry) {
    registry.register("file", || Arc::new(FileAuthBackend::new()));
    registry.register("ldap", || Arc::new(LdapAuthBackend::new()));
    registry.register("radius", || Arc::new(RadiusAuthBackend::new()));
    registry.register("sql", || Arc::new(SqlAuthBackend::new()));
}
