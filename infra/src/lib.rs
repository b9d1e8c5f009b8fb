//! # Infrastructure Layer
//!
//! Concrete implementations of the engine's pluggable seams that touch
//! external systems:
//!
//! - **Backends**: flat file, LDAP bind, RADIUS client, SQL query
//! - **Realm map providers**: file and SQL variants
//! - **Cluster transport**: Redis pub/sub peer synchronization

pub mod backends;
pub mod database;
pub mod realm_map;
pub mod sync;

// Re-export commonly used items at crate root
pub use backends::{
    register_builtin_backends, FileAuthBackend, LdapAuthBackend, RadiusAuthBackend, SqlAuthBackend,
};
pub use realm_map::{FileRealmMapProvider, SqlRealmMapProvider};
pub use sync::RedisPeerTransport;
