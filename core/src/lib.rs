//! # AuthGrid Core
//!
//! The authentication engine at the center of the AuthGrid service.
//! This crate contains the domain entities, the TTL+LRU credential caches,
//! the backend and realm-map provider abstractions with their pure
//! in-memory variants, the request pipeline, and the cluster
//! synchronization adapter.

pub mod backends;
pub mod cache;
pub mod domain;
pub mod engine;
pub mod errors;
pub mod realm_map;
pub mod sync;

// Re-export specific types to avoid naming conflicts
// Domain exports
pub use domain::entities;
pub use domain::value_objects;

// Engine exports
pub use engine::{AuthEngine, CounterSnapshot, EngineCounters, EngineEvent};

// Backend exports
pub use backends::{AuthBackend, BackendContext, BackendRegistry};

// Realm map exports
pub use realm_map::{RealmMapProvider, StaticRealmMapProvider};

// Cluster sync exports
pub use sync::{ClusterSync, PeerTransport, SyncMessage, SyncPayload};

// Error exports
pub use errors::{BackendError, BackendResult, EngineError, EngineResult};
