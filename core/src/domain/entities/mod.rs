//! Domain entities representing authentication outcomes, realm routing,
//! and per-account lockout state.

pub mod auth_result;
pub mod lockout_state;
pub mod realm_mapping;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use auth_result::{AuthResult, AuthStatus, CachedCredential, DEFAULT_MAX_CACHE_TIME};
pub use lockout_state::LockoutState;
pub use realm_mapping::{LockoutPolicy, RealmMapping, RealmMappingSpec};
