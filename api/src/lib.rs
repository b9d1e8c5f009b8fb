//! HTTP/JSON adapter for the AuthGrid engine.
//!
//! The wire surface is thin by design: every handler maps a request onto
//! one engine operation and translates the [`AuthResult`] or engine error
//! back into HTTP. The binary in `main.rs` wires configuration, backend
//! registry, realm map provider, engine, and (optionally) the Redis
//! cluster transport together.
//!
//! [`AuthResult`]: ag_core::domain::entities::AuthResult

pub mod app;
pub mod bootstrap;
pub mod config;
pub mod dto;
pub mod routes;

pub use app::AppState;
pub use config::ApiConfig;
