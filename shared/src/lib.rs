//! Shared utilities and configuration types for the AuthGrid server
//!
//! This crate provides common functionality used across all server modules:
//! - Configuration types for the engine, cluster transport, and databases
//! - Backend argument-string parsing with environment-macro expansion
//! - Duration parsing helpers

pub mod config;
pub mod utils;

// Re-export commonly used items at crate root
pub use config::{ClusterSettings, DatabaseSettings, EngineSettings};
pub use utils::args::{expand_env_macros, parse_duration, ArgMap, ArgParseError, RESERVED_KEYS};
