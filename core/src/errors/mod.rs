//! Engine error taxonomy.
//!
//! Credential rejections are never errors: they travel as
//! [`AuthResult`](crate::domain::entities::AuthResult) values with a
//! non-authenticated status. The types here cover everything else —
//! unreachable sources, malformed responses, bad configuration, and
//! programmer mistakes such as calling into a stopped engine.

use std::time::Duration;
use thiserror::Error;

use ag_shared::utils::args::ArgParseError;

/// Infrastructure failures raised by authentication backends.
///
/// These propagate to the caller and are never written to the negative
/// cache, so a transient outage cannot poison cached rejections.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("authentication source unreachable: {message}")]
    Unreachable { message: String },

    #[error("malformed response from authentication source: {message}")]
    MalformedResponse { message: String },

    #[error("authentication source timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("backend configuration error: {message}")]
    Configuration { message: String },
}

/// Core engine errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// A backend could not reach its source or returned garbage
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Detected at open/start: duplicate realm, missing argument,
    /// unparseable extension type reference
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// Programmer error, e.g. a method called while the engine is stopped
    #[error("invalid engine state: {message}")]
    InvariantViolation { message: String },

    #[error("internal error: {message}")]
    Internal { message: String },
}

impl From<ArgParseError> for EngineError {
    fn from(err: ArgParseError) -> Self {
        EngineError::Configuration {
            message: err.to_string(),
        }
    }
}

impl EngineError {
    /// Shorthand for a configuration failure
    pub fn configuration(message: impl Into<String>) -> Self {
        EngineError::Configuration {
            message: message.into(),
        }
    }

    /// Shorthand for an invariant violation
    pub fn invariant(message: impl Into<String>) -> Self {
        EngineError::InvariantViolation {
            message: message.into(),
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
pub type BackendResult<T> = Result<T, BackendError>;
