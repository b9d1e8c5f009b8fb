//! Authentication outcome values returned by backends and by the engine.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default cache lifetime a backend suggests for an accepted credential
/// when its source supplies no better figure (5 minutes). The realm
/// mapping's `MaxCacheTime` argument and the engine's positive-cache TTL
/// both cap it.
pub const DEFAULT_MAX_CACHE_TIME: Duration = Duration::from_secs(300);

/// Disposition of a single authentication request.
///
/// Backends that do not wish to leak whether the account or the password
/// was wrong may collapse the fine-grained rejections to `AccessDenied`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthStatus {
    /// Credentials accepted
    Authenticated,
    /// Account exists but the password is wrong
    BadPassword,
    /// No such account in the realm
    BadAccount,
    /// No such realm in the active map
    BadRealm,
    /// Rejected without further detail
    AccessDenied,
    /// Account exists but is administratively disabled
    AccountDisabled,
    /// Account is locked out after repeated failures
    AccountLocked,
    /// The request itself was malformed
    BadRequest,
    /// The authentication source reported an internal fault
    ServerError,
}

impl AuthStatus {
    /// Numeric code used by SQL backends: the scalar query result maps
    /// directly onto these values.
    pub fn code(self) -> u8 {
        match self {
            AuthStatus::Authenticated => 0,
            AuthStatus::AccessDenied => 1,
            AuthStatus::BadRealm => 2,
            AuthStatus::BadAccount => 3,
            AuthStatus::BadPassword => 4,
            AuthStatus::AccountDisabled => 5,
            AuthStatus::AccountLocked => 6,
            AuthStatus::BadRequest => 7,
            AuthStatus::ServerError => 8,
        }
    }

    /// Inverse of [`AuthStatus::code`]; `None` for out-of-range codes.
    pub fn from_code(code: i64) -> Option<Self> {
        let status = match code {
            0 => AuthStatus::Authenticated,
            1 => AuthStatus::AccessDenied,
            2 => AuthStatus::BadRealm,
            3 => AuthStatus::BadAccount,
            4 => AuthStatus::BadPassword,
            5 => AuthStatus::AccountDisabled,
            6 => AuthStatus::AccountLocked,
            7 => AuthStatus::BadRequest,
            8 => AuthStatus::ServerError,
            _ => return None,
        };
        Some(status)
    }

    pub fn is_authenticated(self) -> bool {
        self == AuthStatus::Authenticated
    }
}

impl std::fmt::Display for AuthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AuthStatus::Authenticated => "authenticated",
            AuthStatus::BadPassword => "bad-password",
            AuthStatus::BadAccount => "bad-account",
            AuthStatus::BadRealm => "bad-realm",
            AuthStatus::AccessDenied => "access-denied",
            AuthStatus::AccountDisabled => "account-disabled",
            AuthStatus::AccountLocked => "account-locked",
            AuthStatus::BadRequest => "bad-request",
            AuthStatus::ServerError => "server-error",
        };
        f.write_str(name)
    }
}

/// Result of an authentication request.
///
/// `max_cache_time` is the period for which the outcome may be cached.
/// Backends fill in a suggestion; the engine clamps it against the realm
/// mapping's ceiling and its own cache TTL before handing it to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResult {
    /// Outcome of the request
    pub status: AuthStatus,

    /// Optional human-readable detail
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// How long this outcome may be cached
    pub max_cache_time: Duration,
}

impl AuthResult {
    /// Create a result with the given status and cache lifetime
    pub fn new(status: AuthStatus, max_cache_time: Duration) -> Self {
        Self {
            status,
            message: None,
            max_cache_time,
        }
    }

    /// An accepted credential with the default backend cache suggestion
    pub fn authenticated() -> Self {
        Self::new(AuthStatus::Authenticated, DEFAULT_MAX_CACHE_TIME)
    }

    /// A rejection with the default backend cache suggestion
    pub fn rejected(status: AuthStatus) -> Self {
        Self::new(status, DEFAULT_MAX_CACHE_TIME)
    }

    /// Attach a human-readable message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn is_authenticated(&self) -> bool {
        self.status.is_authenticated()
    }
}

/// Entry stored in the positive cache: the accepted password plus the
/// clamped lifetime it was admitted with. The password is compared on
/// lookup so a wrong-password submission for a cached account still fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedCredential {
    pub password: String,
    pub max_cache_time: Duration,
}

impl CachedCredential {
    pub fn new(password: impl Into<String>, max_cache_time: Duration) -> Self {
        Self {
            password: password.into(),
            max_cache_time,
        }
    }

    /// Constant-time comparison against a submitted password
    pub fn password_matches(&self, candidate: &str) -> bool {
        constant_time_eq::constant_time_eq(self.password.as_bytes(), candidate.as_bytes())
    }
}
