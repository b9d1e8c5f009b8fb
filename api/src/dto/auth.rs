//! Authentication and cache-control DTOs

use serde::{Deserialize, Serialize};
use validator::Validate;

use ag_core::domain::entities::{AuthResult, AuthStatus};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AuthRequest {
    /// Authentication realm, e.g. a domain name
    #[validate(length(min = 1, max = 255))]
    pub realm: String,

    /// Account name within the realm
    #[validate(length(min = 1, max = 255))]
    pub account: String,

    /// Password, forwarded verbatim to the realm's backend
    #[validate(length(max = 4096))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponseBody {
    /// Outcome, e.g. `authenticated` or `account-locked`
    pub status: String,

    /// Whether the credential was accepted
    pub authenticated: bool,

    /// Optional human-readable detail
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Seconds the caller may cache this outcome
    pub cache_ttl_secs: u64,
}

impl From<AuthResult> for AuthResponseBody {
    fn from(result: AuthResult) -> Self {
        Self {
            status: result.status.to_string(),
            authenticated: result.status == AuthStatus::Authenticated,
            message: result.message,
            cache_ttl_secs: result.max_cache_time.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CacheFlushRequest {
    #[validate(length(min = 1, max = 255))]
    pub realm: String,

    /// Flush one account, or the whole realm when omitted
    pub account: Option<String>,

    /// Flush the negative (lockout) cache instead of the positive one
    #[serde(default)]
    pub nak: bool,

    /// Forward the directive to the rest of the cluster
    #[serde(default)]
    pub broadcast: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheClearRequest {
    /// Clear the negative (lockout) cache instead of the positive one
    #[serde(default)]
    pub nak: bool,

    /// Forward the directive to the rest of the cluster
    #[serde(default)]
    pub broadcast: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LockRequest {
    #[validate(length(min = 1, max = 255))]
    pub realm: String,

    #[validate(length(min = 1, max = 255))]
    pub account: String,

    /// Lock duration in seconds
    #[validate(range(min = 1, max = 86400))]
    pub ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
