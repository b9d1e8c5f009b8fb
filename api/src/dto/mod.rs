//! Request and response bodies for the HTTP surface

pub mod auth;

pub use auth::{
    AuthRequest, AuthResponseBody, CacheClearRequest, CacheFlushRequest, ErrorBody, LockRequest,
};
