//! Authentication backend abstraction.
//!
//! A backend verifies one `(realm, account, password)` triple against one
//! external system. Credential rejections are ordinary [`AuthResult`]
//! values; only infrastructure failures (source unreachable, malformed
//! response) surface as [`BackendError`]. Backends must tolerate
//! concurrent `authenticate` calls, and `close` must wait for in-flight
//! calls to return before releasing shared resources — [`CallTracker`]
//! does the bookkeeping.

pub mod memory;
pub mod registry;
pub mod static_config;

#[cfg(test)]
mod tests;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Notify;
use tracing::warn;

use ag_shared::utils::args::{ArgMap, RESERVED_KEYS};

use crate::domain::entities::AuthResult;
use crate::engine::EngineCounters;
use crate::errors::{BackendResult, EngineResult};

// Re-export commonly used types
pub use memory::MemoryBackend;
pub use registry::BackendRegistry;
pub use static_config::ConfigBackend;

/// Everything a backend receives at open: its argument map (with the
/// engine-reserved keys still present — backends ignore them), the
/// optional query/template string from the realm mapping, and the shared
/// counter block.
#[derive(Clone)]
pub struct BackendContext {
    pub args: ArgMap,
    pub query: Option<String>,
    pub counters: Arc<EngineCounters>,
}

impl BackendContext {
    pub fn new(args: ArgMap, query: Option<String>, counters: Arc<EngineCounters>) -> Self {
        Self {
            args,
            query,
            counters,
        }
    }

    /// Context with empty arguments, for tests and trivial backends
    pub fn empty() -> Self {
        Self {
            args: ArgMap::new(),
            query: None,
            counters: Arc::new(EngineCounters::default()),
        }
    }
}

/// Log argument keys a backend does not recognize.
///
/// The engine-reserved lockout and cache keys are consumed by the realm
/// mapping layer and show up in every mapping's argument string; backends
/// must skip them rather than reject them, so they are never reported.
pub fn log_unrecognized_args(backend: &str, args: &ArgMap, recognized: &[&str]) {
    for (key, _) in args.iter() {
        let known = recognized
            .iter()
            .chain(RESERVED_KEYS.iter())
            .any(|k| k.eq_ignore_ascii_case(key));
        if !known {
            warn!(backend, argument = key, "unrecognized backend argument ignored");
        }
    }
}

/// A pluggable credential verifier bound to one realm mapping.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Short type name for logs and diagnostics
    fn name(&self) -> &str;

    /// Parse arguments and acquire source-specific resources.
    /// Fails if the backend is already open.
    async fn open(&self, ctx: BackendContext) -> EngineResult<()>;

    /// Verify one credential triple. Never fails for a rejected
    /// credential — that is a non-authenticated [`AuthResult`].
    async fn authenticate(
        &self,
        realm: &str,
        account: &str,
        password: &str,
    ) -> BackendResult<AuthResult>;

    /// Release resources after every in-flight `authenticate` returned
    async fn close(&self);
}

/// In-flight call counter allowing `close` to await quiescence.
#[derive(Debug, Default)]
pub struct CallTracker {
    active: AtomicUsize,
    notify: Notify,
}

impl CallTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a call as started; the returned guard ends it on drop
    pub fn begin(&self) -> CallGuard<'_> {
        self.active.fetch_add(1, Ordering::SeqCst);
        CallGuard { tracker: self }
    }

    pub fn active_calls(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Wait until no call is in flight
    pub async fn quiesce(&self) {
        loop {
            let notified = self.notify.notified();
            if self.active.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// RAII guard for one in-flight backend call
pub struct CallGuard<'a> {
    tracker: &'a CallTracker,
}

impl Drop for CallGuard<'_> {
    fn drop(&mut self) {
        if self.tracker.active.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.tracker.notify.notify_waiters();
        }
    }
}
