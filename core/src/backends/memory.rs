//! In-memory backend with a mutable account table.
//!
//! Primarily a test double for the engine and the sync adapter, but also
//! a real variant (`memory` type ref) for ephemeral deployments. The
//! account table can be changed while open, calls are counted, and
//! per-account infrastructure failures can be injected.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::backends::{
    log_unrecognized_args, static_config::parse_account_records, AuthBackend, BackendContext,
    CallTracker,
};
use crate::domain::entities::{AuthResult, AuthStatus};
use crate::errors::{BackendError, BackendResult, EngineError, EngineResult};

/// Mutable in-process account store
pub struct MemoryBackend {
    accounts: RwLock<HashMap<(String, String), String>>,
    failing: RwLock<HashSet<(String, String)>>,
    opened: AtomicBool,
    call_count: AtomicUsize,
    tracker: CallTracker,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
            failing: RwLock::new(HashSet::new()),
            opened: AtomicBool::new(false),
            call_count: AtomicUsize::new(0),
            tracker: CallTracker::new(),
        }
    }

    /// Add or replace an account
    pub async fn add_account(&self, realm: &str, account: &str, password: &str) {
        self.accounts.write().await.insert(
            (realm.to_lowercase(), account.to_lowercase()),
            password.to_string(),
        );
    }

    /// Remove an account; subsequent authentications return `BadAccount`
    pub async fn remove_account(&self, realm: &str, account: &str) {
        self.accounts
            .write()
            .await
            .remove(&(realm.to_lowercase(), account.to_lowercase()));
    }

    /// Make authentications for this account fail as if the source were
    /// unreachable, until [`clear_failures`](Self::clear_failures)
    pub async fn set_failing(&self, realm: &str, account: &str) {
        self.failing
            .write()
            .await
            .insert((realm.to_lowercase(), account.to_lowercase()));
    }

    pub async fn clear_failures(&self) {
        self.failing.write().await.clear();
    }

    /// How many `authenticate` calls reached this backend
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuthBackend for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    async fn open(&self, ctx: BackendContext) -> EngineResult<()> {
        log_unrecognized_args(self.name(), &ctx.args, &[]);
        if self.opened.swap(true, Ordering::SeqCst) {
            return Err(EngineError::invariant("memory backend is already open"));
        }
        // The query field may seed the account table, same record format
        // as the config backend
        if let Some(query) = ctx.query.as_deref() {
            let seeded = parse_account_records(query)?;
            self.accounts.write().await.extend(seeded);
        }
        Ok(())
    }

    async fn authenticate(
        &self,
        realm: &str,
        account: &str,
        password: &str,
    ) -> BackendResult<AuthResult> {
        let _guard = self.tracker.begin();
        self.call_count.fetch_add(1, Ordering::SeqCst);

        let key = (realm.to_lowercase(), account.to_lowercase());
        if self.failing.read().await.contains(&key) {
            return Err(BackendError::Unreachable {
                message: format!("injected failure for {}/{}", realm, account),
            });
        }

        let accounts = self.accounts.read().await;
        let result = match accounts.get(&key) {
            None => AuthResult::rejected(AuthStatus::BadAccount),
            Some(stored)
                if constant_time_eq::constant_time_eq(stored.as_bytes(), password.as_bytes()) =>
            {
                AuthResult::authenticated()
            }
            Some(_) => AuthResult::rejected(AuthStatus::BadPassword),
        };
        Ok(result)
    }

    async fn close(&self) {
        self.tracker.quiesce().await;
        self.opened.store(false, Ordering::SeqCst);
    }
}
