//! Flat-file authentication backend.
//!
//! Verifies credentials against a text file of `realm;account;password`
//! records (one per line, `//` comments ignored). Arguments:
//!
//! - `Path` (required) — the credential file
//! - `Reload` (default `false`) — re-read the file on every query, so
//!   edits take effect without a map reload
//!
//! Returns `Authenticated` or `AccessDenied` only.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use ag_core::backends::{
    log_unrecognized_args, static_config::parse_account_records, AuthBackend, BackendContext,
    CallTracker,
};
use ag_core::domain::entities::{AuthResult, AuthStatus};
use ag_core::errors::{BackendError, BackendResult, EngineError, EngineResult};

struct FileState {
    path: PathBuf,
    reload_on_query: bool,
    accounts: HashMap<(String, String), String>,
}

/// Credential verification against a flat file
pub struct FileAuthBackend {
    state: RwLock<Option<FileState>>,
    tracker: CallTracker,
}

impl FileAuthBackend {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(None),
            tracker: CallTracker::new(),
        }
    }

    async fn read_accounts(path: &PathBuf) -> Result<HashMap<(String, String), String>, String> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|err| format!("cannot read credential file {}: {}", path.display(), err))?;
        parse_account_records(&text).map_err(|err| err.to_string())
    }
}

impl Default for FileAuthBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuthBackend for FileAuthBackend {
    fn name(&self) -> &str {
        "file"
    }

    async fn open(&self, ctx: BackendContext) -> EngineResult<()> {
        log_unrecognized_args(self.name(), &ctx.args, &["Path", "Reload"]);
        let path = ctx
            .args
            .get("Path")
            .ok_or_else(|| EngineError::configuration("file backend requires a Path argument"))?;
        let path = PathBuf::from(path);
        let reload_on_query = ctx
            .args
            .get_bool("Reload")
            .map_err(EngineError::from)?
            .unwrap_or(false);

        let accounts = Self::read_accounts(&path)
            .await
            .map_err(EngineError::configuration)?;
        debug!(path = %path.display(), accounts = accounts.len(), "credential file loaded");

        let mut state = self.state.write().await;
        if state.is_some() {
            return Err(EngineError::invariant("file backend is already open"));
        }
        *state = Some(FileState {
            path,
            reload_on_query,
            accounts,
        });
        Ok(())
    }

    async fn authenticate(
        &self,
        realm: &str,
        account: &str,
        password: &str,
    ) -> BackendResult<AuthResult> {
        let _guard = self.tracker.begin();

        // re-read under the write lock when reloading is on, so one query
        // refreshes the table for all
        let reload_path = {
            let state = self.state.read().await;
            match state.as_ref() {
                Some(state) if state.reload_on_query => Some(state.path.clone()),
                Some(_) => None,
                None => {
                    return Err(BackendError::Configuration {
                        message: "file backend is not open".to_string(),
                    })
                }
            }
        };
        if let Some(path) = reload_path {
            let accounts =
                Self::read_accounts(&path)
                    .await
                    .map_err(|message| BackendError::Unreachable { message })?;
            if let Some(state) = self.state.write().await.as_mut() {
                state.accounts = accounts;
            }
        }

        let state = self.state.read().await;
        let state = state.as_ref().ok_or(BackendError::Configuration {
            message: "file backend is not open".to_string(),
        })?;
        let key = (realm.to_lowercase(), account.to_lowercase());
        let authenticated = match state.accounts.get(&key) {
            Some(stored) => {
                constant_time_eq::constant_time_eq(stored.as_bytes(), password.as_bytes())
            }
            None => false,
        };

        if authenticated {
            Ok(AuthResult::authenticated())
        } else {
            Ok(AuthResult::rejected(AuthStatus::AccessDenied))
        }
    }

    async fn close(&self) {
        self.tracker.quiesce().await;
        *self.state.write().await = None;
    }
}
