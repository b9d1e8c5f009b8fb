//! Backend verifying against account records carried in the realm map.
//!
//! The mapping's query string holds the records, one per line or comma:
//! `realm;account;password`. `//` comments and blank segments are
//! ignored. Useful for small fixed account sets and for bootstrapping.
//! Returns `Authenticated` or `AccessDenied` only, so callers cannot
//! probe which half of the credential was wrong.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::backends::{log_unrecognized_args, AuthBackend, BackendContext, CallTracker};
use crate::domain::entities::{AuthResult, AuthStatus};
use crate::errors::{BackendError, BackendResult, EngineError, EngineResult};

/// Parse `realm;account;password` records separated by newlines or commas.
/// Exposed for the file backend, which reads the same record format.
pub fn parse_account_records(text: &str) -> EngineResult<HashMap<(String, String), String>> {
    let mut accounts = HashMap::new();
    for record in text.split(|c| c == '\n' || c == ',') {
        let record = record.trim();
        if record.is_empty() || record.starts_with("//") {
            continue;
        }
        let mut fields = record.split(';');
        let (realm, account, password) = match (fields.next(), fields.next(), fields.next()) {
            (Some(realm), Some(account), Some(password)) if fields.next().is_none() => {
                (realm.trim(), account.trim(), password.trim())
            }
            _ => {
                return Err(EngineError::configuration(format!(
                    "malformed account record '{}' (expected realm;account;password)",
                    record
                )))
            }
        };
        if realm.is_empty() || account.is_empty() {
            return Err(EngineError::configuration(format!(
                "account record '{}' has an empty realm or account",
                record
            )));
        }
        accounts.insert(
            (realm.to_lowercase(), account.to_lowercase()),
            password.to_string(),
        );
    }
    Ok(accounts)
}

/// Account lookup against records from the realm map entry itself
pub struct ConfigBackend {
    accounts: RwLock<Option<HashMap<(String, String), String>>>,
    tracker: CallTracker,
}

impl ConfigBackend {
    pub fn new() -> Self {
        Self {
            accounts: RwLock::new(None),
            tracker: CallTracker::new(),
        }
    }
}

impl Default for ConfigBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuthBackend for ConfigBackend {
    fn name(&self) -> &str {
        "config"
    }

    async fn open(&self, ctx: BackendContext) -> EngineResult<()> {
        log_unrecognized_args(self.name(), &ctx.args, &[]);
        let query = ctx.query.as_deref().ok_or_else(|| {
            EngineError::configuration("config backend requires account records in the query field")
        })?;
        let parsed = parse_account_records(query)?;

        let mut accounts = self.accounts.write().await;
        if accounts.is_some() {
            return Err(EngineError::invariant("config backend is already open"));
        }
        *accounts = Some(parsed);
        Ok(())
    }

    async fn authenticate(
        &self,
        realm: &str,
        account: &str,
        password: &str,
    ) -> BackendResult<AuthResult> {
        let _guard = self.tracker.begin();
        let accounts = self.accounts.read().await;
        let accounts = accounts.as_ref().ok_or(BackendError::Configuration {
            message: "config backend is not open".to_string(),
        })?;

        let key = (realm.to_lowercase(), account.to_lowercase());
        let authenticated = match accounts.get(&key) {
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
        *self.accounts.write().await = None;
    }
}
