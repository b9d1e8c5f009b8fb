//! LDAP bind authentication backend.
//!
//! Verifies a credential by performing a simple bind against the
//! configured directory servers. Arguments:
//!
//! - `Servers` (required) — comma-separated LDAP URLs or host names
//! - `BindFormat` (default `Email`) — how the bind name is derived:
//!   `Email` binds as `account@realm`, `Slash` as `realm\account`
//! - `Timeout` (default `10s`) — per-server connect+bind budget
//!
//! The directory's invalid-credentials indication (result code 49) maps
//! to `AccessDenied`; transport failures and unexpected result codes are
//! infrastructure errors and propagate.

use std::time::Duration;

use async_trait::async_trait;
use ldap3::LdapConnAsync;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use ag_core::backends::{log_unrecognized_args, AuthBackend, BackendContext, CallTracker};
use ag_core::domain::entities::{AuthResult, AuthStatus};
use ag_core::errors::{BackendError, BackendResult, EngineError, EngineResult};

const LDAP_RC_SUCCESS: u32 = 0;
const LDAP_RC_INVALID_CREDENTIALS: u32 = 49;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// How the bind name is derived from realm and account
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindFormat {
    /// `account@realm`
    Email,
    /// `realm\account`
    Slash,
}

impl BindFormat {
    fn parse(value: Option<&str>) -> EngineResult<Self> {
        match value {
            None => Ok(Self::Email),
            Some(v) if v.eq_ignore_ascii_case("email") => Ok(Self::Email),
            Some(v) if v.eq_ignore_ascii_case("slash") => Ok(Self::Slash),
            Some(other) => Err(EngineError::configuration(format!(
                "unknown BindFormat '{}' (expected Email or Slash)",
                other
            ))),
        }
    }

    fn bind_name(&self, realm: &str, account: &str) -> String {
        match self {
            Self::Email => format!("{}@{}", account, realm),
            Self::Slash => format!("{}\\{}", realm, account),
        }
    }
}

struct LdapConfig {
    servers: Vec<String>,
    bind_format: BindFormat,
    timeout: Duration,
}

/// Simple-bind verification against a directory
pub struct LdapAuthBackend {
    config: RwLock<Option<LdapConfig>>,
    tracker: CallTracker,
}

impl LdapAuthBackend {
    pub fn new() -> Self {
        Self {
            config: RwLock::new(None),
            tracker: CallTracker::new(),
        }
    }

    async fn try_bind(
        url: &str,
        bind_name: &str,
        password: &str,
        timeout: Duration,
    ) -> Result<u32, BackendError> {
        let attempt = async {
            let (conn, mut ldap) =
                LdapConnAsync::new(url)
                    .await
                    .map_err(|err| BackendError::Unreachable {
                        message: format!("{}: {}", url, err),
                    })?;
            ldap3::drive!(conn);
            let result = ldap
                .simple_bind(bind_name, password)
                .await
                .map_err(|err| BackendError::Unreachable {
                    message: format!("{}: {}", url, err),
                })?;
            let _ = ldap.unbind().await;
            Ok(result.rc)
        };
        match tokio::time::timeout(timeout, attempt).await {
            Ok(outcome) => outcome,
            Err(_) => Err(BackendError::Timeout { timeout }),
        }
    }
}

impl Default for LdapAuthBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuthBackend for LdapAuthBackend {
    fn name(&self) -> &str {
        "ldap"
    }

    async fn open(&self, ctx: BackendContext) -> EngineResult<()> {
        log_unrecognized_args(self.name(), &ctx.args, &["Servers", "BindFormat", "Timeout"]);
        let servers: Vec<String> = ctx
            .args
            .get("Servers")
            .ok_or_else(|| EngineError::configuration("ldap backend requires a Servers argument"))?
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|server| {
                // bare host names get the default scheme
                if server.contains("://") {
                    server.to_string()
                } else {
                    format!("ldap://{}", server)
                }
            })
            .collect();
        if servers.is_empty() {
            return Err(EngineError::configuration(
                "ldap backend requires at least one server",
            ));
        }
        let bind_format = BindFormat::parse(ctx.args.get("BindFormat"))?;
        let timeout = ctx
            .args
            .get_duration("Timeout")
            .map_err(EngineError::from)?
            .unwrap_or(DEFAULT_TIMEOUT);

        let mut config = self.config.write().await;
        if config.is_some() {
            return Err(EngineError::invariant("ldap backend is already open"));
        }
        *config = Some(LdapConfig {
            servers,
            bind_format,
            timeout,
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
        let (servers, bind_name, timeout) = {
            let config = self.config.read().await;
            let config = config.as_ref().ok_or(BackendError::Configuration {
                message: "ldap backend is not open".to_string(),
            })?;
            (
                config.servers.clone(),
                config.bind_format.bind_name(realm, account),
                config.timeout,
            )
        };

        let mut last_error = BackendError::Configuration {
            message: "no ldap servers configured".to_string(),
        };
        for url in &servers {
            match Self::try_bind(url, &bind_name, password, timeout).await {
                Ok(LDAP_RC_SUCCESS) => {
                    debug!(server = %url, "ldap bind accepted");
                    return Ok(AuthResult::authenticated());
                }
                Ok(LDAP_RC_INVALID_CREDENTIALS) => {
                    return Ok(AuthResult::rejected(AuthStatus::AccessDenied));
                }
                Ok(rc) => {
                    return Err(BackendError::MalformedResponse {
                        message: format!("unexpected ldap result code {} from {}", rc, url),
                    });
                }
                Err(err) => {
                    // try the next server in the list
                    warn!(server = %url, error = %err, "ldap server unavailable");
                    last_error = err;
                }
            }
        }
        Err(last_error)
    }

    async fn close(&self) {
        self.tracker.quiesce().await;
        *self.config.write().await = None;
    }
}
