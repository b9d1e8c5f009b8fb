//! RADIUS authentication backend.
//!
//! A minimal RFC 2865 client: one Access-Request per authentication,
//! retried across the configured servers. Arguments:
//!
//! - `Servers` (required) — comma-separated `host[:port]`, port 1812 by
//!   default
//! - `Secret` (required) — the shared secret
//! - `RealmFormat` (default `Slash`) — user name derivation: `Slash`
//!   sends `realm/account`, `Email` sends `account@realm`
//! - `Timeout` (default `5s`) — per-attempt response budget
//! - `Retries` (default `3`) — attempts per server
//!
//! Access-Accept maps to `Authenticated`, Access-Reject to
//! `AccessDenied`; exhausting every server raises a timeout error.

use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use md5::{Digest, Md5};
use tokio::net::UdpSocket;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use ag_core::backends::{log_unrecognized_args, AuthBackend, BackendContext, CallTracker};
use ag_core::domain::entities::{AuthResult, AuthStatus};
use ag_core::errors::{BackendError, BackendResult, EngineError, EngineResult};

const CODE_ACCESS_REQUEST: u8 = 1;
const CODE_ACCESS_ACCEPT: u8 = 2;
const CODE_ACCESS_REJECT: u8 = 3;

const ATTR_USER_NAME: u8 = 1;
const ATTR_USER_PASSWORD: u8 = 2;
const ATTR_NAS_IDENTIFIER: u8 = 32;

const DEFAULT_PORT: u16 = 1812;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_RETRIES: u32 = 3;
const MAX_PASSWORD_LEN: usize = 128;
const NAS_IDENTIFIER: &str = "authgrid";

/// How the RADIUS user name is derived from realm and account
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RealmFormat {
    /// `realm/account`
    Slash,
    /// `account@realm`
    Email,
}

impl RealmFormat {
    fn parse(value: Option<&str>) -> EngineResult<Self> {
        match value {
            None => Ok(Self::Slash),
            Some(v) if v.eq_ignore_ascii_case("slash") => Ok(Self::Slash),
            Some(v) if v.eq_ignore_ascii_case("email") => Ok(Self::Email),
            Some(other) => Err(EngineError::configuration(format!(
                "unknown RealmFormat '{}' (expected Slash or Email)",
                other
            ))),
        }
    }

    fn user_name(&self, realm: &str, account: &str) -> String {
        match self {
            Self::Slash => format!("{}/{}", realm, account),
            Self::Email => format!("{}@{}", account, realm),
        }
    }
}

/// Hide a password per RFC 2865 §5.2: pad to 16-byte blocks, then chain
/// `c_i = p_i XOR MD5(secret + c_{i-1})` seeded with the request
/// authenticator.
pub(crate) fn hide_password(
    secret: &[u8],
    authenticator: &[u8; 16],
    password: &[u8],
) -> BackendResult<Vec<u8>> {
    if password.len() > MAX_PASSWORD_LEN {
        return Err(BackendError::Configuration {
            message: format!("password exceeds the RADIUS limit of {} bytes", MAX_PASSWORD_LEN),
        });
    }
    let blocks = password.len().div_ceil(16).max(1);
    let mut padded = password.to_vec();
    padded.resize(blocks * 16, 0);

    let mut hidden = Vec::with_capacity(padded.len());
    let mut chain: Vec<u8> = authenticator.to_vec();
    for block in padded.chunks(16) {
        let mut hasher = Md5::new();
        hasher.update(secret);
        hasher.update(&chain);
        let mask = hasher.finalize();
        let encrypted: Vec<u8> = block.iter().zip(mask.iter()).map(|(p, m)| p ^ m).collect();
        chain = encrypted.clone();
        hidden.extend_from_slice(&encrypted);
    }
    Ok(hidden)
}

fn push_attribute(packet: &mut Vec<u8>, attr_type: u8, value: &[u8]) {
    packet.push(attr_type);
    packet.push((value.len() + 2) as u8);
    packet.extend_from_slice(value);
}

/// Build an Access-Request packet
pub(crate) fn encode_access_request(
    identifier: u8,
    authenticator: &[u8; 16],
    user_name: &str,
    hidden_password: &[u8],
) -> Vec<u8> {
    let mut packet = Vec::with_capacity(64);
    packet.push(CODE_ACCESS_REQUEST);
    packet.push(identifier);
    packet.extend_from_slice(&[0, 0]); // length, patched below
    packet.extend_from_slice(authenticator);
    push_attribute(&mut packet, ATTR_USER_NAME, user_name.as_bytes());
    push_attribute(&mut packet, ATTR_USER_PASSWORD, hidden_password);
    push_attribute(&mut packet, ATTR_NAS_IDENTIFIER, NAS_IDENTIFIER.as_bytes());

    let length = packet.len() as u16;
    packet[2..4].copy_from_slice(&length.to_be_bytes());
    packet
}

/// Validate a response against the request it answers and return its code
pub(crate) fn decode_response(
    buf: &[u8],
    identifier: u8,
    request_authenticator: &[u8; 16],
    secret: &[u8],
) -> BackendResult<u8> {
    if buf.len() < 20 {
        return Err(BackendError::MalformedResponse {
            message: format!("radius response too short ({} bytes)", buf.len()),
        });
    }
    let length = u16::from_be_bytes([buf[2], buf[3]]) as usize;
    if length < 20 || length > buf.len() {
        return Err(BackendError::MalformedResponse {
            message: format!("radius response length field {} is invalid", length),
        });
    }
    if buf[1] != identifier {
        return Err(BackendError::MalformedResponse {
            message: format!(
                "radius response identifier {} does not match request {}",
                buf[1], identifier
            ),
        });
    }

    // ResponseAuth = MD5(Code + ID + Length + RequestAuth + Attributes + Secret)
    let mut hasher = Md5::new();
    hasher.update(&buf[0..4]);
    hasher.update(request_authenticator);
    hasher.update(&buf[20..length]);
    hasher.update(secret);
    let expected = hasher.finalize();
    if !constant_time_eq::constant_time_eq(expected.as_slice(), &buf[4..20]) {
        return Err(BackendError::MalformedResponse {
            message: "radius response authenticator verification failed".to_string(),
        });
    }
    Ok(buf[0])
}

struct RadiusConfig {
    servers: Vec<String>,
    secret: Vec<u8>,
    realm_format: RealmFormat,
    timeout: Duration,
    retries: u32,
}

/// RADIUS Access-Request verification
pub struct RadiusAuthBackend {
    config: RwLock<Option<RadiusConfig>>,
    identifier: AtomicU8,
    tracker: CallTracker,
}

impl RadiusAuthBackend {
    pub fn new() -> Self {
        Self {
            config: RwLock::new(None),
            identifier: AtomicU8::new(0),
            tracker: CallTracker::new(),
        }
    }

    async fn exchange(
        server: &str,
        packet: &[u8],
        timeout: Duration,
    ) -> Result<Vec<u8>, BackendError> {
        let socket = UdpSocket::bind("0.0.0.0:0")
            .await
            .map_err(|err| BackendError::Unreachable {
                message: format!("cannot bind radius client socket: {}", err),
            })?;
        socket
            .connect(server)
            .await
            .map_err(|err| BackendError::Unreachable {
                message: format!("{}: {}", server, err),
            })?;
        socket
            .send(packet)
            .await
            .map_err(|err| BackendError::Unreachable {
                message: format!("{}: {}", server, err),
            })?;

        let mut buf = vec![0u8; 4096];
        match tokio::time::timeout(timeout, socket.recv(&mut buf)).await {
            Ok(Ok(received)) => {
                buf.truncate(received);
                Ok(buf)
            }
            Ok(Err(err)) => Err(BackendError::Unreachable {
                message: format!("{}: {}", server, err),
            }),
            Err(_) => Err(BackendError::Timeout { timeout }),
        }
    }
}

impl Default for RadiusAuthBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuthBackend for RadiusAuthBackend {
    fn name(&self) -> &str {
        "radius"
    }

    async fn open(&self, ctx: BackendContext) -> EngineResult<()> {
        log_unrecognized_args(
            self.name(),
            &ctx.args,
            &["Servers", "Secret", "RealmFormat", "Timeout", "Retries"],
        );
        let servers: Vec<String> = ctx
            .args
            .get("Servers")
            .ok_or_else(|| {
                EngineError::configuration("radius backend requires a Servers argument")
            })?
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|server| {
                if server.contains(':') {
                    server.to_string()
                } else {
                    format!("{}:{}", server, DEFAULT_PORT)
                }
            })
            .collect();
        if servers.is_empty() {
            return Err(EngineError::configuration(
                "radius backend requires at least one server",
            ));
        }
        let secret = ctx
            .args
            .get("Secret")
            .ok_or_else(|| EngineError::configuration("radius backend requires a Secret argument"))?
            .as_bytes()
            .to_vec();
        let realm_format = RealmFormat::parse(ctx.args.get("RealmFormat"))?;
        let timeout = ctx
            .args
            .get_duration("Timeout")
            .map_err(EngineError::from)?
            .unwrap_or(DEFAULT_TIMEOUT);
        let retries = ctx
            .args
            .get_u32("Retries")
            .map_err(EngineError::from)?
            .unwrap_or(DEFAULT_RETRIES)
            .max(1);

        let mut config = self.config.write().await;
        if config.is_some() {
            return Err(EngineError::invariant("radius backend is already open"));
        }
        *config = Some(RadiusConfig {
            servers,
            secret,
            realm_format,
            timeout,
            retries,
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
        let (servers, secret, user_name, timeout, retries) = {
            let config = self.config.read().await;
            let config = config.as_ref().ok_or(BackendError::Configuration {
                message: "radius backend is not open".to_string(),
            })?;
            (
                config.servers.clone(),
                config.secret.clone(),
                config.realm_format.user_name(realm, account),
                config.timeout,
                config.retries,
            )
        };

        let identifier = self.identifier.fetch_add(1, Ordering::Relaxed);
        let authenticator: [u8; 16] = rand::random();
        let hidden = hide_password(&secret, &authenticator, password.as_bytes())?;
        let packet = encode_access_request(identifier, &authenticator, &user_name, &hidden);

        let mut last_error = BackendError::Timeout { timeout };
        for server in &servers {
            for attempt in 1..=retries {
                match Self::exchange(server, &packet, timeout).await {
                    Ok(response) => {
                        let code = decode_response(&response, identifier, &authenticator, &secret)?;
                        return match code {
                            CODE_ACCESS_ACCEPT => {
                                debug!(server = %server, "radius access-accept");
                                Ok(AuthResult::authenticated())
                            }
                            CODE_ACCESS_REJECT => {
                                Ok(AuthResult::rejected(AuthStatus::AccessDenied))
                            }
                            other => Err(BackendError::MalformedResponse {
                                message: format!("unexpected radius response code {}", other),
                            }),
                        };
                    }
                    Err(err) => {
                        warn!(server = %server, attempt, error = %err, "radius attempt failed");
                        last_error = err;
                    }
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
