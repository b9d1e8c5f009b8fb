//! Peer synchronization between engine instances.
//!
//! Front-end nodes converge on one view by exchanging two kinds of
//! messages: newly accepted credentials and cache-control directives.
//! [`ClusterSync`] pumps engine events out through a [`PeerTransport`]
//! and applies incoming peer messages to the local engine. Messages carry
//! the originating instance id so a node ignores its own broadcasts.
//!
//! Transport security and endpoint discovery belong to the transport
//! implementation; the adapter only caches an optional peer key and drops
//! it when a `KeyUpdate` arrives.

pub mod memory;

#[cfg(test)]
mod tests;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::engine::{AuthEngine, EngineEvent};
use crate::errors::EngineResult;

// Re-export commonly used types
pub use memory::{InMemoryHub, InMemoryTransport};

/// Directives exchanged between engine instances
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncPayload {
    /// A peer accepted this credential; mirror it into the positive cache
    CredentialShared {
        realm: String,
        account: String,
        password: String,
        ttl: Duration,
    },
    /// A peer observed a failed authentication for this account
    FailObserved { realm: String, account: String },
    CacheRemoveAccount { realm: String, account: String },
    CacheRemoveRealm { realm: String },
    CacheClear,
    CacheRemoveNakAccount { realm: String, account: String },
    CacheRemoveNakRealm { realm: String },
    CacheClearNak,
    /// The cluster's signing key rolled; drop any cached peer key
    KeyUpdate,
}

/// A payload stamped with its originating engine instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncMessage {
    pub origin: Uuid,
    pub payload: SyncPayload,
}

impl SyncMessage {
    pub fn new(origin: Uuid, payload: SyncPayload) -> Self {
        Self { origin, payload }
    }
}

/// Message transport shared by the peer engines
#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// Short type name for logs and diagnostics
    fn name(&self) -> &str;

    /// Broadcast a message to every peer (including, possibly, ourselves;
    /// receivers filter on the origin id)
    async fn publish(&self, message: &SyncMessage) -> EngineResult<()>;

    /// Open the incoming message stream
    async fn subscribe(&self) -> EngineResult<mpsc::Receiver<SyncMessage>>;
}

/// Binds an engine to a peer transport.
///
/// On start the adapter spawns two pumps: engine `Authenticated` events
/// flow out as `CredentialShared` broadcasts, and incoming peer messages
/// are applied to the engine. Cache-control broadcasts are not automatic —
/// the caller of a flush API decides whether to publish one via
/// [`broadcast`](Self::broadcast).
pub struct ClusterSync {
    engine: Arc<AuthEngine>,
    transport: Arc<dyn PeerTransport>,
    peer_key: RwLock<Option<Vec<u8>>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl ClusterSync {
    /// Wire the engine to the transport and start both pumps
    pub async fn start(
        engine: Arc<AuthEngine>,
        transport: Arc<dyn PeerTransport>,
    ) -> EngineResult<Arc<Self>> {
        let sync = Arc::new(Self {
            engine: Arc::clone(&engine),
            transport: Arc::clone(&transport),
            peer_key: RwLock::new(None),
            tasks: Mutex::new(Vec::new()),
        });

        let outbound = {
            let engine = Arc::clone(&engine);
            let transport = Arc::clone(&transport);
            let mut events = engine.subscribe();
            tokio::spawn(async move {
                loop {
                    match events.recv().await {
                        Ok(EngineEvent::Authenticated {
                            realm,
                            account,
                            password,
                            ttl,
                        }) => {
                            let message = SyncMessage::new(
                                engine.instance_id(),
                                SyncPayload::CredentialShared {
                                    realm,
                                    account,
                                    password,
                                    ttl,
                                },
                            );
                            if let Err(err) = transport.publish(&message).await {
                                warn!(error = %err, "failed to broadcast accepted credential");
                            }
                        }
                        Ok(_) => {}
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(skipped, "event stream lagged, peer broadcasts dropped");
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    }
                }
            })
        };

        let inbound = {
            let sync = Arc::clone(&sync);
            let mut incoming = transport.subscribe().await?;
            tokio::spawn(async move {
                while let Some(message) = incoming.recv().await {
                    if message.origin == sync.engine.instance_id() {
                        continue;
                    }
                    sync.apply(message.payload).await;
                }
            })
        };

        sync.tasks.lock().await.extend([outbound, inbound]);
        info!(transport = transport.name(), "cluster sync started");
        Ok(sync)
    }

    /// Publish a directive to the cluster, stamped with this instance's id
    pub async fn broadcast(&self, payload: SyncPayload) -> EngineResult<()> {
        let message = SyncMessage::new(self.engine.instance_id(), payload);
        self.transport.publish(&message).await
    }

    /// Stop both pumps. In-flight applications complete on their own.
    pub async fn stop(&self) {
        for task in self.tasks.lock().await.drain(..) {
            task.abort();
        }
        info!("cluster sync stopped");
    }

    /// Cached peer public key, if a keyed transport stored one
    pub async fn peer_key(&self) -> Option<Vec<u8>> {
        self.peer_key.read().await.clone()
    }

    pub async fn set_peer_key(&self, key: Vec<u8>) {
        *self.peer_key.write().await = Some(key);
    }

    async fn apply(&self, payload: SyncPayload) {
        debug!(?payload, "applying peer directive");
        let outcome = match payload {
            SyncPayload::CredentialShared {
                realm,
                account,
                password,
                ttl,
            } => self
                .engine
                .add_credentials(&realm, &account, &password, ttl),
            SyncPayload::FailObserved { realm, account } => {
                self.engine.increment_fail_count(&realm, &account)
            }
            SyncPayload::CacheRemoveAccount { realm, account } => {
                self.engine.flush_cache(&realm, Some(&account))
            }
            SyncPayload::CacheRemoveRealm { realm } => self.engine.flush_cache(&realm, None),
            SyncPayload::CacheClear => self.engine.clear_cache(),
            SyncPayload::CacheRemoveNakAccount { realm, account } => {
                self.engine.flush_nak_cache(&realm, Some(&account))
            }
            SyncPayload::CacheRemoveNakRealm { realm } => self.engine.flush_nak_cache(&realm, None),
            SyncPayload::CacheClearNak => self.engine.clear_nak_cache(),
            SyncPayload::KeyUpdate => {
                *self.peer_key.write().await = None;
                Ok(())
            }
        };
        if let Err(err) = outcome {
            warn!(error = %err, "peer directive not applied");
        }
    }
}
