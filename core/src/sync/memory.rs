//! In-process peer transport.
//!
//! Connects engines running in one process over a broadcast channel.
//! Used by the cluster tests and usable for single-host multi-engine
//! deployments.

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc};

use crate::errors::EngineResult;
use crate::sync::{PeerTransport, SyncMessage};

const HUB_CAPACITY: usize = 1024;

/// Shared bus every in-process transport publishes to
#[derive(Debug, Clone)]
pub struct InMemoryHub {
    tx: broadcast::Sender<SyncMessage>,
}

impl InMemoryHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(HUB_CAPACITY);
        Self { tx }
    }

    /// A transport endpoint attached to this hub
    pub fn transport(&self) -> InMemoryTransport {
        InMemoryTransport {
            tx: self.tx.clone(),
        }
    }
}

impl Default for InMemoryHub {
    fn default() -> Self {
        Self::new()
    }
}

/// One engine's endpoint on an [`InMemoryHub`]
#[derive(Debug, Clone)]
pub struct InMemoryTransport {
    tx: broadcast::Sender<SyncMessage>,
}

#[async_trait]
impl PeerTransport for InMemoryTransport {
    fn name(&self) -> &str {
        "memory"
    }

    async fn publish(&self, message: &SyncMessage) -> EngineResult<()> {
        // no receivers is fine: a single-node cluster broadcasts into the
        // void
        let _ = self.tx.send(message.clone());
        Ok(())
    }

    async fn subscribe(&self) -> EngineResult<mpsc::Receiver<SyncMessage>> {
        let mut bus = self.tx.subscribe();
        let (out_tx, out_rx) = mpsc::channel(HUB_CAPACITY);
        tokio::spawn(async move {
            loop {
                match bus.recv().await {
                    Ok(message) => {
                        if out_tx.send(message).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        Ok(out_rx)
    }
}
