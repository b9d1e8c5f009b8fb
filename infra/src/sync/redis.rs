//! Redis pub/sub peer transport.
//!
//! Every engine instance publishes JSON-encoded sync messages to one
//! shared channel and subscribes to the same channel; origin filtering
//! happens in the cluster sync adapter. Message authentication and
//! encryption are left to the Redis deployment (TLS, ACLs).

use async_trait::async_trait;
use futures_util::StreamExt;
use redis::AsyncCommands;
use tokio::sync::{mpsc, Mutex};
use tracing::{info, warn};

use ag_core::errors::{EngineError, EngineResult};
use ag_core::sync::{PeerTransport, SyncMessage};

use ag_shared::config::ClusterSettings;

const CHANNEL_BUFFER: usize = 1024;

/// Redis-backed peer transport
pub struct RedisPeerTransport {
    client: redis::Client,
    channel: String,
    publish_conn: Mutex<Option<redis::aio::MultiplexedConnection>>,
}

impl RedisPeerTransport {
    /// Connect a transport for the given cluster settings
    pub fn new(settings: &ClusterSettings) -> EngineResult<Self> {
        let client = redis::Client::open(settings.redis_url.as_str()).map_err(|err| {
            EngineError::configuration(format!("invalid redis url: {}", err))
        })?;
        Ok(Self {
            client,
            channel: settings.channel.clone(),
            publish_conn: Mutex::new(None),
        })
    }

    async fn publish_connection(
        &self,
    ) -> EngineResult<redis::aio::MultiplexedConnection> {
        let mut slot = self.publish_conn.lock().await;
        if let Some(conn) = slot.as_ref() {
            return Ok(conn.clone());
        }
        let conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|err| EngineError::Internal {
                message: format!("redis connection failed: {}", err),
            })?;
        *slot = Some(conn.clone());
        Ok(conn)
    }
}

#[async_trait]
impl PeerTransport for RedisPeerTransport {
    fn name(&self) -> &str {
        "redis"
    }

    async fn publish(&self, message: &SyncMessage) -> EngineResult<()> {
        let payload = serde_json::to_string(message).map_err(|err| EngineError::Internal {
            message: format!("sync message encoding failed: {}", err),
        })?;
        let mut conn = self.publish_connection().await?;
        let outcome: Result<(), redis::RedisError> =
            conn.publish(self.channel.as_str(), payload).await;
        if let Err(err) = outcome {
            // drop the cached connection so the next publish reconnects
            *self.publish_conn.lock().await = None;
            return Err(EngineError::Internal {
                message: format!("redis publish failed: {}", err),
            });
        }
        Ok(())
    }

    async fn subscribe(&self) -> EngineResult<mpsc::Receiver<SyncMessage>> {
        let conn = self
            .client
            .get_async_connection()
            .await
            .map_err(|err| EngineError::Internal {
                message: format!("redis subscribe connection failed: {}", err),
            })?;
        let mut pubsub = conn.into_pubsub();
        pubsub
            .subscribe(self.channel.as_str())
            .await
            .map_err(|err| EngineError::Internal {
                message: format!("redis subscribe failed: {}", err),
            })?;
        info!(channel = %self.channel, "subscribed to cluster channel");

        let (tx, rx) = mpsc::channel(CHANNEL_BUFFER);
        tokio::spawn(async move {
            let mut stream = pubsub.on_message();
            while let Some(message) = stream.next().await {
                let payload: String = match message.get_payload() {
                    Ok(payload) => payload,
                    Err(err) => {
                        warn!(error = %err, "undecodable cluster message payload");
                        continue;
                    }
                };
                match serde_json::from_str::<SyncMessage>(&payload) {
                    Ok(message) => {
                        if tx.send(message).await.is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        warn!(error = %err, "malformed cluster message ignored");
                    }
                }
            }
        });
        Ok(rx)
    }
}
