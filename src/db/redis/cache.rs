use redis::AsyncCommands;
use redis::Client;
use std::fmt::Display;
use tokio::sync::mpsc;

use crate::error::AppError;
use crate::error::AppResult;

const KEY_PREFIX: &str = "maverick";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Seed-based recommendations, keyed by the request fingerprint
    Recommendation(String),
    /// Per-user recommendations, keyed by user and filter fingerprint
    UserRecommendation { user_id: i64, fingerprint: String },
    Popular(usize),
    TmdbSearch { title: String, year: Option<i32> },
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Recommendation(fingerprint) => {
                write!(f, "{}:rec:{}", KEY_PREFIX, fingerprint)
            }
            CacheKey::UserRecommendation {
                user_id,
                fingerprint,
            } => write!(f, "{}:user:{}:{}", KEY_PREFIX, user_id, fingerprint),
            CacheKey::Popular(n) => write!(f, "{}:popular:{}", KEY_PREFIX, n),
            CacheKey::TmdbSearch { title, year } => match year {
                Some(year) => write!(f, "{}:tmdb:{}:{}", KEY_PREFIX, title.to_lowercase(), year),
                None => write!(f, "{}:tmdb:{}", KEY_PREFIX, title.to_lowercase()),
            },
        }
    }
}

/// Opens a Redis client; connections are made lazily per operation
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Pending `SETEX` for the background writer
struct PendingWrite {
    key: String,
    value: String,
    ttl: u64,
}

/// JSON cache over Redis with fire-and-forget writes
#[derive(Clone)]
pub struct Cache {
    redis_client: Client,
    write_tx: mpsc::UnboundedSender<PendingWrite>,
}

/// Stops the background writer after draining queued writes
pub struct CacheWriterHandle {
    shutdown_tx: mpsc::Sender<()>,
    writer: tokio::task::JoinHandle<()>,
}

impl CacheWriterHandle {
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Err(e) = self.writer.await {
            tracing::error!(error = %e, "Cache writer task failed");
        }
        tracing::info!("Cache writer stopped");
    }
}

/// Drains the write queue into Redis until told to shut down
struct CacheWriter {
    client: Client,
    write_rx: mpsc::UnboundedReceiver<PendingWrite>,
    shutdown_rx: mpsc::Receiver<()>,
}

impl CacheWriter {
    async fn run(mut self) {
        tracing::debug!("Cache writer started");
        let mut written = 0usize;
        let mut failed = 0usize;

        loop {
            tokio::select! {
                Some(write) = self.write_rx.recv() => {
                    match Self::write(&self.client, write).await {
                        Ok(()) => written += 1,
                        Err(e) => {
                            failed += 1;
                            tracing::error!(error = %e, "Failed to write to Redis cache");
                        }
                    }
                }
                _ = self.shutdown_rx.recv() => break,
                else => break,
            }
        }

        // Flush whatever was queued before shutdown
        self.write_rx.close();
        while let Some(write) = self.write_rx.recv().await {
            match Self::write(&self.client, write).await {
                Ok(()) => written += 1,
                Err(e) => {
                    failed += 1;
                    tracing::error!(error = %e, "Failed to flush cache write during shutdown");
                }
            }
        }

        tracing::info!(written, failed, "Cache writer drained");
    }

    async fn write(client: &Client, write: PendingWrite) -> AppResult<()> {
        let mut conn = client.get_multiplexed_async_connection().await?;
        let _: () = conn.set_ex(write.key, write.value, write.ttl).await?;
        Ok(())
    }
}

impl Cache {
    /// Creates the cache and spawns its background writer
    pub fn new(redis_client: Client) -> (Self, CacheWriterHandle) {
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let writer = CacheWriter {
            client: redis_client.clone(),
            write_rx,
            shutdown_rx,
        };
        let writer = tokio::spawn(writer.run());

        (
            Self {
                redis_client,
                write_tx,
            },
            CacheWriterHandle {
                shutdown_tx,
                writer,
            },
        )
    }

    /// Cached value for `key`, or `None` on a miss
    pub async fn get_from_cache<T: serde::de::DeserializeOwned>(
        &self,
        key: &CacheKey,
    ) -> AppResult<Option<T>> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let cached: Option<String> = conn.get(key.to_string()).await?;

        match cached {
            Some(json) => {
                let data = serde_json::from_str(&json).map_err(|e| {
                    AppError::Internal(format!("Cache deserialization error: {}", e))
                })?;
                tracing::debug!(key = %key, "Cache hit");
                Ok(Some(data))
            }
            None => {
                tracing::debug!(key = %key, "Cache miss");
                Ok(None)
            }
        }
    }

    /// Queues a write and returns immediately
    pub fn set_in_background<T: serde::Serialize>(&self, key: &CacheKey, value: &T, ttl: u64) {
        let value = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(key = %key, error = %e, "Cache serialization error");
                return;
            }
        };

        let write = PendingWrite {
            key: key.to_string(),
            value,
            ttl,
        };
        if self.write_tx.send(write).is_err() {
            tracing::warn!(key = %key, "Cache writer is stopped, dropping write");
        }
    }
}
