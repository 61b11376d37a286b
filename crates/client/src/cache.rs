//! Redis-backed query cache.
//!
//! GET/SET with server-side expiry. An absent key maps to `Ok(None)`;
//! every transport or protocol failure maps to `Error::Unavailable`, and
//! the query engine treats that as a hard failure rather than a miss.

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;
use revq_core::{CacheStore, Error};
use std::time::Duration;

/// Redis cache client configuration.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Connection URL (default: redis://127.0.0.1:6379).
    pub url: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self { url: "redis://127.0.0.1:6379".to_string() }
    }
}

/// TTL cache over one multiplexed Redis connection.
#[derive(Clone)]
pub struct RedisStore {
    conn: MultiplexedConnection,
}

impl RedisStore {
    /// Connect and hold a multiplexed connection; clones share it.
    pub async fn connect(config: &RedisConfig) -> Result<Self, Error> {
        let client = redis::Client::open(config.url.as_str()).map_err(|e| Error::Unavailable(e.to_string()))?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| Error::Unavailable(e.to_string()))?;

        tracing::debug!(url = %config.url, "connected to redis cache");
        Ok(Self { conn })
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = conn.get(key).await.map_err(|e| Error::Unavailable(e.to_string()))?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), Error> {
        let mut conn = self.conn.clone();
        // EX rounds sub-second TTLs up to a full second; the query cache
        // works in whole seconds anyway.
        let seconds = ttl.as_secs().max(1);
        let _: () = conn
            .set_ex(key, value, seconds)
            .await
            .map_err(|e| Error::Unavailable(e.to_string()))?;
        Ok(())
    }
}
