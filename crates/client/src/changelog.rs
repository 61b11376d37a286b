//! Redis Streams change log consumer.
//!
//! Reads the CDC stream through a consumer group: blocking `XREADGROUP`
//! for delivery, `XACK` for confirmation. The group gives at-least-once
//! semantics and per-stream ordering; this client reads one entry at a
//! time so nothing downstream can reorder.

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;
use redis::streams::{StreamReadOptions, StreamReadReply};
use revq_core::ingest::{ChangeLog, LogMessage};
use revq_core::Error;

/// Field within each stream entry that carries the change payload.
const PAYLOAD_FIELD: &str = "payload";

/// Change stream consumer configuration.
#[derive(Debug, Clone)]
pub struct ChangeLogConfig {
    /// Connection URL (default: redis://127.0.0.1:6379).
    pub url: String,
    /// Stream key carrying change messages.
    pub stream: String,
    /// Consumer group name.
    pub group: String,
    /// This consumer's name within the group.
    pub consumer: String,
    /// Blocking read timeout in milliseconds. Bounds how long one `next`
    /// poll sleeps before re-issuing, which bounds shutdown latency.
    pub block_ms: u64,
}

impl Default for ChangeLogConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            stream: "review:changes".to_string(),
            group: "revq-indexer".to_string(),
            consumer: "revqd-1".to_string(),
            block_ms: 5_000,
        }
    }
}

/// Consumer-group reader over one Redis stream.
pub struct RedisChangeLog {
    conn: MultiplexedConnection,
    config: ChangeLogConfig,
}

impl RedisChangeLog {
    /// Connect and ensure the consumer group exists.
    ///
    /// Creates the group at the start of the stream (with MKSTREAM) so a
    /// fresh deployment consumes the backlog; an already-existing group
    /// is fine and keeps its delivery cursor.
    pub async fn connect(config: &ChangeLogConfig) -> Result<Self, Error> {
        let client = redis::Client::open(config.url.as_str()).map_err(|e| Error::Unavailable(e.to_string()))?;
        let mut conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| Error::Unavailable(e.to_string()))?;

        let created: Result<(), redis::RedisError> =
            conn.xgroup_create_mkstream(&config.stream, &config.group, "0").await;
        match created {
            Ok(()) => tracing::debug!(stream = %config.stream, group = %config.group, "created consumer group"),
            Err(e) if e.code() == Some("BUSYGROUP") => {
                tracing::debug!(stream = %config.stream, group = %config.group, "consumer group already exists");
            }
            Err(e) => return Err(Error::Unavailable(e.to_string())),
        }

        Ok(Self { conn, config: config.clone() })
    }
}

#[async_trait]
impl ChangeLog for RedisChangeLog {
    async fn next(&mut self) -> Result<LogMessage, Error> {
        let options = StreamReadOptions::default()
            .group(&self.config.group, &self.config.consumer)
            .count(1)
            .block(self.config.block_ms as usize);

        loop {
            let reply: Option<StreamReadReply> = self
                .conn
                .xread_options(&[&self.config.stream], &[">"], &options)
                .await
                .map_err(|e| Error::Unavailable(e.to_string()))?;

            let Some(reply) = reply else {
                // Blocking read timed out with nothing new; poll again.
                continue;
            };

            for key in reply.keys {
                if let Some(entry) = key.ids.into_iter().next() {
                    // A missing payload field still yields a message; the
                    // consumer's decode step logs and skips it, which also
                    // gets the entry acked instead of pending forever.
                    let payload: Vec<u8> = entry.get(PAYLOAD_FIELD).unwrap_or_default();
                    return Ok(LogMessage { id: entry.id, payload });
                }
            }
        }
    }

    async fn ack(&mut self, message: &LogMessage) -> Result<(), Error> {
        let _: () = self
            .conn
            .xack(&self.config.stream, &self.config.group, &[&message.id])
            .await
            .map_err(|e| Error::Unavailable(e.to_string()))?;
        Ok(())
    }
}
