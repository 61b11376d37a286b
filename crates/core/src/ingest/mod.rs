//! CDC ingestion: change log contract, event decode, index writes.
//!
//! The durable log itself (consumer groups, redelivery, offsets) is an
//! external collaborator behind [`ChangeLog`]. This module owns what
//! happens after a message arrives: decode it, route it to the search
//! replica, and keep the stream moving no matter what a single message
//! does.

pub mod consumer;
pub mod event;
pub mod writer;

pub use consumer::Consumer;
pub use event::{ChangeEvent, OpKind, RawChangeMessage};
pub use writer::IndexWriter;

use crate::Error;
use async_trait::async_trait;

/// One raw message pulled from the log.
#[derive(Debug, Clone)]
pub struct LogMessage {
    /// Log-assigned message ID, echoed back on ack.
    pub id: String,
    pub payload: Vec<u8>,
}

/// Durable ordered message log, consumer-group semantics, at-least-once.
///
/// `next` suspends until a message is available. Per-partition order is
/// the log's responsibility; this layer reads sequentially and never
/// reorders. Redelivery is owned by the log too; the consumer does not
/// deduplicate, it relies on the index writes being idempotent.
#[async_trait]
pub trait ChangeLog: Send {
    /// Pull the next message, suspending until one arrives.
    async fn next(&mut self) -> Result<LogMessage, Error>;

    /// Confirm a message as processed (or deliberately skipped).
    async fn ack(&mut self, message: &LogMessage) -> Result<(), Error>;
}
