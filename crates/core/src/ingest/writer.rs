//! Applies decoded change events to the search replica.

use super::event::{ChangeEvent, OpKind};
use crate::Error;
use crate::search::SearchBackend;
use serde_json::Value;
use std::sync::Arc;

/// Routes one change event into backend writes.
///
/// Insert events upsert the full document; everything else merges the
/// row as a partial update. Failures are logged and the row is dropped:
/// the replica is a derived read path, and stalling ingestion on one bad
/// write costs more than the bounded inconsistency window it would fix.
/// Redelivery is safe: upserts are idempotent and partial updates
/// re-merge the same fields.
pub struct IndexWriter {
    backend: Arc<dyn SearchBackend>,
}

impl IndexWriter {
    pub fn new(backend: Arc<dyn SearchBackend>) -> Self {
        Self { backend }
    }

    /// Apply every row of `event`, returning how many landed.
    ///
    /// A row failure (missing ID, backend error, missing precondition
    /// document) never blocks the remaining rows of the same event.
    pub async fn apply(&self, event: &ChangeEvent) -> usize {
        let mut applied = 0;
        for row in &event.rows {
            match self.apply_row(&event.op, row).await {
                Ok(()) => applied += 1,
                Err(e) => {
                    tracing::error!(table = %event.table, error = %e, "dropping change row");
                }
            }
        }
        applied
    }

    async fn apply_row(&self, op: &OpKind, row: &serde_json::Map<String, Value>) -> Result<(), Error> {
        let id = ChangeEvent::doc_id(row)?;
        let doc = Value::Object(row.clone());
        match op {
            OpKind::Insert => {
                self.backend.upsert(&id, &doc).await?;
                tracing::debug!(id, "document indexed");
            }
            OpKind::Other(kind) => {
                self.backend.partial_update(&id, &doc).await?;
                tracing::debug!(id, kind, "document updated");
            }
        }
        Ok(())
    }
}
