//! Search backend contract and the result envelope the cache stores.

use crate::Error;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One page of search hits plus the backend-reported total.
///
/// This is exactly what gets serialized into the cache: raw hit documents,
/// not decoded entities, so a cached page and a fresh page deserialize
/// through the same path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchPage {
    /// Total matching documents as reported by the backend. Not the hit
    /// count of this page.
    pub total: u64,

    /// Raw source documents for this window, in backend order.
    pub hits: Vec<serde_json::Value>,
}

/// Document search backend keeping the denormalized review replica.
///
/// Queries are an exact-match filter on the store scope plus an
/// offset/size window. Writes are full-document upsert (insert events)
/// and field-level partial update (everything else).
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Page of reviews for one store.
    async fn search(&self, store_id: i64, offset: i32, limit: i32) -> Result<SearchPage, Error>;

    /// Insert or fully replace the document under `id`. Idempotent.
    async fn upsert(&self, id: &str, doc: &serde_json::Value) -> Result<(), Error>;

    /// Merge `changes` into the existing document under `id`.
    ///
    /// Fails with [`Error::PreconditionFailed`] when the document does not
    /// exist; per-key event ordering guarantees the insert came first, so
    /// an absent target is an ingestion fault, not a race to paper over.
    async fn partial_update(&self, id: &str, changes: &serde_json::Value) -> Result<(), Error>;
}
