//! Cache-aside, request-coalescing query engine.
//!
//! Read path for paginated store reviews:
//!
//! 1. normalize (page, size) and derive the cache key
//! 2. cache get; a hit short-circuits everything
//! 3. on "key absent", run the loader under the coalescer: re-check the
//!    cache, search the backend, populate the cache, return the bytes
//! 4. deserialize the envelope; a hit that fails to map is logged and
//!    skipped, the backend-reported total is kept as-is
//!
//! A cache *error* (as opposed to a miss) is returned to the caller
//! directly. Falling through to the search backend during a cache outage
//! would redirect the full read load onto it at the worst possible time.

use crate::cache::{CacheStore, query_key};
use crate::coalesce::Coalescer;
use crate::model::ReviewDoc;
use crate::search::{SearchBackend, SearchPage};
use crate::Error;
use std::sync::Arc;
use std::time::Duration;

/// Hard ceiling on page size; anything above falls back to the default.
const MAX_PAGE_SIZE: i32 = 50;

/// Page size used when the caller's is absent or out of range.
const DEFAULT_PAGE_SIZE: i32 = 10;

/// Normalized pagination window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryPage {
    pub offset: i32,
    pub limit: i32,
}

impl QueryPage {
    /// Clamp caller-supplied (page, size) into a valid window.
    ///
    /// page ≤ 0 becomes 1; size outside 1..=50 becomes 10. Offset is
    /// computed from the clamped values, so `page=3, size=100` lands at
    /// offset 20 with limit 10. The multiplication saturates, so an
    /// absurdly deep page never panics or goes negative.
    pub fn normalize(page: i32, size: i32) -> Self {
        let page = if page <= 0 { 1 } else { page };
        let size = if size <= 0 || size > MAX_PAGE_SIZE { DEFAULT_PAGE_SIZE } else { size };
        Self { offset: (page - 1).saturating_mul(size), limit: size }
    }
}

/// Paginated review queries through the cache, coalesced on miss.
///
/// Holds shared handles to externally constructed clients; their
/// connection lifecycles belong to whoever built them. The coalescer is
/// engine-local, so independent engines in one process do not share
/// flights.
pub struct QueryEngine {
    cache: Arc<dyn CacheStore>,
    backend: Arc<dyn SearchBackend>,
    flights: Coalescer<Vec<u8>>,
    ttl: Duration,
    loader_timeout: Option<Duration>,
}

impl QueryEngine {
    pub fn new(cache: Arc<dyn CacheStore>, backend: Arc<dyn SearchBackend>, ttl: Duration) -> Self {
        Self { cache, backend, flights: Coalescer::new(), ttl, loader_timeout: None }
    }

    /// Bound the coalesced backend call. Without a bound, one stalled
    /// search call stalls every waiter coalesced onto its key.
    pub fn with_loader_timeout(mut self, timeout: Duration) -> Self {
        self.loader_timeout = Some(timeout);
        self
    }

    /// List reviews for a store, newest window first per backend order.
    ///
    /// Returns the page of decoded documents and the total match count.
    /// The total comes from the backend envelope even when individual
    /// hits fail to decode, so callers can still paginate correctly.
    pub async fn list_by_store(&self, store_id: i64, page: i32, size: i32) -> Result<(Vec<ReviewDoc>, u64), Error> {
        let window = QueryPage::normalize(page, size);
        let key = query_key(store_id, window.offset, window.limit);

        let bytes = match self.cache.get(&key).await? {
            Some(bytes) => bytes,
            None => {
                let (outcome, shared) = self
                    .flights
                    .run(&key, || self.load(store_id, &key, window))
                    .await;
                tracing::debug!(key, shared, "resolved cache miss");
                outcome?
            }
        };

        let envelope: SearchPage =
            serde_json::from_slice(&bytes).map_err(|e| Error::Serialization(e.to_string()))?;

        let mut reviews = Vec::with_capacity(envelope.hits.len());
        for hit in envelope.hits {
            match serde_json::from_value::<ReviewDoc>(hit) {
                Ok(doc) => reviews.push(doc),
                Err(e) => {
                    // One bad record never fails the page.
                    tracing::error!(key, error = %e, "skipping undecodable hit");
                }
            }
        }

        Ok((reviews, envelope.total))
    }

    /// Coalesced miss loader: re-check the cache, then hit the backend
    /// and repopulate.
    ///
    /// The re-check guards the window where a sibling wave resolved the
    /// same key between our miss and our turn as flight leader.
    async fn load(&self, store_id: i64, key: &str, window: QueryPage) -> Result<Vec<u8>, Error> {
        if let Some(bytes) = self.cache.get(key).await? {
            tracing::debug!(key, "cache repopulated while waiting for flight");
            return Ok(bytes);
        }

        let page = match self.loader_timeout {
            Some(budget) => tokio::time::timeout(budget, self.backend.search(store_id, window.offset, window.limit))
                .await
                .map_err(|_| Error::Timeout(format!("search for {key:?} exceeded {budget:?}")))??,
            None => self.backend.search(store_id, window.offset, window.limit).await?,
        };

        let bytes = serde_json::to_vec(&page).map_err(|e| Error::Serialization(e.to_string()))?;
        self.cache.set(key, &bytes, self.ttl).await?;
        Ok(bytes)
    }
}
