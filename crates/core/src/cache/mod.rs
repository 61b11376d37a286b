//! Cache store contract and query cache key derivation.
//!
//! The store is a plain TTL key/value surface. The one semantic that
//! matters to the read path: an absent key is `Ok(None)`, never an error.
//! Only infrastructure failures (connectivity, protocol) surface as `Err`,
//! and the query engine treats those as hard failures instead of falling
//! through to the search backend.

pub mod memory;

pub use memory::MemoryCache;

use crate::Error;
use async_trait::async_trait;
use std::time::Duration;

/// TTL key/value store consumed by the query engine.
///
/// Implementations live outside core (Redis in `revq-client`, in-memory
/// here for tests and local runs); the engine holds a non-owning handle
/// and never manages the connection lifecycle.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch a key. `Ok(None)` means the key is absent or expired.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error>;

    /// Store a value under `key` for `ttl`. Entries are never explicitly
    /// invalidated by the write path; expiry is the only eviction.
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), Error>;
}

/// Cache key for one paginated store query: `review:<store>:<offset>:<limit>`.
///
/// Deterministic by construction, so every process derives the same key
/// for the same normalized query.
pub fn query_key(store_id: i64, offset: i32, limit: i32) -> String {
    format!("review:{store_id}:{offset}:{limit}")
}
