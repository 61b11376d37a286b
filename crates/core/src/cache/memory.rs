//! In-process TTL cache.
//!
//! Backs tests and single-node local runs. Expiry is lazy: an entry past
//! its deadline is dropped on the read that finds it, which is all the
//! read path needs since expired and absent are the same answer.

use super::CacheStore;
use crate::Error;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// TTL key/value map behind a mutex.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, (Vec<u8>, Instant)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live entry count, dropping anything already expired.
    pub async fn len(&self) -> usize {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        entries.retain(|_, (_, deadline)| *deadline > now);
        entries.len()
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some((value, deadline)) if *deadline > Instant::now() => Ok(Some(value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), Error> {
        let deadline = Instant::now() + ttl;
        self.entries
            .lock()
            .await
            .insert(key.to_string(), (value.to_vec(), deadline));
        Ok(())
    }
}
