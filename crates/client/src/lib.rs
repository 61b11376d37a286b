//! Outbound clients for revq.
//!
//! This crate provides the network-facing implementations of the core
//! contracts: the Redis query cache, the Redis Streams change log, and
//! the HTTP search backend client.

pub mod cache;
pub mod changelog;
pub mod search;

pub use cache::{RedisConfig, RedisStore};
pub use changelog::{ChangeLogConfig, RedisChangeLog};
pub use search::{SearchClient, SearchConfig};
