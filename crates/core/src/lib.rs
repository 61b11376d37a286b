//! Core types and logic for revq, a search read replica for reviews.
//!
//! This crate provides:
//! - CDC ingestion: change-event decode, index writes, the consumer loop
//! - The cache-aside, request-coalescing query engine
//! - Cache store and search backend contracts
//! - Unified error types and configuration

pub mod cache;
pub mod coalesce;
pub mod config;
pub mod error;
pub mod ingest;
pub mod model;
pub mod query;
pub mod search;

pub use cache::{CacheStore, MemoryCache};
pub use coalesce::Coalescer;
pub use config::AppConfig;
pub use error::Error;
pub use ingest::{ChangeLog, Consumer, IndexWriter};
pub use model::ReviewDoc;
pub use query::QueryEngine;
pub use search::{SearchBackend, SearchPage};
