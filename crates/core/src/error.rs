//! Unified error types for revq.
//!
//! A cache miss is deliberately *not* an error: `CacheStore::get` returns
//! `Ok(None)` for an absent key so that miss handling stays ordinary
//! control flow. Everything here is a real failure.
//!
//! The enum is `Clone` on purpose. A coalesced load hands its outcome to
//! every waiter verbatim, so the error half of that outcome has to be
//! shareable. Adapters stringify their library errors at the boundary.

/// Unified error type for the revq read-replica pipeline.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// A change message that could not be decoded. Ingestion logs and
    /// skips these; the stream continues.
    #[error("malformed change message: {0}")]
    Decode(String),

    /// Search or cache infrastructure is unreachable. Reads propagate
    /// this to the caller; index writes log it and drop the event.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// A partial update targeted a document that does not exist yet.
    #[error("document {id} does not exist")]
    PreconditionFailed { id: String },

    /// A value failed to map to or from its serialized shape.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The coalesced loader exceeded its configured time budget.
    #[error("load timed out: {0}")]
    Timeout(String),
}

impl Error {
    /// Whether the caller may reasonably retry the operation later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Unavailable(_) | Error::Timeout(_))
    }
}
