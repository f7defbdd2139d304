//! Memory engine errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MemoryError {
    /// Malformed record. Fatal to the single call, not to the store.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Missing id on get/update/delete. The caller decides how to recover.
    #[error("Memory record not found: {0}")]
    NotFound(String),

    /// A record with this id already exists.
    #[error("Duplicate record id: {0}")]
    Duplicate(String),

    /// Index propagation failed after the primary write. The write as a
    /// whole is treated as failed; it is never left half-applied.
    #[error("Index out of sync with primary store: {0}")]
    IndexSync(String),

    /// The embedding generator is unreachable. Search degrades to
    /// keyword-only ranking instead of surfacing this to the caller.
    #[error("Embedding provider unavailable: {0}")]
    UpstreamUnavailable(String),

    /// No rate-limiter capacity right now. Only raised by the non-blocking
    /// acquisition path; blocking acquires wait instead.
    #[error("Rate limit capacity exhausted for {0}")]
    CapacityExceeded(String),

    #[error("Storage error: {0}")]
    Storage(String),
}
