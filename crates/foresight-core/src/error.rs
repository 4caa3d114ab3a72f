//! Error types for the prefetching engine

use thiserror::Error;

/// Result type for prefetch operations
pub type Result<T> = std::result::Result<T, PrefetchError>;

/// Errors that can occur while prefetching
///
/// None of these are fatal to the host page; every caller degrades to
/// "do nothing" with diagnostic logging.
#[derive(Error, Debug)]
pub enum PrefetchError {
    /// Resource exceeds the current byte budget (skipped, not retried)
    #[error("resource too large: {url} is {size} bytes, budget {limit}")]
    ResourceTooLarge { url: String, size: u64, limit: u64 },

    /// Persistence collaborator is unavailable; learning continues in memory
    #[error("persistence unavailable: {0}")]
    PersistenceUnavailable(String),

    /// Prefetch queue is at capacity
    #[error("prefetch queue is full")]
    QueueFull,

    /// Serialization error from persisted state
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
