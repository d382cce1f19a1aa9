//! Cache error types.

use thiserror::Error;

pub type CacheResult<T> = Result<T, CacheError>;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("no cache entry for poster {0}")]
    NotCached(String),

    #[error("cache entry for poster {poster_id} failed integrity check: expected {expected}, got {actual}")]
    ChecksumMismatch {
        poster_id: String,
        expected: String,
        actual: String,
    },

    #[error("cache entry for poster {0} has expired")]
    Expired(String),

    #[error("cached file missing: {0}")]
    FileMissing(String),

    #[error("index error: {0}")]
    Index(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CacheError {
    /// Whether the entry can simply be re-fetched to recover.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CacheError::NotCached(_)
                | CacheError::ChecksumMismatch { .. }
                | CacheError::Expired(_)
                | CacheError::FileMissing(_)
        )
    }
}
