//! Client error types.

use thiserror::Error;

pub type FetchResult<T> = Result<T, FetchError>;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("generation service unavailable: {0}")]
    BackendUnavailable(String),

    #[error("generation failed: {0}")]
    GenerationFailed(String),

    #[error("download failed: {0}")]
    DownloadFailed(String),

    #[error("timed out after {0} seconds")]
    Timeout(u64),

    #[error("operation cancelled")]
    Cancelled,

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FetchError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FetchError::BackendUnavailable(_)
                | FetchError::GenerationFailed(_)
                | FetchError::DownloadFailed(_)
                | FetchError::Network(_)
        )
    }

    /// Whether the error came from cooperative cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetchError::Cancelled)
    }
}
