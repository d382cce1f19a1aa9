//! Controller error taxonomy.
//!
//! Errors surfaced to the UI callback carry a retryability flag and a
//! suggested user action. The generation client already retries transient
//! failures internally; the controller never adds a second retry layer.

use thiserror::Error;

use arlip_cache::CacheError;
use arlip_client::FetchError;
use arlip_models::TalkingPhotoState;

use crate::player::PlayerError;

pub type ControllerResult<T> = Result<T, ControllerError>;

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("no poster detected within the scan timeout")]
    PosterNotDetected,

    #[error("poster {0} has no human face and cannot be animated")]
    NoHumanFace(String),

    #[error("generation service unavailable: {0}")]
    BackendUnavailable(String),

    #[error("video generation failed: {0}")]
    GenerationFailed(String),

    #[error("video download failed: {0}")]
    DownloadFailed(String),

    #[error("invalid lip coordinates: {0}")]
    InvalidCoordinates(String),

    #[error("cached video corrupted: {0}")]
    CacheCorrupted(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("invalid state transition: {from} -> {to}")]
    InvalidTransition {
        from: TalkingPhotoState,
        to: TalkingPhotoState,
    },

    #[error("no active talking-photo session")]
    NoActiveSession,

    #[error("player error: {0}")]
    Player(String),
}

impl ControllerError {
    /// Whether re-initializing the session can plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ControllerError::BackendUnavailable(_)
                | ControllerError::GenerationFailed(_)
                | ControllerError::DownloadFailed(_)
                | ControllerError::CacheCorrupted(_)
        )
    }

    /// Short user-facing hint for the UI layer.
    pub fn suggested_action(&self) -> &'static str {
        match self {
            ControllerError::PosterNotDetected => "Point the camera at a poster and hold steady",
            ControllerError::NoHumanFace(_) => "Scan a different poster",
            ControllerError::BackendUnavailable(_) => "Check your connection and try again",
            ControllerError::GenerationFailed(_) => "Try again in a moment",
            ControllerError::DownloadFailed(_) => "Check your connection and try again",
            ControllerError::InvalidCoordinates(_) => "Re-scan the poster",
            ControllerError::CacheCorrupted(_) => "Try again",
            ControllerError::Cancelled => "Scan again to restart",
            ControllerError::InvalidTransition { .. } | ControllerError::NoActiveSession => {
                "Restart the session"
            }
            ControllerError::Player(_) => "Restart the session",
        }
    }
}

impl From<FetchError> for ControllerError {
    fn from(e: FetchError) -> Self {
        match e {
            FetchError::BackendUnavailable(msg) => ControllerError::BackendUnavailable(msg),
            FetchError::GenerationFailed(msg) => ControllerError::GenerationFailed(msg),
            FetchError::DownloadFailed(msg) => ControllerError::DownloadFailed(msg),
            // The poll budget is part of generation; a blown budget reads the
            // same as a service-side failure to the user.
            FetchError::Timeout(secs) => {
                ControllerError::GenerationFailed(format!("timed out after {secs} seconds"))
            }
            FetchError::Cancelled => ControllerError::Cancelled,
            FetchError::Network(e) => ControllerError::BackendUnavailable(e.to_string()),
            FetchError::Io(e) => ControllerError::DownloadFailed(e.to_string()),
        }
    }
}

impl From<CacheError> for ControllerError {
    fn from(e: CacheError) -> Self {
        ControllerError::CacheCorrupted(e.to_string())
    }
}

impl From<PlayerError> for ControllerError {
    fn from(e: PlayerError) -> Self {
        ControllerError::Player(e.to_string())
    }
}
