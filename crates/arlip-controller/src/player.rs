//! External playback collaborator interface.

use std::path::Path;

use thiserror::Error;

use arlip_models::{LipCoordinates, TrackedPoster};

/// Error reported by the playback collaborator.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct PlayerError(pub String);

impl PlayerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// The video-playback collaborator the controller drives.
///
/// Implemented by a thin adapter over the platform decoder outside the core.
/// Methods are synchronous; implementations must not block the caller for
/// long operations (decode readiness is reported via playback callbacks on
/// the adapter's side).
#[cfg_attr(test, mockall::automock)]
pub trait VideoPlayer: Send + Sync {
    /// Load a video file and the lip region to render it into.
    fn load(&self, path: &Path, lip: &LipCoordinates) -> Result<(), PlayerError>;

    /// Start or resume playback.
    fn play(&self) -> Result<(), PlayerError>;

    /// Pause playback, keeping position.
    fn pause(&self) -> Result<(), PlayerError>;

    /// Stop playback and unload the video.
    fn stop(&self);

    /// Seek to an absolute position in seconds.
    fn seek_to(&self, position_secs: f64) -> Result<(), PlayerError>;

    /// Current playback position in seconds.
    fn current_position(&self) -> f64;

    /// Update the rendered overlay from the tracked poster's pose.
    fn update_pose(&self, poster: &TrackedPoster);
}
