//! Shared data models for the AR talking-poster core.
//!
//! This crate provides Serde-serializable types for:
//! - Poster and video identifiers
//! - Reference and tracked posters
//! - Lip region coordinates
//! - Generation job status
//! - The talking-photo lifecycle state

pub mod ids;
pub mod lip;
pub mod poster;
pub mod state;
pub mod status;

// Re-export common types
pub use ids::{PosterId, VideoId};
pub use lip::{CoordinateError, LipCoordinates};
pub use poster::{PosterTrackingStatus, ReferencePoster, TrackedPoster};
pub use state::TalkingPhotoState;
pub use status::{GenerationStatus, LipSyncRequest, StatusResponse};
