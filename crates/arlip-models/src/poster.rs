//! Reference and tracked poster models.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::PosterId;

/// A poster registered with the AR session at start.
///
/// Loaded once from the poster source and immutable afterwards. Only posters
/// with `has_human_face == true` are eligible for lip-sync tracking.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReferencePoster {
    /// Unique poster ID
    pub id: PosterId,

    /// Human-readable poster name
    pub name: String,

    /// Fingerprint of the reference image, used as the matcher handle
    pub image_fingerprint: String,

    /// Physical width of the printed poster in meters
    pub physical_width_meters: f64,

    /// Whether the poster contains a human face
    pub has_human_face: bool,
}

/// Tri-state tracking status reported by the AR frame signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PosterTrackingStatus {
    /// Pose is being actively tracked
    Tracking,
    /// Tracking temporarily interrupted (occlusion, motion blur)
    Paused,
    /// Tracking has ended
    Stopped,
}

impl PosterTrackingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PosterTrackingStatus::Tracking => "tracking",
            PosterTrackingStatus::Paused => "paused",
            PosterTrackingStatus::Stopped => "stopped",
        }
    }
}

impl fmt::Display for PosterTrackingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-frame snapshot of the poster currently being tracked.
///
/// Created on first detection, replaced each frame while tracked, and
/// discarded when tracking stops.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TrackedPoster {
    /// Poster ID
    pub id: PosterId,

    /// Poster name
    pub name: String,

    /// Opaque handle to the spatial anchor tying content to the pose
    pub anchor_handle: u64,

    /// Current tracking status
    pub tracking_state: PosterTrackingStatus,

    /// Tracked extent along the X axis in meters
    pub extent_x: f64,

    /// Tracked extent along the Z axis in meters
    pub extent_z: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracking_status_serde() {
        let json = serde_json::to_string(&PosterTrackingStatus::Paused).unwrap();
        assert_eq!(json, "\"paused\"");
    }

    #[test]
    fn test_status_display() {
        assert_eq!(PosterTrackingStatus::Tracking.to_string(), "tracking");
        assert_eq!(PosterTrackingStatus::Stopped.to_string(), "stopped");
    }
}
