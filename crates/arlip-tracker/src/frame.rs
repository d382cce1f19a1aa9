//! Per-frame AR tracking signals.

use serde::{Deserialize, Serialize};

use arlip_models::PosterTrackingStatus;

/// One tracking update for a recognized reference image.
///
/// The AR session delivers at most one of these per recognized image per
/// rendered frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageUpdate {
    /// Matcher handle: fingerprint of the recognized reference image
    pub fingerprint: String,

    /// Opaque spatial anchor handle for this image's pose
    pub anchor_handle: u64,

    /// Tri-state tracking status for this frame
    pub status: PosterTrackingStatus,

    /// Tracked extent along the X axis in meters
    pub extent_x: f64,

    /// Tracked extent along the Z axis in meters
    pub extent_z: f64,
}

/// The tracking signal for a single rendered frame.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrameSignal {
    /// Frame timestamp in milliseconds since session start
    pub timestamp_ms: u64,

    /// Updates for every reference image recognized this frame
    pub updates: Vec<ImageUpdate>,
}

impl FrameSignal {
    /// A frame with no recognized images.
    pub fn empty(timestamp_ms: u64) -> Self {
        Self {
            timestamp_ms,
            updates: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_signal_deserializes() {
        let json = r#"{
            "timestamp_ms": 160,
            "updates": [{
                "fingerprint": "fp-1",
                "anchor_handle": 42,
                "status": "tracking",
                "extent_x": 0.6,
                "extent_z": 0.9
            }]
        }"#;
        let frame: FrameSignal = serde_json::from_str(json).unwrap();
        assert_eq!(frame.updates.len(), 1);
        assert_eq!(frame.updates[0].status, PosterTrackingStatus::Tracking);
    }
}

