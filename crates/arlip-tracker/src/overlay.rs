//! Overlay tracking state transition.
//!
//! `OverlayTrackingState` is derived each frame from the previous state and
//! the frame's tracking boolean. Keeping it a pure `(prev, signal) -> next`
//! function makes the flicker thresholds unit-testable without a live AR
//! session.

use serde::{Deserialize, Serialize};

use arlip_models::PosterId;

/// Derived per-frame tracking state for the poster overlay.
///
/// Invariant: at most one of `consecutive_tracking_frames` /
/// `consecutive_lost_frames` is nonzero. The run counters are mutually
/// exclusive and reset when the tracking boolean flips.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayTrackingState {
    /// Poster this overlay belongs to
    pub image_id: PosterId,

    /// Anchor handle the overlay is attached to
    pub anchor_id: u64,

    /// Whether the poster tracked this frame
    pub is_tracking: bool,

    /// Timestamp of the frame that produced this state
    pub last_update_timestamp_ms: u64,

    /// Length of the current tracking run
    pub consecutive_tracking_frames: u32,

    /// Length of the current lost run
    pub consecutive_lost_frames: u32,
}

impl OverlayTrackingState {
    /// State for the frame a poster is first detected on.
    pub fn detected(image_id: PosterId, anchor_id: u64, timestamp_ms: u64) -> Self {
        Self {
            image_id,
            anchor_id,
            is_tracking: true,
            last_update_timestamp_ms: timestamp_ms,
            consecutive_tracking_frames: 1,
            consecutive_lost_frames: 0,
        }
    }

    /// Derive the next state from this one and the current frame's signal.
    pub fn advance(&self, is_tracking: bool, timestamp_ms: u64) -> Self {
        let (tracking_run, lost_run) = if is_tracking {
            (self.consecutive_tracking_frames.saturating_add(1), 0)
        } else {
            (0, self.consecutive_lost_frames.saturating_add(1))
        };

        Self {
            image_id: self.image_id.clone(),
            anchor_id: self.anchor_id,
            is_tracking,
            last_update_timestamp_ms: timestamp_ms,
            consecutive_tracking_frames: tracking_run,
            consecutive_lost_frames: lost_run,
        }
    }

    /// Whether the tracking run has reached the stability threshold.
    pub fn is_stable(&self, stable_frame_threshold: u32) -> bool {
        self.consecutive_tracking_frames >= stable_frame_threshold
    }

    /// Whether the lost run is long enough to deactivate the overlay, even if
    /// the AR session has not reported a stop yet.
    pub fn should_deactivate(&self, lost_frame_threshold: u32) -> bool {
        self.consecutive_lost_frames >= lost_frame_threshold
    }
}
