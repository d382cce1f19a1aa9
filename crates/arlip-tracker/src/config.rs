//! Tracker configuration.

use std::time::Duration;

/// Consecutive tracking frames before a poster counts as stable (~0.5 s at 60 fps).
pub const STABLE_FRAME_THRESHOLD: u32 = 30;

/// Consecutive lost frames before the overlay is deactivated (~5 s at 60 fps).
pub const LOST_FRAME_THRESHOLD: u32 = 300;

/// How long a scan may run without any detection before timing out.
pub const DETECTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Tracker configuration.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Consecutive tracking frames required for stability
    pub stable_frame_threshold: u32,
    /// Consecutive lost frames before overlay deactivation
    pub lost_frame_threshold: u32,
    /// Detection timeout for a scan that never finds a poster
    pub detection_timeout: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            stable_frame_threshold: STABLE_FRAME_THRESHOLD,
            lost_frame_threshold: LOST_FRAME_THRESHOLD,
            detection_timeout: DETECTION_TIMEOUT,
        }
    }
}

impl TrackerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            stable_frame_threshold: std::env::var("TRACKER_STABLE_FRAMES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(STABLE_FRAME_THRESHOLD),
            lost_frame_threshold: std::env::var("TRACKER_LOST_FRAMES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(LOST_FRAME_THRESHOLD),
            detection_timeout: Duration::from_secs(
                std::env::var("TRACKER_DETECTION_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DETECTION_TIMEOUT.as_secs()),
            ),
        }
    }
}
