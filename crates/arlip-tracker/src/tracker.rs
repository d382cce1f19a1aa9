//! Poster tracker.

use std::collections::HashMap;
use std::time::Instant;

use tracing::{debug, info, warn};

use arlip_models::{PosterId, PosterTrackingStatus, ReferencePoster, TrackedPoster};

use crate::config::TrackerConfig;
use crate::error::{TrackerError, TrackerResult};
use crate::frame::{FrameSignal, ImageUpdate};
use crate::overlay::OverlayTrackingState;

/// Event emitted by the tracker while processing frames.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackerEvent {
    /// A poster was recognized for the first time in this scan
    PosterDetected { id: PosterId, name: String },
    /// The tracked poster produced another tracking frame
    PosterTracking { id: PosterId },
    /// The tracking run crossed the stability threshold
    PosterStable { id: PosterId },
    /// The tracked poster transitioned out of tracking
    PosterLost { id: PosterId },
    /// The lost run crossed the deactivation threshold
    OverlayDeactivated { id: PosterId },
    /// No poster was detected within the detection timeout
    DetectionTimeout,
}

/// Result of processing one frame.
#[derive(Debug, Clone, Default)]
pub struct FrameOutcome {
    /// The poster currently tracked, if any
    pub tracked: Option<TrackedPoster>,
    /// Events emitted this frame, in order
    pub events: Vec<TrackerEvent>,
}

/// The poster currently being tracked, with its derived overlay state.
struct ActiveTrack {
    fingerprint: String,
    poster: TrackedPoster,
    overlay: OverlayTrackingState,
    stable_reported: bool,
}

/// Converts per-frame AR tracking signals into a single authoritative
/// "currently tracked poster" decision.
///
/// Single-poster mode: once a poster is tracked, updates for any other
/// reference image are ignored until the current one is lost or the scan is
/// refreshed.
pub struct PosterTracker {
    config: TrackerConfig,
    index: HashMap<String, ReferencePoster>,
    active: Option<ActiveTrack>,
    detection_deadline: Option<Instant>,
    initialized: bool,
}

impl PosterTracker {
    /// Create a tracker with the given configuration.
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            index: HashMap::new(),
            active: None,
            detection_deadline: None,
            initialized: false,
        }
    }

    /// Load the reference poster set and arm the detection timeout.
    ///
    /// Posters without a human face are filtered out; fails if none remain.
    pub fn initialize(&mut self, posters: &[ReferencePoster]) -> TrackerResult<()> {
        let eligible: HashMap<String, ReferencePoster> = posters
            .iter()
            .filter(|p| p.has_human_face)
            .map(|p| (p.image_fingerprint.clone(), p.clone()))
            .collect();

        if eligible.is_empty() {
            return Err(TrackerError::NoEligiblePosters);
        }

        info!(
            posters = eligible.len(),
            filtered = posters.len() - eligible.len(),
            "Poster tracker initialized"
        );

        self.index = eligible;
        self.active = None;
        self.detection_deadline = Some(Instant::now() + self.config.detection_timeout);
        self.initialized = true;
        Ok(())
    }

    /// Process one frame of AR tracking signals.
    ///
    /// Called once per rendered frame on the frame-delivery thread; performs
    /// no I/O and takes no locks.
    pub fn process_frame(&mut self, frame: &FrameSignal) -> FrameOutcome {
        self.process_frame_at(frame, Instant::now())
    }

    /// Frame processing with an injectable clock, used by the timeout tests.
    pub(crate) fn process_frame_at(&mut self, frame: &FrameSignal, now: Instant) -> FrameOutcome {
        let mut events = Vec::new();

        if !self.initialized {
            debug!("process_frame called before initialize, ignoring");
            return FrameOutcome::default();
        }

        match self.active.take() {
            Some(active) => self.advance_active(active, frame, now, &mut events),
            None => self.scan_for_poster(frame, &mut events),
        }

        if self.active.is_none() {
            if let Some(deadline) = self.detection_deadline {
                if now >= deadline {
                    warn!("No poster detected within detection timeout");
                    events.push(TrackerEvent::DetectionTimeout);
                    // Re-arm so a later scan can still succeed or time out again.
                    self.detection_deadline = Some(now + self.config.detection_timeout);
                }
            }
        }

        FrameOutcome {
            tracked: self.active.as_ref().map(|a| a.poster.clone()),
            events,
        }
    }

    /// Advance the currently tracked poster by one frame.
    fn advance_active(
        &mut self,
        mut active: ActiveTrack,
        frame: &FrameSignal,
        now: Instant,
        events: &mut Vec<TrackerEvent>,
    ) {
        // The AR session only reports recognized images; absence counts as a
        // non-tracking frame.
        let update = frame
            .updates
            .iter()
            .find(|u| u.fingerprint == active.fingerprint);
        let status = update.map_or(PosterTrackingStatus::Paused, |u| u.status);

        match (status, update) {
            (PosterTrackingStatus::Tracking, Some(u)) => {
                active.poster.anchor_handle = u.anchor_handle;
                active.poster.extent_x = u.extent_x;
                active.poster.extent_z = u.extent_z;
                active.poster.tracking_state = PosterTrackingStatus::Tracking;
                active.overlay = active.overlay.advance(true, frame.timestamp_ms);

                events.push(TrackerEvent::PosterTracking {
                    id: active.poster.id.clone(),
                });
                if !active.stable_reported
                    && active.overlay.is_stable(self.config.stable_frame_threshold)
                {
                    active.stable_reported = true;
                    events.push(TrackerEvent::PosterStable {
                        id: active.poster.id.clone(),
                    });
                }
                self.active = Some(active);
            }
            (PosterTrackingStatus::Stopped, _) => {
                if active.overlay.is_tracking {
                    events.push(TrackerEvent::PosterLost {
                        id: active.poster.id.clone(),
                    });
                }
                info!(poster_id = %active.poster.id, "Tracking stopped");
                self.detection_deadline = Some(now + self.config.detection_timeout);
            }
            _ => {
                if active.overlay.is_tracking {
                    events.push(TrackerEvent::PosterLost {
                        id: active.poster.id.clone(),
                    });
                }
                active.poster.tracking_state = PosterTrackingStatus::Paused;
                active.overlay = active.overlay.advance(false, frame.timestamp_ms);
                active.stable_reported = false;

                if active
                    .overlay
                    .should_deactivate(self.config.lost_frame_threshold)
                {
                    info!(poster_id = %active.poster.id, "Overlay deactivated after prolonged loss");
                    events.push(TrackerEvent::OverlayDeactivated {
                        id: active.poster.id.clone(),
                    });
                    self.detection_deadline = Some(now + self.config.detection_timeout);
                } else {
                    self.active = Some(active);
                }
            }
        }
    }

    /// Look for a newly trackable poster among this frame's updates.
    fn scan_for_poster(&mut self, frame: &FrameSignal, events: &mut Vec<TrackerEvent>) {
        for update in &frame.updates {
            if update.status != PosterTrackingStatus::Tracking {
                continue;
            }
            let Some(reference) = self.index.get(&update.fingerprint) else {
                continue;
            };

            info!(poster_id = %reference.id, name = %reference.name, "Poster detected");
            events.push(TrackerEvent::PosterDetected {
                id: reference.id.clone(),
                name: reference.name.clone(),
            });

            self.active = Some(ActiveTrack {
                fingerprint: update.fingerprint.clone(),
                poster: tracked_from(reference, update),
                overlay: OverlayTrackingState::detected(
                    reference.id.clone(),
                    update.anchor_handle,
                    frame.timestamp_ms,
                ),
                stable_reported: false,
            });
            self.detection_deadline = None;
            return;
        }
    }

    /// Abandon the current poster and restart the scan.
    ///
    /// This is the only way to voluntarily drop a poster that is still
    /// tracking. Detaches the anchor, resets the detection timer, and emits
    /// `PosterLost` for the poster that was active, if any.
    pub fn refresh_scan(&mut self) -> Vec<TrackerEvent> {
        let mut events = Vec::new();
        if let Some(active) = self.active.take() {
            info!(poster_id = %active.poster.id, "Refresh scan: dropping tracked poster");
            events.push(TrackerEvent::PosterLost {
                id: active.poster.id,
            });
        }
        self.detection_deadline = Some(Instant::now() + self.config.detection_timeout);
        events
    }

    /// Anchor handle of the currently tracked poster.
    pub fn current_anchor(&self) -> Option<u64> {
        self.active.as_ref().map(|a| a.poster.anchor_handle)
    }

    /// The currently tracked poster.
    pub fn current_poster(&self) -> Option<&TrackedPoster> {
        self.active.as_ref().map(|a| &a.poster)
    }

    /// Overlay state of the currently tracked poster.
    pub fn current_overlay(&self) -> Option<&OverlayTrackingState> {
        self.active.as_ref().map(|a| &a.overlay)
    }

    /// Tear down all tracking state.
    pub fn release(&mut self) {
        self.index.clear();
        self.active = None;
        self.detection_deadline = None;
        self.initialized = false;
    }
}

fn tracked_from(reference: &ReferencePoster, update: &ImageUpdate) -> TrackedPoster {
    TrackedPoster {
        id: reference.id.clone(),
        name: reference.name.clone(),
        anchor_handle: update.anchor_handle,
        tracking_state: PosterTrackingStatus::Tracking,
        extent_x: update.extent_x,
        extent_z: update.extent_z,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn poster(id: &str, fingerprint: &str, has_face: bool) -> ReferencePoster {
        ReferencePoster {
            id: PosterId::from(id),
            name: format!("Poster {id}"),
            image_fingerprint: fingerprint.to_string(),
            physical_width_meters: 0.6,
            has_human_face: has_face,
        }
    }

    fn tracking_update(fingerprint: &str) -> ImageUpdate {
        ImageUpdate {
            fingerprint: fingerprint.to_string(),
            anchor_handle: 42,
            status: PosterTrackingStatus::Tracking,
            extent_x: 0.6,
            extent_z: 0.9,
        }
    }

    fn frame_with(ts: u64, updates: Vec<ImageUpdate>) -> FrameSignal {
        FrameSignal {
            timestamp_ms: ts,
            updates,
        }
    }

    fn tracker_with(posters: &[ReferencePoster]) -> PosterTracker {
        let mut tracker = PosterTracker::new(TrackerConfig::default());
        tracker.initialize(posters).unwrap();
        tracker
    }

    #[test]
    fn test_initialize_rejects_faceless_set() {
        let mut tracker = PosterTracker::new(TrackerConfig::default());
        let err = tracker
            .initialize(&[poster("p1", "fp1", false), poster("p2", "fp2", false)])
            .unwrap_err();
        assert!(matches!(err, TrackerError::NoEligiblePosters));
    }

    #[test]
    fn test_faceless_poster_never_tracked() {
        let mut tracker = tracker_with(&[poster("p1", "fp1", true), poster("p2", "fp2", false)]);

        let outcome = tracker.process_frame(&frame_with(0, vec![tracking_update("fp2")]));
        assert!(outcome.tracked.is_none());
        assert!(outcome.events.is_empty());
    }

    #[test]
    fn test_first_detection_emits_event() {
        let mut tracker = tracker_with(&[poster("p1", "fp1", true)]);

        let outcome = tracker.process_frame(&frame_with(0, vec![tracking_update("fp1")]));
        let tracked = outcome.tracked.unwrap();
        assert_eq!(tracked.id, PosterId::from("p1"));
        assert_eq!(tracked.anchor_handle, 42);
        assert!(matches!(
            outcome.events[0],
            TrackerEvent::PosterDetected { .. }
        ));
        assert_eq!(tracker.current_anchor(), Some(42));
    }

    #[test]
    fn test_single_poster_mode_ignores_others() {
        let mut tracker = tracker_with(&[poster("p1", "fp1", true), poster("p2", "fp2", true)]);

        tracker.process_frame(&frame_with(0, vec![tracking_update("fp1")]));

        // p2 tracking while p1 is active: ignored, p1 counted as lost frame.
        let outcome = tracker.process_frame(&frame_with(16, vec![tracking_update("fp2")]));
        let tracked = outcome.tracked.unwrap();
        assert_eq!(tracked.id, PosterId::from("p1"));
        assert!(outcome
            .events
            .iter()
            .all(|e| !matches!(e, TrackerEvent::PosterDetected { .. })));
    }

    #[test]
    fn test_lost_emitted_on_pause_transition_only() {
        let mut tracker = tracker_with(&[poster("p1", "fp1", true)]);
        tracker.process_frame(&frame_with(0, vec![tracking_update("fp1")]));

        let mut update = tracking_update("fp1");
        update.status = PosterTrackingStatus::Paused;

        let outcome = tracker.process_frame(&frame_with(16, vec![update.clone()]));
        assert_eq!(
            outcome.events,
            vec![TrackerEvent::PosterLost {
                id: PosterId::from("p1")
            }]
        );

        // Still paused: no second lost event.
        let outcome = tracker.process_frame(&frame_with(33, vec![update]));
        assert!(outcome.events.is_empty());
        assert!(outcome.tracked.is_some());
    }

    #[test]
    fn test_stopped_clears_state() {
        let mut tracker = tracker_with(&[poster("p1", "fp1", true)]);
        tracker.process_frame(&frame_with(0, vec![tracking_update("fp1")]));

        let mut update = tracking_update("fp1");
        update.status = PosterTrackingStatus::Stopped;

        let outcome = tracker.process_frame(&frame_with(16, vec![update]));
        assert!(outcome.tracked.is_none());
        assert!(outcome
            .events
            .contains(&TrackerEvent::PosterLost {
                id: PosterId::from("p1")
            }));
        assert_eq!(tracker.current_anchor(), None);
    }

    #[test]
    fn test_stable_after_threshold_frames() {
        let mut tracker = tracker_with(&[poster("p1", "fp1", true)]);

        let mut stable_seen = false;
        for i in 0..30u64 {
            let outcome =
                tracker.process_frame(&frame_with(i * 16, vec![tracking_update("fp1")]));
            let stable_now = outcome
                .events
                .iter()
                .any(|e| matches!(e, TrackerEvent::PosterStable { .. }));
            if i < 29 {
                assert!(!stable_now, "stable emitted too early at frame {i}");
            }
            stable_seen |= stable_now;
        }
        assert!(stable_seen, "stable not emitted after 30 tracking frames");
    }

    #[test]
    fn test_deactivation_after_lost_threshold() {
        let mut tracker = tracker_with(&[poster("p1", "fp1", true)]);
        tracker.process_frame(&frame_with(0, vec![tracking_update("fp1")]));

        // 299 empty frames: still bridged.
        for i in 0..299u64 {
            let outcome = tracker.process_frame(&FrameSignal::empty(16 + i * 16));
            assert!(
                !outcome
                    .events
                    .iter()
                    .any(|e| matches!(e, TrackerEvent::OverlayDeactivated { .. })),
                "deactivated too early at lost frame {}",
                i + 1
            );
        }
        assert!(tracker.current_poster().is_some());

        // Frame 300 deactivates.
        let outcome = tracker.process_frame(&FrameSignal::empty(5000));
        assert!(outcome
            .events
            .contains(&TrackerEvent::OverlayDeactivated {
                id: PosterId::from("p1")
            }));
        assert!(outcome.tracked.is_none());
    }

    #[test]
    fn test_refresh_scan_abandons_tracking_poster() {
        let mut tracker = tracker_with(&[poster("p1", "fp1", true)]);
        tracker.process_frame(&frame_with(0, vec![tracking_update("fp1")]));

        let events = tracker.refresh_scan();
        assert_eq!(
            events,
            vec![TrackerEvent::PosterLost {
                id: PosterId::from("p1")
            }]
        );
        assert_eq!(tracker.current_anchor(), None);

        // A fresh detection works afterwards.
        let outcome = tracker.process_frame(&frame_with(16, vec![tracking_update("fp1")]));
        assert!(outcome.tracked.is_some());
    }

    #[test]
    fn test_refresh_scan_without_poster_is_quiet() {
        let mut tracker = tracker_with(&[poster("p1", "fp1", true)]);
        assert!(tracker.refresh_scan().is_empty());
    }

    #[test]
    fn test_detection_timeout_fires_once_then_rearms() {
        let mut tracker = tracker_with(&[poster("p1", "fp1", true)]);
        let start = Instant::now();

        let outcome = tracker.process_frame_at(&FrameSignal::empty(0), start + Duration::from_secs(9));
        assert!(outcome.events.is_empty());

        let outcome =
            tracker.process_frame_at(&FrameSignal::empty(16), start + Duration::from_secs(11));
        assert_eq!(outcome.events, vec![TrackerEvent::DetectionTimeout]);

        // Timer re-armed: no immediate second timeout.
        let outcome =
            tracker.process_frame_at(&FrameSignal::empty(33), start + Duration::from_secs(12));
        assert!(outcome.events.is_empty());

        // But a second full interval fires again.
        let outcome =
            tracker.process_frame_at(&FrameSignal::empty(50), start + Duration::from_secs(22));
        assert_eq!(outcome.events, vec![TrackerEvent::DetectionTimeout]);
    }

    #[test]
    fn test_detection_disarms_timeout() {
        let mut tracker = tracker_with(&[poster("p1", "fp1", true)]);
        let start = Instant::now();

        tracker.process_frame_at(&frame_with(0, vec![tracking_update("fp1")]), start);

        let outcome =
            tracker.process_frame_at(&frame_with(16, vec![tracking_update("fp1")]), start + Duration::from_secs(60));
        assert!(!outcome.events.contains(&TrackerEvent::DetectionTimeout));
    }

    #[test]
    fn test_release_resets() {
        let mut tracker = tracker_with(&[poster("p1", "fp1", true)]);
        tracker.process_frame(&frame_with(0, vec![tracking_update("fp1")]));

        tracker.release();
        assert_eq!(tracker.current_anchor(), None);

        let outcome = tracker.process_frame(&frame_with(16, vec![tracking_update("fp1")]));
        assert!(outcome.tracked.is_none());
    }
}
