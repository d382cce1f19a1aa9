//! Callback interface to the UI layer.

use arlip_models::TalkingPhotoState;

use crate::error::ControllerError;

/// Observer for session lifecycle events.
///
/// All methods default to no-ops so UI adapters implement only what they
/// render. Callbacks fire on the task driving the controller; keep them
/// cheap.
pub trait TalkingPhotoEvents: Send + Sync {
    /// The lifecycle state changed.
    fn on_state_changed(&self, _from: TalkingPhotoState, _to: TalkingPhotoState) {}

    /// Progress within the current state, fraction in `[0, 1]`.
    /// Currently reported for downloads.
    fn on_progress(&self, _state: TalkingPhotoState, _fraction: f64) {}

    /// The video is loaded and playable.
    fn on_ready(&self) {}

    /// The session failed; `error` carries the classification and a
    /// suggested user action.
    fn on_error(&self, _error: &ControllerError) {}
}

/// Events sink that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEvents;

impl TalkingPhotoEvents for NoopEvents {}
