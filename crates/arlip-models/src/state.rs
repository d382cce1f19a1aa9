//! Talking-photo lifecycle state.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a talking-photo session.
///
/// Normal flow: `Idle → FetchingVideo → Generating → Downloading → Ready →
/// Playing ⇄ Paused`. A cache hit skips `Generating`/`Downloading`. `Error`
/// is reachable from every other state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum TalkingPhotoState {
    /// No session active
    #[default]
    Idle,
    /// Cache lookup in progress
    FetchingVideo,
    /// Remote generation submitted or polling
    Generating,
    /// Video bytes being transferred
    Downloading,
    /// Video loaded into the player
    Ready,
    /// Playback running
    Playing,
    /// Playback paused (poster lost or user pause)
    Paused,
    /// Session failed
    Error,
}

impl TalkingPhotoState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TalkingPhotoState::Idle => "idle",
            TalkingPhotoState::FetchingVideo => "fetching_video",
            TalkingPhotoState::Generating => "generating",
            TalkingPhotoState::Downloading => "downloading",
            TalkingPhotoState::Ready => "ready",
            TalkingPhotoState::Playing => "playing",
            TalkingPhotoState::Paused => "paused",
            TalkingPhotoState::Error => "error",
        }
    }

    /// Whether a transition to `next` is legal.
    pub fn can_transition_to(&self, next: TalkingPhotoState) -> bool {
        use TalkingPhotoState::*;
        if next == Error {
            return true;
        }
        matches!(
            (self, next),
            (Idle, FetchingVideo)
                | (FetchingVideo, Generating)
                | (FetchingVideo, Ready)
                | (Generating, Downloading)
                | (Downloading, Ready)
                | (Ready, Playing)
                | (Playing, Paused)
                | (Paused, Playing)
                | (Playing, Ready)
                | (Paused, Ready)
                | (Error, Idle)
                | (Ready, Idle)
                | (Playing, Idle)
                | (Paused, Idle)
        )
    }

    /// Whether the session holds a loaded video.
    pub fn has_video(&self) -> bool {
        matches!(
            self,
            TalkingPhotoState::Ready | TalkingPhotoState::Playing | TalkingPhotoState::Paused
        )
    }
}

impl fmt::Display for TalkingPhotoState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use TalkingPhotoState::*;

    #[test]
    fn test_happy_path_transitions() {
        assert!(Idle.can_transition_to(FetchingVideo));
        assert!(FetchingVideo.can_transition_to(Generating));
        assert!(Generating.can_transition_to(Downloading));
        assert!(Downloading.can_transition_to(Ready));
        assert!(Ready.can_transition_to(Playing));
        assert!(Playing.can_transition_to(Paused));
        assert!(Paused.can_transition_to(Playing));
    }

    #[test]
    fn test_cache_hit_skips_generation() {
        assert!(FetchingVideo.can_transition_to(Ready));
        assert!(!FetchingVideo.can_transition_to(Downloading));
    }

    #[test]
    fn test_error_reachable_from_all() {
        for state in [
            Idle,
            FetchingVideo,
            Generating,
            Downloading,
            Ready,
            Playing,
            Paused,
        ] {
            assert!(state.can_transition_to(Error), "{state} -> error");
        }
    }

    #[test]
    fn test_illegal_transitions() {
        assert!(!Idle.can_transition_to(Playing));
        assert!(!Generating.can_transition_to(Ready));
        assert!(!Downloading.can_transition_to(Playing));
        assert!(!Paused.can_transition_to(Generating));
    }

    #[test]
    fn test_has_video() {
        assert!(Ready.has_video());
        assert!(Playing.has_video());
        assert!(Paused.has_video());
        assert!(!Generating.has_video());
    }
}
