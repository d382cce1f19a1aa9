//! Talking-photo session controller.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, warn};

use arlip_cache::{CacheError, VideoCache};
use arlip_client::{CancelToken, FetchError, LipSyncClient, LipSyncClientConfig};
use arlip_models::{
    LipCoordinates, LipSyncRequest, PosterId, ReferencePoster, TalkingPhotoState,
};
use arlip_tracker::{FrameOutcome, TrackerEvent};

use crate::error::{ControllerError, ControllerResult};
use crate::events::TalkingPhotoEvents;
use crate::player::VideoPlayer;

/// Controller configuration.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Generation service client settings
    pub client: LipSyncClientConfig,
    /// Staging directory for in-flight downloads before they enter the cache
    pub work_dir: PathBuf,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            client: LipSyncClientConfig::default(),
            work_dir: std::env::temp_dir().join("arlip-downloads"),
        }
    }
}

impl ControllerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            client: LipSyncClientConfig::from_env(),
            work_dir: std::env::var("ARLIP_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| std::env::temp_dir().join("arlip-downloads")),
        }
    }
}

/// One poster session's handles.
struct Session {
    poster_id: PosterId,
    cancel: CancelToken,
}

/// Orchestrates tracker signals, video fetching, the cache, and the external
/// player into the talking-photo lifecycle.
///
/// State is mutated from one logical task per session. Starting a new session
/// cancels the previous session's in-flight fetch before touching the cache,
/// so two sessions never write the same cache key concurrently.
pub struct TalkingPhotoController {
    config: ControllerConfig,
    cache: Arc<VideoCache>,
    player: Arc<dyn VideoPlayer>,
    events: Arc<dyn TalkingPhotoEvents>,
    state: TalkingPhotoState,
    session: Option<Session>,
}

impl TalkingPhotoController {
    pub fn new(
        config: ControllerConfig,
        cache: Arc<VideoCache>,
        player: Arc<dyn VideoPlayer>,
        events: Arc<dyn TalkingPhotoEvents>,
    ) -> Self {
        Self {
            config,
            cache,
            player,
            events,
            state: TalkingPhotoState::Idle,
            session: None,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> TalkingPhotoState {
        self.state
    }

    /// Poster of the active session, if any.
    pub fn current_poster(&self) -> Option<&PosterId> {
        self.session.as_ref().map(|s| &s.poster_id)
    }

    /// Start a talking-photo session for a detected poster.
    ///
    /// Cancels any prior session first. On a cache hit the video goes
    /// straight to the player and the state jumps to `Ready`; on a miss the
    /// full generate → poll → download → store pipeline runs. Any failure
    /// moves to `Error` and is reported through the events callback; no
    /// retries beyond what the client performs internally.
    pub async fn initialize(
        &mut self,
        poster: &ReferencePoster,
        script: &str,
        voice_id: Option<&str>,
    ) -> ControllerResult<()> {
        self.reset().await;

        if !poster.has_human_face {
            return Err(self.fail(ControllerError::NoHumanFace(poster.id.as_str().to_string())));
        }

        let cancel = CancelToken::new();
        self.session = Some(Session {
            poster_id: poster.id.clone(),
            cancel: cancel.clone(),
        });

        info!(poster_id = %poster.id, "Starting talking-photo session");
        self.transition(TalkingPhotoState::FetchingVideo)?;

        match self.cache.retrieve(&poster.id).await {
            Ok(entry) => {
                debug!(poster_id = %poster.id, "Cache hit, skipping generation");
                self.load_and_ready(&poster.id, &entry.video_path, &entry.lip_coordinates)
                    .await
            }
            Err(e) if e.is_recoverable() => {
                // Missing, expired, or corrupted entries all mean the same
                // thing here: fetch fresh.
                debug!(poster_id = %poster.id, reason = %e, "Cache miss");
                self.fetch_and_ready(poster, script, voice_id, cancel).await
            }
            Err(e) => Err(self.fail(e.into())),
        }
    }

    /// Run the generate → poll → download → store pipeline.
    async fn fetch_and_ready(
        &mut self,
        poster: &ReferencePoster,
        script: &str,
        voice_id: Option<&str>,
        cancel: CancelToken,
    ) -> ControllerResult<()> {
        self.transition(TalkingPhotoState::Generating)?;

        let client = LipSyncClient::with_cancel_token(self.config.client.clone(), cancel)
            .map_err(|e| self.fail(e.into()))?;

        let mut request = LipSyncRequest::new(poster.id.clone(), script);
        if let Some(voice) = voice_id {
            request = request.with_voice(voice);
        }
        let status = match self.generate_and_poll(&client, &request).await {
            Ok(status) => status,
            Err(e) => return Err(self.fail(e.into())),
        };

        let video_url = status
            .video_url
            .ok_or_else(|| self.fail(ControllerError::GenerationFailed(
                "status response missing video URL".to_string(),
            )))?;
        let lip = status
            .lip_coordinates
            .ok_or_else(|| self.fail(ControllerError::InvalidCoordinates(
                "status response missing lip coordinates".to_string(),
            )))?;
        let checksum = status
            .checksum
            .ok_or_else(|| self.fail(ControllerError::GenerationFailed(
                "status response missing checksum".to_string(),
            )))?;

        self.transition(TalkingPhotoState::Downloading)?;

        let dest = self.config.work_dir.join(format!("{}.mp4", status.video_id));
        let events = Arc::clone(&self.events);
        let downloaded = client
            .download_video(&video_url, &dest, |fraction| {
                events.on_progress(TalkingPhotoState::Downloading, fraction)
            })
            .await
            .map_err(|e| self.fail(e.into()))?;

        let entry = match self
            .cache
            .store(&poster.id, &downloaded, lip, &checksum)
            .await
        {
            Ok(entry) => entry,
            // A checksum mismatch at store time means the transfer was
            // corrupted, not the cache.
            Err(CacheError::ChecksumMismatch { expected, actual, .. }) => {
                return Err(self.fail(ControllerError::DownloadFailed(format!(
                    "checksum mismatch: expected {expected}, got {actual}"
                ))));
            }
            Err(e) => return Err(self.fail(e.into())),
        };

        self.load_and_ready(&poster.id, &entry.video_path, &entry.lip_coordinates)
            .await
    }

    async fn generate_and_poll(
        &self,
        client: &LipSyncClient,
        request: &LipSyncRequest,
    ) -> Result<arlip_models::StatusResponse, FetchError> {
        let video_id = client.generate_lip_sync(request).await?;
        client.poll_until_complete(&video_id).await
    }

    /// Hand the cached file to the player, pin it, and go `Ready`.
    async fn load_and_ready(
        &mut self,
        poster_id: &PosterId,
        video_path: &std::path::Path,
        lip: &LipCoordinates,
    ) -> ControllerResult<()> {
        if let Err(e) = self.player.load(video_path, lip) {
            return Err(self.fail(e.into()));
        }

        // Pinned entries are skipped by eviction while the player holds the
        // file open. The pin is released on reset/release.
        self.cache.pin(poster_id).await;

        self.transition(TalkingPhotoState::Ready)?;
        self.events.on_ready();
        Ok(())
    }

    /// Feed one frame's tracker outcome into playback control.
    ///
    /// The tracked pose is forwarded to the player; stability flips the
    /// session to `Playing` and loss flips it to `Paused`.
    pub fn update_tracking(&mut self, outcome: &FrameOutcome) {
        if let Some(tracked) = &outcome.tracked {
            if self.state.has_video() {
                self.player.update_pose(tracked);
            }
        }

        for event in &outcome.events {
            match event {
                TrackerEvent::PosterStable { id } => {
                    if self.is_session_poster(id)
                        && matches!(
                            self.state,
                            TalkingPhotoState::Ready | TalkingPhotoState::Paused
                        )
                    {
                        if let Err(e) = self.play() {
                            warn!(error = %e, "Auto-play on stability failed");
                        }
                    }
                }
                TrackerEvent::PosterLost { id } | TrackerEvent::OverlayDeactivated { id } => {
                    if self.is_session_poster(id) && self.state == TalkingPhotoState::Playing {
                        if let Err(e) = self.pause() {
                            warn!(error = %e, "Auto-pause on loss failed");
                        }
                    }
                }
                TrackerEvent::DetectionTimeout => {
                    // No session exists yet, so this is a UI hint rather than
                    // a state transition.
                    self.events.on_error(&ControllerError::PosterNotDetected);
                }
                _ => {}
            }
        }
    }

    /// Start or resume playback. Legal from `Ready` and `Paused`.
    pub fn play(&mut self) -> ControllerResult<()> {
        self.require_video()?;
        if let Err(e) = self.player.play() {
            return Err(self.fail(e.into()));
        }
        self.transition(TalkingPhotoState::Playing)
    }

    /// Pause playback. Legal from `Playing`.
    pub fn pause(&mut self) -> ControllerResult<()> {
        self.require_video()?;
        if let Err(e) = self.player.pause() {
            return Err(self.fail(e.into()));
        }
        self.transition(TalkingPhotoState::Paused)
    }

    /// Stop playback, keeping the video loaded. Legal from `Playing`/`Paused`.
    pub fn stop(&mut self) -> ControllerResult<()> {
        self.require_video()?;
        self.player.stop();
        self.transition(TalkingPhotoState::Ready)
    }

    /// Seek to an absolute position in seconds.
    pub fn seek_to(&mut self, position_secs: f64) -> ControllerResult<()> {
        self.require_video()?;
        self.player.seek_to(position_secs).map_err(Into::into)
    }

    /// Current playback position in seconds.
    pub fn current_position(&self) -> ControllerResult<f64> {
        self.require_video()?;
        Ok(self.player.current_position())
    }

    /// After an error, drop the failed session and return to `Idle`.
    pub async fn acknowledge_error(&mut self) -> ControllerResult<()> {
        if self.state != TalkingPhotoState::Error {
            return Err(ControllerError::InvalidTransition {
                from: self.state,
                to: TalkingPhotoState::Idle,
            });
        }
        self.reset().await;
        Ok(())
    }

    /// Tear down the session: cancel in-flight fetches, stop the player,
    /// release the cache pin. Cache contents stay.
    pub async fn release(&mut self) {
        self.reset().await;
        info!("Talking-photo controller released");
    }

    /// Cancel and unpin the current session, returning to `Idle`.
    async fn reset(&mut self) {
        if let Some(session) = self.session.take() {
            session.cancel.cancel();
            self.cache.unpin(&session.poster_id).await;
        }
        if self.state.has_video() {
            self.player.stop();
        }
        if self.state != TalkingPhotoState::Idle {
            // Session reset bypasses the transition table: it is the one path
            // allowed to abandon an in-flight state.
            let from = self.state;
            self.state = TalkingPhotoState::Idle;
            debug!(from = %from, "Session reset");
            self.events.on_state_changed(from, TalkingPhotoState::Idle);
        }
    }

    fn is_session_poster(&self, id: &PosterId) -> bool {
        self.session.as_ref().is_some_and(|s| &s.poster_id == id)
    }

    fn require_video(&self) -> ControllerResult<()> {
        if self.state.has_video() {
            Ok(())
        } else {
            Err(ControllerError::NoActiveSession)
        }
    }

    /// Move to `next`, enforcing the transition table.
    fn transition(&mut self, next: TalkingPhotoState) -> ControllerResult<()> {
        if !self.state.can_transition_to(next) {
            return Err(ControllerError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        let from = self.state;
        self.state = next;
        debug!(from = %from, to = %next, "State transition");
        self.events.on_state_changed(from, next);
        Ok(())
    }

    /// Record a failure: move to `Error` and report through the callback.
    fn fail(&mut self, error: ControllerError) -> ControllerError {
        warn!(
            error = %error,
            retryable = error.is_retryable(),
            "Session failed"
        );
        let from = self.state;
        self.state = TalkingPhotoState::Error;
        if from != TalkingPhotoState::Error {
            self.events.on_state_changed(from, TalkingPhotoState::Error);
        }
        self.events.on_error(&error);
        error
    }

    #[cfg(test)]
    fn set_state(&mut self, state: TalkingPhotoState) {
        self.state = state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NoopEvents;
    use crate::player::MockVideoPlayer;
    use arlip_cache::CacheConfig;
    use tempfile::TempDir;

    async fn controller_with(player: MockVideoPlayer, dir: &TempDir) -> TalkingPhotoController {
        let cache = VideoCache::new(CacheConfig {
            cache_dir: dir.path().join("cache"),
            ..CacheConfig::default()
        })
        .await
        .unwrap();

        TalkingPhotoController::new(
            ControllerConfig {
                work_dir: dir.path().join("work"),
                ..ControllerConfig::default()
            },
            Arc::new(cache),
            Arc::new(player),
            Arc::new(NoopEvents),
        )
    }

    fn faceless_poster() -> ReferencePoster {
        ReferencePoster {
            id: PosterId::from("p1"),
            name: "Landscape".to_string(),
            image_fingerprint: "fp1".to_string(),
            physical_width_meters: 0.6,
            has_human_face: false,
        }
    }

    #[tokio::test]
    async fn test_initialize_rejects_faceless_poster() {
        let dir = TempDir::new().unwrap();
        let mut controller = controller_with(MockVideoPlayer::new(), &dir).await;

        let err = controller
            .initialize(&faceless_poster(), "hello", None)
            .await
            .unwrap_err();

        assert!(matches!(err, ControllerError::NoHumanFace(_)), "{err}");
        assert_eq!(controller.state(), TalkingPhotoState::Error);
    }

    #[tokio::test]
    async fn test_play_requires_loaded_video() {
        let dir = TempDir::new().unwrap();
        let mut controller = controller_with(MockVideoPlayer::new(), &dir).await;

        let err = controller.play().unwrap_err();
        assert!(matches!(err, ControllerError::NoActiveSession), "{err}");
    }

    #[tokio::test]
    async fn test_play_pause_stop_delegate() {
        let dir = TempDir::new().unwrap();
        let mut player = MockVideoPlayer::new();
        player.expect_play().times(2).returning(|| Ok(()));
        player.expect_pause().times(1).returning(|| Ok(()));
        player.expect_stop().times(1).return_const(());

        let mut controller = controller_with(player, &dir).await;
        controller.set_state(TalkingPhotoState::Ready);

        controller.play().unwrap();
        assert_eq!(controller.state(), TalkingPhotoState::Playing);
        controller.pause().unwrap();
        assert_eq!(controller.state(), TalkingPhotoState::Paused);
        controller.play().unwrap();
        assert_eq!(controller.state(), TalkingPhotoState::Playing);
        controller.stop().unwrap();
        assert_eq!(controller.state(), TalkingPhotoState::Ready);
    }

    #[tokio::test]
    async fn test_seek_and_position_delegate() {
        let dir = TempDir::new().unwrap();
        let mut player = MockVideoPlayer::new();
        player
            .expect_seek_to()
            .withf(|pos| (*pos - 1.5).abs() < f64::EPSILON)
            .times(1)
            .returning(|_| Ok(()));
        player.expect_current_position().return_const(1.5f64);

        let mut controller = controller_with(player, &dir).await;
        controller.set_state(TalkingPhotoState::Playing);

        controller.seek_to(1.5).unwrap();
        assert!((controller.current_position().unwrap() - 1.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_stability_signal_starts_playback() {
        let dir = TempDir::new().unwrap();
        let mut player = MockVideoPlayer::new();
        player.expect_play().times(1).returning(|| Ok(()));
        player.expect_pause().times(1).returning(|| Ok(()));

        let mut controller = controller_with(player, &dir).await;
        controller.set_state(TalkingPhotoState::Ready);
        controller.session = Some(Session {
            poster_id: PosterId::from("p1"),
            cancel: CancelToken::new(),
        });

        controller.update_tracking(&FrameOutcome {
            tracked: None,
            events: vec![TrackerEvent::PosterStable {
                id: PosterId::from("p1"),
            }],
        });
        assert_eq!(controller.state(), TalkingPhotoState::Playing);

        controller.update_tracking(&FrameOutcome {
            tracked: None,
            events: vec![TrackerEvent::PosterLost {
                id: PosterId::from("p1"),
            }],
        });
        assert_eq!(controller.state(), TalkingPhotoState::Paused);
    }

    #[tokio::test]
    async fn test_other_posters_signals_ignored() {
        let dir = TempDir::new().unwrap();
        let mut controller = controller_with(MockVideoPlayer::new(), &dir).await;
        controller.set_state(TalkingPhotoState::Ready);
        controller.session = Some(Session {
            poster_id: PosterId::from("p1"),
            cancel: CancelToken::new(),
        });

        controller.update_tracking(&FrameOutcome {
            tracked: None,
            events: vec![TrackerEvent::PosterStable {
                id: PosterId::from("other"),
            }],
        });
        assert_eq!(controller.state(), TalkingPhotoState::Ready);
    }

    #[tokio::test]
    async fn test_acknowledge_error_returns_to_idle() {
        let dir = TempDir::new().unwrap();
        let mut controller = controller_with(MockVideoPlayer::new(), &dir).await;

        controller
            .initialize(&faceless_poster(), "hello", None)
            .await
            .unwrap_err();
        assert_eq!(controller.state(), TalkingPhotoState::Error);

        controller.acknowledge_error().await.unwrap();
        assert_eq!(controller.state(), TalkingPhotoState::Idle);
    }
}
