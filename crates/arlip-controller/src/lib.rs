//! Talking-photo session orchestration.
//!
//! Ties the poster tracker, generation client, video cache, and an external
//! playback collaborator into one lifecycle state machine:
//! `Idle → FetchingVideo → Generating → Downloading → Ready → Playing ⇄
//! Paused`, with `Error` reachable from every state.

pub mod controller;
pub mod error;
pub mod events;
pub mod logging;
pub mod player;

pub use controller::{ControllerConfig, TalkingPhotoController};
pub use error::{ControllerError, ControllerResult};
pub use events::{NoopEvents, TalkingPhotoEvents};
pub use logging::init_logging;
pub use player::{PlayerError, VideoPlayer};
