//! Single-poster tracking over per-frame AR signals.
//!
//! This crate turns the AR session's noisy per-frame tracking updates into a
//! stable "currently tracked poster" decision:
//! - one authoritative poster at a time (updates for others are ignored)
//! - flicker suppression via consecutive-frame run counters
//! - a detection timeout for scans that never find a poster
//!
//! The frame path is synchronous and allocation-light; it runs on the AR
//! session's frame-delivery thread and must not block.

pub mod config;
pub mod error;
pub mod frame;
pub mod overlay;
pub mod tracker;

pub use config::TrackerConfig;
pub use error::{TrackerError, TrackerResult};
pub use frame::{FrameSignal, ImageUpdate};
pub use overlay::OverlayTrackingState;
pub use tracker::{FrameOutcome, PosterTracker, TrackerEvent};
