//! HTTP client for the remote lip-sync generation service.
//!
//! This crate drives the three-step remote workflow:
//! 1. submit a generation job (`generate_lip_sync`)
//! 2. poll job status until terminal (`poll_until_complete`)
//! 3. stream the finished video to disk (`download_video`)
//!
//! All three steps share one cooperative [`CancelToken`], checked at every
//! retry boundary, poll iteration, and download chunk.

pub mod cancel;
pub mod client;
pub mod error;
pub mod types;

pub use cancel::CancelToken;
pub use client::{LipSyncClient, LipSyncClientConfig};
pub use error::{FetchError, FetchResult};
pub use types::GenerateResponse;
