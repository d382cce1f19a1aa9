//! Generation job request and status models.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::{PosterId, VideoId};
use crate::lip::LipCoordinates;

/// Request to generate a lip-sync video for a poster.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LipSyncRequest {
    /// Poster to generate for
    pub poster_id: PosterId,

    /// Script text to speak
    pub text: String,

    /// Voice to synthesize with (service default when absent)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice_id: Option<String>,
}

impl LipSyncRequest {
    /// Create a request with the default voice.
    pub fn new(poster_id: PosterId, text: impl Into<String>) -> Self {
        Self {
            poster_id,
            text: text.into(),
            voice_id: None,
        }
    }

    /// Select a specific voice.
    pub fn with_voice(mut self, voice_id: impl Into<String>) -> Self {
        self.voice_id = Some(voice_id.into());
        self
    }
}

/// Generation job status reported by the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStatus {
    /// Job is still running
    #[default]
    Processing,
    /// Video is ready for download
    Complete,
    /// Generation failed
    Failed,
}

impl GenerationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationStatus::Processing => "processing",
            GenerationStatus::Complete => "complete",
            GenerationStatus::Failed => "failed",
        }
    }

    /// Whether the job has reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, GenerationStatus::Processing)
    }
}

impl fmt::Display for GenerationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status query response for a generation job.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StatusResponse {
    /// Video being generated
    pub video_id: VideoId,

    /// Current job status
    pub status: GenerationStatus,

    /// Progress fraction in `[0, 1]`
    #[serde(default)]
    pub progress: f64,

    /// Download URL, present once status is `complete`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,

    /// Lip region within the generated video
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lip_coordinates: Option<LipCoordinates>,

    /// SHA-256 checksum of the video bytes, present once complete
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,

    /// Service error message, present when status is `failed`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serde() {
        assert_eq!(
            serde_json::to_string(&GenerationStatus::Complete).unwrap(),
            "\"complete\""
        );
        let s: GenerationStatus = serde_json::from_str("\"failed\"").unwrap();
        assert_eq!(s, GenerationStatus::Failed);
    }

    #[test]
    fn test_terminal_states() {
        assert!(!GenerationStatus::Processing.is_terminal());
        assert!(GenerationStatus::Complete.is_terminal());
        assert!(GenerationStatus::Failed.is_terminal());
    }

    #[test]
    fn test_request_skips_absent_voice() {
        let req = LipSyncRequest::new(PosterId::from("p1"), "hello");
        let json = serde_json::to_string(&req).unwrap();
        assert!(!json.contains("voice_id"));

        let req = req.with_voice("narrator");
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("narrator"));
    }

    #[test]
    fn test_status_response_roundtrip() {
        let json = r#"{
            "video_id": "v1",
            "status": "complete",
            "progress": 1.0,
            "video_url": "https://cdn.example/v1.mp4",
            "lip_coordinates": {"x": 0.4, "y": 0.6, "width": 0.2, "height": 0.1},
            "checksum": "abc123"
        }"#;
        let resp: StatusResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.status, GenerationStatus::Complete);
        assert!(resp.lip_coordinates.is_some());
        assert_eq!(resp.checksum.as_deref(), Some("abc123"));
    }
}
