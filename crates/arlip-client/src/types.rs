//! Generation service wire types.

use serde::{Deserialize, Serialize};

use arlip_models::{GenerationStatus, VideoId};

/// Response to a generation submit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    /// ID assigned to the generation job
    pub video_id: VideoId,

    /// Initial job status
    pub status: GenerationStatus,
}
