//! Cache index entry model.

use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use arlip_models::{LipCoordinates, PosterId};

/// One cached video and the metadata needed to play and verify it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Poster this video belongs to
    pub poster_id: PosterId,

    /// Absolute path of the cached video file
    pub video_path: PathBuf,

    /// Lip region within the video, normalized to `[0, 1]`
    pub lip_coordinates: LipCoordinates,

    /// SHA-256 checksum of the video bytes, lowercase hex
    pub checksum: String,

    /// When the entry was stored
    pub cached_at: DateTime<Utc>,

    /// Size of the video file in bytes
    pub size_bytes: u64,
}

impl CacheEntry {
    /// Whether the entry is older than `ttl`.
    pub fn is_expired(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        now - self.cached_at > ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(cached_at: DateTime<Utc>) -> CacheEntry {
        CacheEntry {
            poster_id: PosterId::from("p1"),
            video_path: PathBuf::from("/tmp/p1.mp4"),
            lip_coordinates: LipCoordinates::new(0.4, 0.6, 0.2, 0.1).unwrap(),
            checksum: "abc".to_string(),
            cached_at,
            size_bytes: 1024,
        }
    }

    #[test]
    fn test_expiry_boundary() {
        let now = Utc::now();
        let ttl = Duration::hours(24);

        assert!(!entry(now - Duration::hours(23)).is_expired(ttl, now));
        assert!(!entry(now - Duration::hours(24)).is_expired(ttl, now));
        assert!(entry(now - Duration::hours(24) - Duration::seconds(1)).is_expired(ttl, now));
    }
}
