//! Video cache service.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use arlip_models::{LipCoordinates, PosterId};

use crate::checksum::sha256_file;
use crate::entry::CacheEntry;
use crate::error::{CacheError, CacheResult};

/// Default cache size ceiling (500 MiB).
const DEFAULT_MAX_BYTES: u64 = 500 * 1024 * 1024;

/// Default entry lifetime in hours.
const DEFAULT_TTL_HOURS: i64 = 24;

/// Name of the persisted index file inside the cache directory.
const INDEX_FILE: &str = "index.json";

/// Cache configuration.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Root directory for cached videos and the index
    pub cache_dir: PathBuf,
    /// Total size ceiling in bytes; oldest entries are evicted past this
    pub max_total_bytes: u64,
    /// Entry lifetime
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_dir: std::env::temp_dir().join("arlip-cache"),
            max_total_bytes: DEFAULT_MAX_BYTES,
            ttl: Duration::hours(DEFAULT_TTL_HOURS),
        }
    }
}

impl CacheConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cache_dir: std::env::var("VIDEO_CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_dir),
            max_total_bytes: std::env::var("VIDEO_CACHE_MAX_MB")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .map(|mb| mb * 1024 * 1024)
                .unwrap_or(defaults.max_total_bytes),
            ttl: std::env::var("VIDEO_CACHE_TTL_HOURS")
                .ok()
                .and_then(|s| s.parse::<i64>().ok())
                .map(Duration::hours)
                .unwrap_or(defaults.ttl),
        }
    }
}

/// In-memory view of the index plus the set of pinned posters.
#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    pinned: HashSet<String>,
}

/// Persisted shape of the index file. Pins are runtime-only.
#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedIndex {
    entries: Vec<CacheEntry>,
}

/// Checksum-verified video cache keyed by poster.
///
/// The index lives in `{cache_dir}/index.json`, videos under
/// `{cache_dir}/videos/{poster_id}.mp4`. All verification failures are
/// self-healing: the offending entry and file are removed so the caller can
/// re-fetch.
pub struct VideoCache {
    config: CacheConfig,
    state: RwLock<CacheState>,
}

impl VideoCache {
    /// Open the cache, creating directories and loading any persisted index.
    ///
    /// Index entries whose files have disappeared are dropped on load.
    pub async fn new(config: CacheConfig) -> CacheResult<Self> {
        tokio::fs::create_dir_all(config.cache_dir.join("videos")).await?;

        let mut state = CacheState::default();
        let index_path = config.cache_dir.join(INDEX_FILE);
        if index_path.exists() {
            let raw = tokio::fs::read_to_string(&index_path).await?;
            match serde_json::from_str::<PersistedIndex>(&raw) {
                Ok(index) => {
                    for entry in index.entries {
                        if entry.video_path.exists() {
                            state.entries.insert(entry.poster_id.as_str().to_string(), entry);
                        } else {
                            warn!(
                                poster_id = %entry.poster_id,
                                "Dropping index entry with missing file"
                            );
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Cache index unreadable, starting empty");
                }
            }
        }

        info!(
            cache_dir = %config.cache_dir.display(),
            entries = state.entries.len(),
            "Opened video cache"
        );

        Ok(Self {
            config,
            state: RwLock::new(state),
        })
    }

    /// Open with environment-derived config.
    pub async fn from_env() -> CacheResult<Self> {
        Self::new(CacheConfig::from_env()).await
    }

    /// Path a poster's video is cached at.
    pub fn video_path(&self, poster_id: &PosterId) -> PathBuf {
        self.config
            .cache_dir
            .join("videos")
            .join(format!("{}.mp4", poster_id))
    }

    /// Store a downloaded video in the cache.
    ///
    /// The file at `source` is verified against `expected_checksum` before it
    /// enters the cache; on mismatch the source is deleted and the store
    /// fails. On success the file is moved into the cache directory and the
    /// size ceiling is enforced.
    pub async fn store(
        &self,
        poster_id: &PosterId,
        source: &Path,
        lip_coordinates: LipCoordinates,
        expected_checksum: &str,
    ) -> CacheResult<CacheEntry> {
        let actual = sha256_file(source).await?;
        if actual != expected_checksum.to_lowercase() {
            warn!(
                poster_id = %poster_id,
                expected = %expected_checksum,
                actual = %actual,
                "Rejecting download with bad checksum"
            );
            remove_file_best_effort(source).await;
            return Err(CacheError::ChecksumMismatch {
                poster_id: poster_id.as_str().to_string(),
                expected: expected_checksum.to_string(),
                actual,
            });
        }

        let size_bytes = tokio::fs::metadata(source).await?.len();
        let dest = self.video_path(poster_id);
        move_file(source, &dest).await?;

        let entry = CacheEntry {
            poster_id: poster_id.clone(),
            video_path: dest,
            lip_coordinates,
            checksum: actual,
            cached_at: Utc::now(),
            size_bytes,
        };

        {
            let mut state = self.state.write().await;
            state
                .entries
                .insert(poster_id.as_str().to_string(), entry.clone());
            self.evict_over_limit(&mut state).await;
            self.persist(&state).await?;
        }

        info!(
            poster_id = %poster_id,
            size_bytes = size_bytes,
            "Cached video"
        );
        Ok(entry)
    }

    /// Retrieve a poster's cached video, fully verified.
    ///
    /// Expired, missing, or corrupted entries are removed before the error is
    /// returned, so a failed retrieve always leaves the cache consistent.
    pub async fn retrieve(&self, poster_id: &PosterId) -> CacheResult<CacheEntry> {
        let key = poster_id.as_str().to_string();
        let entry = {
            let state = self.state.read().await;
            state
                .entries
                .get(&key)
                .cloned()
                .ok_or_else(|| CacheError::NotCached(key.clone()))?
        };

        if entry.is_expired(self.config.ttl, Utc::now()) {
            debug!(poster_id = %poster_id, "Cached video expired");
            self.remove(poster_id).await?;
            return Err(CacheError::Expired(key));
        }

        if !entry.video_path.exists() {
            self.remove(poster_id).await?;
            return Err(CacheError::FileMissing(
                entry.video_path.display().to_string(),
            ));
        }

        let actual = sha256_file(&entry.video_path).await?;
        if actual != entry.checksum {
            warn!(
                poster_id = %poster_id,
                expected = %entry.checksum,
                actual = %actual,
                "Cached video failed integrity check, removing"
            );
            self.remove(poster_id).await?;
            return Err(CacheError::ChecksumMismatch {
                poster_id: key,
                expected: entry.checksum,
                actual,
            });
        }

        debug!(poster_id = %poster_id, "Cache hit");
        Ok(entry)
    }

    /// Cheap cache presence check: indexed, file on disk, not expired.
    ///
    /// Does not hash the file; [`retrieve`](Self::retrieve) does. Expired
    /// entries are removed here under the same rule as `retrieve`, so a
    /// `false` answer never leaves a stale entry behind.
    pub async fn is_cached(&self, poster_id: &PosterId) -> bool {
        let entry = {
            let state = self.state.read().await;
            state.entries.get(poster_id.as_str()).cloned()
        };
        match entry {
            Some(entry) => {
                if entry.is_expired(self.config.ttl, Utc::now()) {
                    debug!(poster_id = %poster_id, "Cached video expired");
                    if let Err(e) = self.remove(poster_id).await {
                        warn!(
                            poster_id = %poster_id,
                            error = %e,
                            "Failed to remove expired cache entry"
                        );
                    }
                    return false;
                }
                entry.video_path.exists()
            }
            None => false,
        }
    }

    /// Re-hash a cached file and report whether it still matches its checksum.
    pub async fn validate_integrity(&self, poster_id: &PosterId) -> CacheResult<bool> {
        let entry = {
            let state = self.state.read().await;
            state
                .entries
                .get(poster_id.as_str())
                .cloned()
                .ok_or_else(|| CacheError::NotCached(poster_id.as_str().to_string()))?
        };

        if !entry.video_path.exists() {
            return Ok(false);
        }
        Ok(sha256_file(&entry.video_path).await? == entry.checksum)
    }

    /// Pin a poster's entry so eviction skips it while its video is in use.
    pub async fn pin(&self, poster_id: &PosterId) {
        let mut state = self.state.write().await;
        state.pinned.insert(poster_id.as_str().to_string());
    }

    /// Release a pin. Unknown posters are ignored.
    pub async fn unpin(&self, poster_id: &PosterId) {
        let mut state = self.state.write().await;
        state.pinned.remove(poster_id.as_str());
    }

    /// Remove a single entry and its file.
    pub async fn remove(&self, poster_id: &PosterId) -> CacheResult<()> {
        let mut state = self.state.write().await;
        if let Some(entry) = state.entries.remove(poster_id.as_str()) {
            remove_file_best_effort(&entry.video_path).await;
            self.persist(&state).await?;
        }
        Ok(())
    }

    /// Drop all unpinned entries past their TTL. Returns how many were
    /// removed.
    pub async fn cleanup_expired(&self) -> CacheResult<usize> {
        let now = Utc::now();
        let mut state = self.state.write().await;

        let expired: Vec<String> = state
            .entries
            .iter()
            .filter(|(k, e)| e.is_expired(self.config.ttl, now) && !state.pinned.contains(*k))
            .map(|(k, _)| k.clone())
            .collect();

        for key in &expired {
            if let Some(entry) = state.entries.remove(key) {
                remove_file_best_effort(&entry.video_path).await;
            }
        }

        if !expired.is_empty() {
            info!(removed = expired.len(), "Removed expired cache entries");
            self.persist(&state).await?;
        }
        Ok(expired.len())
    }

    /// Total bytes currently indexed.
    pub async fn total_size(&self) -> u64 {
        let state = self.state.read().await;
        state.entries.values().map(|e| e.size_bytes).sum()
    }

    /// Number of indexed entries.
    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    /// Whether the cache holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.state.read().await.entries.is_empty()
    }

    /// Remove every entry and file.
    pub async fn clear(&self) -> CacheResult<()> {
        let mut state = self.state.write().await;
        for entry in state.entries.values() {
            remove_file_best_effort(&entry.video_path).await;
        }
        state.entries.clear();
        self.persist(&state).await?;
        info!("Cleared video cache");
        Ok(())
    }

    /// Evict oldest entries until total size fits the ceiling. Returns how
    /// many entries were removed.
    pub async fn enforce_limit(&self) -> CacheResult<usize> {
        let mut state = self.state.write().await;
        let removed = self.evict_over_limit(&mut state).await;
        if removed > 0 {
            self.persist(&state).await?;
        }
        Ok(removed)
    }

    /// Eviction pass over already-locked state.
    ///
    /// Pinned entries are skipped; if only pinned entries remain the cache is
    /// allowed to exceed the ceiling rather than break active playback.
    async fn evict_over_limit(&self, state: &mut CacheState) -> usize {
        let mut removed = 0;
        let mut total: u64 = state.entries.values().map(|e| e.size_bytes).sum();
        if total <= self.config.max_total_bytes {
            return removed;
        }

        let mut by_age: Vec<(String, DateTime<Utc>, u64)> = state
            .entries
            .iter()
            .filter(|(k, _)| !state.pinned.contains(*k))
            .map(|(k, e)| (k.clone(), e.cached_at, e.size_bytes))
            .collect();
        by_age.sort_by_key(|(_, cached_at, _)| *cached_at);

        for (key, _, size) in by_age {
            if total <= self.config.max_total_bytes {
                break;
            }
            if let Some(entry) = state.entries.remove(&key) {
                info!(
                    poster_id = %entry.poster_id,
                    size_bytes = entry.size_bytes,
                    "Evicting oldest cache entry"
                );
                remove_file_best_effort(&entry.video_path).await;
                total -= size;
                removed += 1;
            }
        }

        if total > self.config.max_total_bytes {
            warn!(
                total_bytes = total,
                limit_bytes = self.config.max_total_bytes,
                "Cache over size limit but remaining entries are pinned"
            );
        }
        removed
    }

    /// Write the index to disk via temp file and rename.
    async fn persist(&self, state: &CacheState) -> CacheResult<()> {
        let index = PersistedIndex {
            entries: state.entries.values().cloned().collect(),
        };
        let json = serde_json::to_string_pretty(&index)?;

        let index_path = self.config.cache_dir.join(INDEX_FILE);
        let tmp_path = self.config.cache_dir.join(format!("{INDEX_FILE}.tmp"));
        tokio::fs::write(&tmp_path, json).await?;
        tokio::fs::rename(&tmp_path, &index_path).await?;
        Ok(())
    }

    /// Backdate an entry, for expiry and eviction-order tests.
    #[cfg(test)]
    async fn set_cached_at(&self, poster_id: &PosterId, cached_at: DateTime<Utc>) {
        let mut state = self.state.write().await;
        if let Some(entry) = state.entries.get_mut(poster_id.as_str()) {
            entry.cached_at = cached_at;
        }
    }
}

/// Move a file, falling back to copy-and-delete across filesystems.
async fn move_file(source: &Path, dest: &Path) -> CacheResult<()> {
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    match tokio::fs::rename(source, dest).await {
        Ok(()) => Ok(()),
        Err(_) => {
            tokio::fs::copy(source, dest).await?;
            tokio::fs::remove_file(source).await?;
            Ok(())
        }
    }
}

async fn remove_file_best_effort(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "Failed to remove cache file");
        }
    }
}
