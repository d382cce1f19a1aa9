//! Local cache for downloaded lip-sync videos.
//!
//! Cached videos are verified against a SHA-256 checksum both when stored and
//! when retrieved, expire after a TTL, and are evicted oldest first when the
//! cache grows past its size ceiling. Entries whose videos are currently
//! loaded in a player can be pinned so eviction never yanks a file out from
//! under playback.

pub mod cache;
pub mod checksum;
pub mod entry;
pub mod error;

pub use cache::{CacheConfig, VideoCache};
pub use checksum::sha256_file;
pub use entry::CacheEntry;
pub use error::{CacheError, CacheResult};
