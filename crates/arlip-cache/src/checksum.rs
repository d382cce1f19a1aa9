//! File checksum helpers.

use std::path::Path;

use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;

use crate::error::CacheResult;

/// Compute the SHA-256 checksum of a file, returned as lowercase hex.
///
/// Reads in 64 KiB chunks so large videos never sit in memory whole.
pub async fn sha256_file(path: &Path) -> CacheResult<String> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 64 * 1024];

    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}
