//! Lip-sync generation service HTTP client.

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use arlip_models::{GenerationStatus, LipSyncRequest, StatusResponse, VideoId};

use crate::cancel::CancelToken;
use crate::error::{FetchError, FetchResult};
use crate::types::GenerateResponse;

/// Backoff delays between generate attempts.
///
/// Remote generation is GPU bound and transient overload is common; doubling
/// the delay avoids synchronized retry storms while bounding total wait to
/// ~7 s before giving up.
pub const RETRY_BACKOFF: [Duration; 3] = [
    Duration::from_secs(1),
    Duration::from_secs(2),
    Duration::from_secs(4),
];

/// Total generate attempts (1 initial + 3 retries).
pub const MAX_ATTEMPTS: u32 = 4;

/// Interval between status polls.
pub const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Overall budget for the status poll loop.
pub const POLL_TIMEOUT: Duration = Duration::from_secs(60);

/// Configuration for the generation service client.
#[derive(Debug, Clone)]
pub struct LipSyncClientConfig {
    /// Base URL of the generation service
    pub base_url: String,
    /// Timeout applied to generate and status requests.
    /// Downloads carry no overall timeout; they are bounded by cancellation.
    pub request_timeout: Duration,
    /// Connection timeout for all requests
    pub connect_timeout: Duration,
}

impl Default for LipSyncClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8002".to_string(),
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl LipSyncClientConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("LIPSYNC_SERVICE_URL")
                .unwrap_or_else(|_| "http://localhost:8002".to_string()),
            request_timeout: Duration::from_secs(
                std::env::var("LIPSYNC_SERVICE_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            connect_timeout: Duration::from_secs(
                std::env::var("LIPSYNC_CONNECT_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
            ),
        }
    }
}

/// Client for the remote lip-sync generation service.
pub struct LipSyncClient {
    http: Client,
    config: LipSyncClientConfig,
    cancel: CancelToken,
}

impl LipSyncClient {
    /// Create a new client with a fresh cancellation token.
    pub fn new(config: LipSyncClientConfig) -> FetchResult<Self> {
        Self::with_cancel_token(config, CancelToken::new())
    }

    /// Create a client sharing an existing cancellation token.
    pub fn with_cancel_token(config: LipSyncClientConfig, cancel: CancelToken) -> FetchResult<Self> {
        let http = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(FetchError::Network)?;

        Ok(Self {
            http,
            config,
            cancel,
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> FetchResult<Self> {
        Self::new(LipSyncClientConfig::from_env())
    }

    /// Request cancellation of all in-flight and future operations.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Clone of this client's cancellation token.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Submit a lip-sync generation job.
    ///
    /// Retries recognized failures and network errors with exponential
    /// backoff (1 s, 2 s, 4 s), for at most [`MAX_ATTEMPTS`] attempts. The
    /// first success wins. A cancelled client fails immediately without
    /// sleeping.
    pub async fn generate_lip_sync(&self, request: &LipSyncRequest) -> FetchResult<VideoId> {
        let url = format!("{}/generate", self.config.base_url);
        let mut last_error = None;

        for attempt in 0..MAX_ATTEMPTS {
            self.cancel.check()?;

            if attempt > 0 {
                let delay = RETRY_BACKOFF[(attempt - 1) as usize];
                warn!(
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    "Generate attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
                self.cancel.check()?;
            }

            match self.submit_generate(&url, request).await {
                Ok(response) => {
                    info!(video_id = %response.video_id, "Generation job submitted");
                    return Ok(response.video_id);
                }
                Err(e) if e.is_retryable() => {
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error
            .unwrap_or_else(|| FetchError::GenerationFailed("unknown error".to_string())))
    }

    /// One generate submit, no retry.
    async fn submit_generate(
        &self,
        url: &str,
        request: &LipSyncRequest,
    ) -> FetchResult<GenerateResponse> {
        debug!(url = %url, poster_id = %request.poster_id, "Submitting generation job");

        let response = self
            .http
            .post(url)
            .timeout(self.config.request_timeout)
            .json(request)
            .send()
            .await
            .map_err(FetchError::Network)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status.is_server_error() {
                return Err(FetchError::BackendUnavailable(format!(
                    "service returned {status}: {body}"
                )));
            }
            return Err(FetchError::GenerationFailed(format!(
                "service rejected request with {status}: {body}"
            )));
        }

        Ok(response.json().await?)
    }

    /// Query the status of a generation job. Single request, no retry.
    ///
    /// Service-level failure is classified as backend unavailability.
    pub async fn check_status(&self, video_id: &VideoId) -> FetchResult<StatusResponse> {
        let url = format!("{}/status/{}", self.config.base_url, video_id);

        let response = self
            .http
            .get(&url)
            .timeout(self.config.request_timeout)
            .send()
            .await
            .map_err(|e| FetchError::BackendUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::BackendUnavailable(format!(
                "status query returned {status}: {body}"
            )));
        }

        Ok(response.json().await?)
    }

    /// Poll status every [`POLL_INTERVAL`] until the job reaches a terminal
    /// state or [`POLL_TIMEOUT`] elapses.
    pub async fn poll_until_complete(&self, video_id: &VideoId) -> FetchResult<StatusResponse> {
        let deadline = tokio::time::Instant::now() + POLL_TIMEOUT;

        loop {
            self.cancel.check()?;

            if tokio::time::Instant::now() >= deadline {
                warn!(video_id = %video_id, "Generation poll timed out");
                return Err(FetchError::Timeout(POLL_TIMEOUT.as_secs()));
            }

            let status = self.check_status(video_id).await?;
            match status.status {
                GenerationStatus::Complete => {
                    info!(video_id = %video_id, "Generation complete");
                    return Ok(status);
                }
                GenerationStatus::Failed => {
                    let message = status
                        .error_message
                        .unwrap_or_else(|| "generation failed".to_string());
                    return Err(FetchError::GenerationFailed(message));
                }
                GenerationStatus::Processing => {
                    debug!(
                        video_id = %video_id,
                        progress = status.progress,
                        "Generation still processing"
                    );
                }
            }

            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Stream the generated video to `dest`.
    ///
    /// Invokes `on_progress(fraction)` after each chunk when the total length
    /// is known. Any failure or cancellation deletes the partial file.
    pub async fn download_video(
        &self,
        url: &str,
        dest: &Path,
        on_progress: impl Fn(f64),
    ) -> FetchResult<PathBuf> {
        self.cancel.check()?;

        debug!(url = %url, dest = %dest.display(), "Starting video download");

        let response = self.http.get(url).send().await.map_err(FetchError::Network)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::DownloadFailed(format!(
                "download returned {status}"
            )));
        }

        let total_bytes = response.content_length();

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = tokio::fs::File::create(dest).await?;

        match self
            .write_stream(response, file, total_bytes, &on_progress)
            .await
        {
            Ok(received) => {
                info!(
                    dest = %dest.display(),
                    size_mb = received as f64 / (1024.0 * 1024.0),
                    "Downloaded video"
                );
                Ok(dest.to_path_buf())
            }
            Err(e) => {
                if let Err(remove_err) = tokio::fs::remove_file(dest).await {
                    warn!(
                        dest = %dest.display(),
                        error = %remove_err,
                        "Failed to remove partial download"
                    );
                }
                Err(e)
            }
        }
    }

    /// Copy the response body to the file chunk by chunk.
    async fn write_stream(
        &self,
        response: reqwest::Response,
        mut file: tokio::fs::File,
        total_bytes: Option<u64>,
        on_progress: &impl Fn(f64),
    ) -> FetchResult<u64> {
        let mut stream = response.bytes_stream();
        let mut received: u64 = 0;

        while let Some(chunk) = stream.next().await {
            self.cancel.check()?;

            let chunk = chunk.map_err(|e| FetchError::DownloadFailed(e.to_string()))?;
            file.write_all(&chunk).await?;
            received += chunk.len() as u64;

            if let Some(total) = total_bytes {
                if total > 0 {
                    on_progress((received as f64 / total as f64).min(1.0));
                }
            }
        }

        file.flush().await?;
        Ok(received)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = LipSyncClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:8002");
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_backoff_schedule() {
        assert_eq!(RETRY_BACKOFF.len() as u32, MAX_ATTEMPTS - 1);
        let total: Duration = RETRY_BACKOFF.iter().sum();
        assert_eq!(total, Duration::from_secs(7));
    }
}
