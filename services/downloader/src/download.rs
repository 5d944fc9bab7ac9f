//! GRIB download manager with retry logic.
//!
//! Key features:
//! - Per-request and connect timeouts
//! - Exponential backoff retry on transport errors, 5xx, 408 and 429
//! - Bodies stream into `{filename}.partial` and are renamed into place only
//!   after a complete `200 OK` with a non-empty body

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::StreamExt;
use metrics::counter;
use reqwest::{Client, StatusCode, Url};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};

use crate::params::FetchRequest;

/// Configuration for the download manager.
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// Maximum number of retry attempts after the first request
    pub max_retries: u32,
    /// Initial retry delay (doubles each retry)
    pub initial_retry_delay: Duration,
    /// Maximum retry delay
    pub max_retry_delay: Duration,
    /// HTTP request timeout, covering the whole body
    pub request_timeout: Duration,
    /// TCP connect timeout
    pub connect_timeout: Duration,
    /// Directory for completed downloads
    pub output_dir: PathBuf,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_retry_delay: Duration::from_secs(2),
            max_retry_delay: Duration::from_secs(60),
            request_timeout: Duration::from_secs(300), // 5 minutes
            connect_timeout: Duration::from_secs(30),
            output_dir: PathBuf::from("data/grib"),
        }
    }
}

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("HTTP {status} from {url}")]
    Status { url: Url, status: StatusCode },

    #[error("Request to {url} failed: {source}")]
    Transport {
        url: Url,
        #[source]
        source: reqwest::Error,
    },

    #[error("Empty response body from {url}")]
    EmptyBody { url: Url },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl DownloadError {
    /// Whether another attempt could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Status { status, .. } => is_retryable_status(*status),
            Self::Transport { source, .. } => {
                source.is_timeout() || source.is_connect() || source.is_body() || source.is_decode()
            }
            Self::EmptyBody { .. } => true,
            Self::Io { .. } | Self::Client(_) => false,
        }
    }

    /// HTTP status, when the server answered.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::EmptyBody { .. } => Some(StatusCode::OK),
            _ => None,
        }
    }
}

/// 5xx, 408 Request Timeout and 429 Too Many Requests are worth retrying.
pub fn is_retryable_status(status: StatusCode) -> bool {
    status.is_server_error()
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
}

/// A file that was fetched and moved into place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Downloaded {
    pub path: PathBuf,
    pub status: StatusCode,
    pub bytes: u64,
    /// Number of requests made, including the successful one
    pub attempts: u32,
}

/// Downloads GRIB files with retry support.
pub struct DownloadManager {
    client: Client,
    config: DownloadConfig,
}

impl DownloadManager {
    /// Create a new download manager with the given configuration.
    pub fn new(config: DownloadConfig) -> Result<Self, DownloadError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(8)
            .tcp_nodelay(true)
            .build()
            .map_err(DownloadError::Client)?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &DownloadConfig {
        &self.config
    }

    /// Download one file, retrying transient failures.
    ///
    /// Returns the path to the completed download. On failure no partial
    /// file is left behind.
    #[instrument(skip(self, request), fields(url = %request.url, filename = %request.filename))]
    pub async fn download(&self, request: &FetchRequest) -> Result<Downloaded, DownloadError> {
        let output_dir = &self.config.output_dir;
        fs::create_dir_all(output_dir)
            .await
            .map_err(|source| DownloadError::Io {
                path: output_dir.clone(),
                source,
            })?;

        let temp_path = output_dir.join(format!("{}.partial", request.filename));
        let final_path = output_dir.join(&request.filename);

        let mut attempts = 0;
        let mut delay = self.config.initial_retry_delay;

        loop {
            attempts += 1;
            match self.download_once(&request.url, &temp_path).await {
                Ok(bytes) => {
                    move_into_place(&temp_path, &final_path).await?;

                    counter!("grib_downloads_total").increment(1);
                    counter!("grib_download_bytes_total").increment(bytes);
                    info!(
                        path = %final_path.display(),
                        bytes = bytes,
                        attempts = attempts,
                        "Download completed"
                    );

                    return Ok(Downloaded {
                        path: final_path,
                        status: StatusCode::OK,
                        bytes,
                        attempts,
                    });
                }
                Err(e) => {
                    fs::remove_file(&temp_path).await.ok();

                    if !e.is_retryable() || attempts > self.config.max_retries {
                        counter!("grib_download_failures_total").increment(1);
                        warn!(error = %e, attempts = attempts, "Download failed");
                        return Err(e);
                    }

                    counter!("grib_download_retries_total").increment(1);
                    warn!(
                        error = %e,
                        retry = attempts,
                        max_retries = self.config.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "Download failed, retrying"
                    );

                    tokio::time::sleep(delay).await;

                    // Exponential backoff
                    delay = std::cmp::min(delay * 2, self.config.max_retry_delay);
                }
            }
        }
    }

    /// One GET streamed into `temp_path`. Returns the number of bytes written.
    async fn download_once(&self, url: &Url, temp_path: &Path) -> Result<u64, DownloadError> {
        let transport = |source: reqwest::Error| DownloadError::Transport {
            url: url.clone(),
            source,
        };
        let io = |source: std::io::Error| DownloadError::Io {
            path: temp_path.to_path_buf(),
            source,
        };

        let response = self.client.get(url.clone()).send().await.map_err(transport)?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(DownloadError::Status {
                url: url.clone(),
                status,
            });
        }

        let mut file = fs::File::create(temp_path).await.map_err(io)?;
        let mut stream = response.bytes_stream();
        let mut bytes = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(transport)?;
            file.write_all(&chunk).await.map_err(io)?;
            bytes += chunk.len() as u64;
        }

        // Flush and sync
        file.flush().await.map_err(io)?;
        file.sync_all().await.map_err(io)?;

        if bytes == 0 {
            return Err(DownloadError::EmptyBody { url: url.clone() });
        }

        debug!(bytes = bytes, "Response body written");
        Ok(bytes)
    }
}

/// Rename the finished partial file over the final path.
async fn move_into_place(temp_path: &Path, final_path: &Path) -> Result<(), DownloadError> {
    if fs::rename(temp_path, final_path).await.is_err() {
        // rename failed (likely cross-device), fall back to copy+delete
        fs::copy(temp_path, final_path)
            .await
            .map_err(|source| DownloadError::Io {
                path: final_path.to_path_buf(),
                source,
            })?;
        fs::remove_file(temp_path).await.ok();
    }
    Ok(())
}
