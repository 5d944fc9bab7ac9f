//! Fetch configuration.
//!
//! Loadable from YAML (standalone, or as the `fetch:` section of a run
//! configuration); every field has a default.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::dispatch::{FetchDispatcher, DEFAULT_CONCURRENCY};
use crate::download::{DownloadConfig, DownloadError, DownloadManager};
use crate::params::{GribSource, ParamsError, RequestBuilder};

#[derive(Debug, Error)]
pub enum FetchConfigError {
    #[error("Failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error(transparent)]
    Params(#[from] ParamsError),

    #[error(transparent)]
    Download(#[from] DownloadError),
}

/// How GRIB files are fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub source: GribSource,
    /// Override for the source's NOMADS URL
    pub base_url: Option<String>,
    /// Download directory, relative to the root directory unless absolute
    pub data_dir: PathBuf,
    /// Maximum in-flight requests
    pub concurrency: usize,
    pub max_retries: u32,
    pub initial_retry_delay_ms: u64,
    pub max_retry_delay_secs: u64,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            source: GribSource::Filtered,
            base_url: None,
            data_dir: PathBuf::from("data/grib"),
            concurrency: DEFAULT_CONCURRENCY,
            max_retries: 3,
            initial_retry_delay_ms: 2000,
            max_retry_delay_secs: 60,
            request_timeout_secs: 300,
            connect_timeout_secs: 30,
        }
    }
}

impl FetchConfig {
    /// Load a fetch configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self, FetchConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| FetchConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config: FetchConfig =
            serde_yaml::from_str(&content).map_err(|source| FetchConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        debug!(path = %path.display(), source = ?config.source, "Loaded fetch config");
        Ok(config)
    }

    /// Download directory resolved against `root`.
    pub fn output_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.data_dir)
    }

    pub fn download_config(&self, root: &Path) -> DownloadConfig {
        DownloadConfig {
            max_retries: self.max_retries,
            initial_retry_delay: Duration::from_millis(self.initial_retry_delay_ms),
            max_retry_delay: Duration::from_secs(self.max_retry_delay_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            output_dir: self.output_dir(root),
        }
    }

    pub fn request_builder(&self) -> Result<RequestBuilder, ParamsError> {
        RequestBuilder::new(self.source, self.base_url.as_deref())
    }

    /// HTTP dispatcher writing under `root`.
    pub fn dispatcher(
        &self,
        root: &Path,
    ) -> Result<FetchDispatcher<DownloadManager>, FetchConfigError> {
        let manager = DownloadManager::new(self.download_config(root))?;
        Ok(FetchDispatcher::new(manager, self.request_builder()?).with_concurrency(self.concurrency))
    }
}
