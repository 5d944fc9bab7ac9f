//! GFS GRIB fetching for regional MPAS runs.
//!
//! - [`params`]: NOMADS request URLs and deterministic local filenames
//! - [`download`]: single-file download with retry and atomic placement
//! - [`dispatch`]: bounded concurrent fetch of a whole cycle with validation
//! - [`config`]: YAML-loadable fetch settings

pub mod config;
pub mod dispatch;
pub mod download;
pub mod params;

pub use config::{FetchConfig, FetchConfigError};
pub use dispatch::{
    FetchDispatcher, FetchOutcome, FetchReport, FetchStatus, FetchTask, Fetcher,
    DEFAULT_CONCURRENCY,
};
pub use download::{DownloadConfig, DownloadError, DownloadManager, Downloaded};
pub use params::{
    build_fetch_params, build_global_params, local_filename, FetchRequest, GribSource,
    RequestBuilder,
};
