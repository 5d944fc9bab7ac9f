//! Bounded concurrent fetch of every forecast hour of a cycle.
//!
//! One task per forecast hour is driven through
//! `stream::iter(..).map(..).buffer_unordered(n)`, so at most `n` requests
//! are in flight. A failed task is recorded in its [`FetchOutcome`] and never
//! cancels its siblings. Once the pool drains, a validation pass checks that
//! every expected file is on disk and non-empty.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use forecast_common::{BoundingBox, InitDate};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::download::{DownloadError, DownloadManager, Downloaded};
use crate::params::{FetchRequest, RequestBuilder};

/// Worker pool size used unless configured otherwise.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Anything that can retrieve a [`FetchRequest`] into a directory.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<Downloaded, DownloadError>;

    /// Directory fetched files land in.
    fn output_dir(&self) -> &Path;
}

#[async_trait]
impl Fetcher for DownloadManager {
    async fn fetch(&self, request: &FetchRequest) -> Result<Downloaded, DownloadError> {
        self.download(request).await
    }

    fn output_dir(&self) -> &Path {
        &self.config().output_dir
    }
}

/// One forecast hour to retrieve.
#[derive(Debug, Clone)]
pub struct FetchTask {
    pub init_date: InitDate,
    pub forecast_hour: u32,
    pub request: FetchRequest,
}

impl FetchTask {
    pub fn valid_time(&self) -> DateTime<Utc> {
        self.init_date.valid_time(self.forecast_hour)
    }
}

/// Result of one task.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum FetchStatus {
    Success {
        http_status: u16,
        bytes: u64,
        path: PathBuf,
        attempts: u32,
    },
    /// The server answered with something other than a usable 200
    HttpError { http_status: u16, reason: String },
    /// No usable answer at all (timeout, connection, disk)
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchOutcome {
    pub forecast_hour: u32,
    pub valid_time: DateTime<Utc>,
    pub filename: String,
    pub url: String,
    #[serde(flatten)]
    pub status: FetchStatus,
}

impl FetchOutcome {
    fn new(task: &FetchTask, result: Result<Downloaded, DownloadError>) -> Self {
        let status = match result {
            Ok(done) => FetchStatus::Success {
                http_status: done.status.as_u16(),
                bytes: done.bytes,
                path: done.path,
                attempts: done.attempts,
            },
            Err(e) => match e.status() {
                Some(status) => FetchStatus::HttpError {
                    http_status: status.as_u16(),
                    reason: e.to_string(),
                },
                None => FetchStatus::Failed {
                    reason: e.to_string(),
                },
            },
        };

        Self {
            forecast_hour: task.forecast_hour,
            valid_time: task.valid_time(),
            filename: task.request.filename.clone(),
            url: task.request.url.to_string(),
            status,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, FetchStatus::Success { http_status: 200, .. })
    }

    /// HTTP status of the final attempt, if the server answered.
    pub fn http_status(&self) -> Option<u16> {
        match &self.status {
            FetchStatus::Success { http_status, .. } | FetchStatus::HttpError { http_status, .. } => {
                Some(*http_status)
            }
            FetchStatus::Failed { .. } => None,
        }
    }
}

/// Outcomes of one batch plus the validation pass.
#[derive(Debug, Clone, Serialize)]
pub struct FetchReport {
    pub init_date: InitDate,
    /// Sorted by forecast hour
    pub outcomes: Vec<FetchOutcome>,
    /// Expected files that are absent or empty after the batch
    pub missing: Vec<String>,
}

impl FetchReport {
    /// True only if every task succeeded and its file validated.
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty() && self.outcomes.iter().all(FetchOutcome::is_success)
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> impl Iterator<Item = &FetchOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    pub fn total_bytes(&self) -> u64 {
        self.outcomes
            .iter()
            .map(|o| match o.status {
                FetchStatus::Success { bytes, .. } => bytes,
                _ => 0,
            })
            .sum()
    }
}

/// Fans forecast-hour fetches out over a bounded pool.
pub struct FetchDispatcher<F> {
    fetcher: F,
    builder: RequestBuilder,
    concurrency: usize,
}

impl<F: Fetcher> FetchDispatcher<F> {
    pub fn new(fetcher: F, builder: RequestBuilder) -> Self {
        Self {
            fetcher,
            builder,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Set the maximum number of in-flight requests (at least 1).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// One task per forecast hour in `0..=flength`.
    pub fn tasks(&self, init_date: InitDate, flength: u32, bbox: &BoundingBox) -> Vec<FetchTask> {
        let cycle = init_date.cycle();
        self.builder
            .forecast_hours(flength)
            .into_iter()
            .map(|forecast_hour| FetchTask {
                init_date,
                forecast_hour,
                request: self.builder.build(init_date, cycle, forecast_hour, bbox),
            })
            .collect()
    }

    /// Fetch every forecast hour of `init_date` up to `flength`.
    ///
    /// Never fails: per-task errors are recorded in the report.
    #[instrument(skip_all, fields(init_date = %init_date, flength = flength, bbox = %bbox))]
    pub async fn fetch_all(
        &self,
        init_date: InitDate,
        flength: u32,
        bbox: &BoundingBox,
    ) -> FetchReport {
        let tasks = self.tasks(init_date, flength, bbox);
        info!(
            count = tasks.len(),
            concurrency = self.concurrency,
            source = ?self.builder.source(),
            "Fetching GRIB files"
        );

        let fetcher = &self.fetcher;
        let mut outcomes: Vec<FetchOutcome> = stream::iter(tasks)
            .map(|task| async move {
                let result = fetcher.fetch(&task.request).await;
                FetchOutcome::new(&task, result)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;
        outcomes.sort_by_key(|o| o.forecast_hour);

        let missing = validate(fetcher.output_dir(), &outcomes).await;

        let report = FetchReport {
            init_date,
            outcomes,
            missing,
        };

        for outcome in report.failed() {
            warn!(
                forecast_hour = outcome.forecast_hour,
                filename = %outcome.filename,
                status = ?outcome.status,
                "Fetch failed"
            );
        }
        info!(
            success = report.succeeded(),
            failed = report.outcomes.len() - report.succeeded(),
            missing = report.missing.len(),
            bytes = report.total_bytes(),
            "Fetch batch complete"
        );

        report
    }
}

/// Filenames whose file is absent or empty in `dir`.
async fn validate(dir: &Path, outcomes: &[FetchOutcome]) -> Vec<String> {
    let mut missing = Vec::new();
    for outcome in outcomes {
        let present = match tokio::fs::metadata(dir.join(&outcome.filename)).await {
            Ok(meta) => meta.is_file() && meta.len() > 0,
            Err(_) => false,
        };
        if !present {
            missing.push(outcome.filename.clone());
        }
    }
    missing
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::GribSource;
    use chrono::NaiveDate;
    use forecast_common::ModelCycle;
    use reqwest::StatusCode;

    struct WriteFetcher {
        dir: tempfile::TempDir,
    }

    #[async_trait]
    impl Fetcher for WriteFetcher {
        async fn fetch(&self, request: &FetchRequest) -> Result<Downloaded, DownloadError> {
            let path = self.dir.path().join(&request.filename);
            tokio::fs::write(&path, b"GRIB").await.unwrap();
            Ok(Downloaded {
                path,
                status: StatusCode::OK,
                bytes: 4,
                attempts: 1,
            })
        }

        fn output_dir(&self) -> &Path {
            self.dir.path()
        }
    }

    fn init() -> InitDate {
        InitDate::new(NaiveDate::from_ymd_opt(2023, 6, 1).unwrap(), ModelCycle::Z06)
    }

    fn dispatcher() -> FetchDispatcher<WriteFetcher> {
        let fetcher = WriteFetcher {
            dir: tempfile::tempdir().unwrap(),
        };
        FetchDispatcher::new(fetcher, RequestBuilder::new(GribSource::Filtered, None).unwrap())
    }

    #[test]
    fn test_tasks_cover_inclusive_range() {
        let tasks = dispatcher().tasks(init(), 2, &BoundingBox::default());
        let hours: Vec<u32> = tasks.iter().map(|t| t.forecast_hour).collect();
        assert_eq!(hours, vec![0, 1, 2]);
        assert_eq!(tasks[2].valid_time(), init().valid_time(2));
    }

    #[test]
    fn test_concurrency_floor() {
        assert_eq!(dispatcher().with_concurrency(0).concurrency(), 1);
        assert_eq!(dispatcher().concurrency(), DEFAULT_CONCURRENCY);
    }

    #[tokio::test]
    async fn test_fetch_all_complete() {
        let dispatcher = dispatcher();
        let report = dispatcher.fetch_all(init(), 3, &BoundingBox::default()).await;

        assert!(report.is_complete());
        assert_eq!(report.succeeded(), 4);
        assert_eq!(report.total_bytes(), 16);
        let hours: Vec<u32> = report.outcomes.iter().map(|o| o.forecast_hour).collect();
        assert_eq!(hours, vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_validation_flags_removed_file() {
        let dispatcher = dispatcher();
        let report = dispatcher.fetch_all(init(), 1, &BoundingBox::default()).await;
        let first = &report.outcomes[0];

        std::fs::remove_file(dispatcher.fetcher().output_dir().join(&first.filename)).unwrap();
        let missing = validate(dispatcher.fetcher().output_dir(), &report.outcomes).await;
        assert_eq!(missing, vec![first.filename.clone()]);
    }

    #[test]
    fn test_outcome_serializes_flat() {
        let task = dispatcher().tasks(init(), 0, &BoundingBox::default()).remove(0);
        let outcome = FetchOutcome::new(
            &task,
            Err(DownloadError::Status {
                url: task.request.url.clone(),
                status: StatusCode::NOT_FOUND,
            }),
        );
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["result"], "http_error");
        assert_eq!(json["http_status"], 404);
        assert_eq!(json["forecast_hour"], 0);
        assert_eq!(outcome.http_status(), Some(404));
        assert!(!outcome.is_success());
    }
}
