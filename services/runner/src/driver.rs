//! Sequential run driver.
//!
//! A run walks a fixed sequence of steps, each depending on what the
//! previous one left on disk:
//!
//! ```text
//! clean -> resolve cycle -> resolve extent -> fetch -> wps -> init -> lbc -> forecast -> collect
//! ```
//!
//! Progress is tracked as a [`RunState`]; every transition is logged and the
//! first error moves the run to [`RunState::Failed`].

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::Utc;
use downloader::{DownloadManager, FetchDispatcher, FetchReport, Fetcher};
use forecast_common::{resolve_init_date, BoundingBox, InitDate};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::{layout, RunConfig};
use crate::error::{RunError, RunResult};
use crate::process::ScriptRunner;
use crate::stages::{Stage, StageParams};

/// Script that wipes outputs of the previous run.
pub const CLEAN_SCRIPT: &str = "clean_all.sh";

/// Prefix of the model diagnostics files collected after the forecast.
pub const DIAG_PREFIX: &str = "diag";

/// Steps a run can be stopped after.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Clean,
    Fetch,
    Wps,
    Init,
    Lbc,
    Forecast,
}

impl From<Stage> for Step {
    fn from(stage: Stage) -> Self {
        match stage {
            Stage::Wps => Step::Wps,
            Stage::InitialConditions => Step::Init,
            Stage::BoundaryConditions => Step::Lbc,
            Stage::Forecast => Step::Forecast,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "stage", rename_all = "snake_case")]
pub enum RunState {
    Idle,
    CycleResolved,
    GribFetched,
    ConfigPrepared(Stage),
    ExternalRunComplete(Stage),
    Done,
    Failed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::CycleResolved => f.write_str("cycle_resolved"),
            Self::GribFetched => f.write_str("grib_fetched"),
            Self::ConfigPrepared(stage) => write!(f, "config_prepared({})", stage),
            Self::ExternalRunComplete(stage) => write!(f, "external_run_complete({})", stage),
            Self::Done => f.write_str("done"),
            Self::Failed => f.write_str("failed"),
        }
    }
}

/// Per-invocation choices that are not part of the run configuration.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Cycle to run instead of the latest available one
    pub init_date: Option<InitDate>,
    /// Reuse GRIB files already in the data directory
    pub skip_fetch: bool,
    /// Stop successfully once this step has finished
    pub stop_after: Option<Step>,
}

/// What a finished (or deliberately stopped) run did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub init_date: Option<InitDate>,
    pub bbox: Option<BoundingBox>,
    pub fetch: Option<FetchReport>,
    pub completed: Vec<Step>,
    /// Diagnostics files moved into the products directory
    pub products: Vec<PathBuf>,
}

pub struct Driver<F> {
    config: RunConfig,
    dispatcher: FetchDispatcher<F>,
    scripts: ScriptRunner,
    state: RunState,
}

impl Driver<DownloadManager> {
    /// Driver fetching over HTTP as configured in `config.fetch`.
    pub fn from_config(config: RunConfig) -> RunResult<Self> {
        let dispatcher = config.fetch.dispatcher(&config.root_dir)?;
        Ok(Self::new(config, dispatcher))
    }
}

impl<F: Fetcher> Driver<F> {
    pub fn new(config: RunConfig, dispatcher: FetchDispatcher<F>) -> Self {
        let scripts = ScriptRunner::new(&config.root_dir, config.scripts_dir());
        Self {
            config,
            dispatcher,
            scripts,
            state: RunState::Idle,
        }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Run the whole workflow, or up to `options.stop_after`.
    pub async fn run(&mut self, options: &RunOptions) -> RunResult<RunSummary> {
        let mut summary = RunSummary::default();

        match self.run_steps(options, &mut summary).await {
            Ok(()) => {
                self.transition(RunState::Done);
                Ok(summary)
            }
            Err(e) => {
                error!(
                    state = %self.state,
                    exit_code = e.exit_code(),
                    error = %e,
                    "Run failed"
                );
                self.transition(RunState::Failed);
                Err(e)
            }
        }
    }

    async fn run_steps(&mut self, options: &RunOptions, summary: &mut RunSummary) -> RunResult<()> {
        let stop_after = options.stop_after;
        let done = |step: Step, summary: &mut RunSummary| {
            summary.completed.push(step);
            stop_after == Some(step)
        };

        self.scripts.run(CLEAN_SCRIPT).await?;
        if done(Step::Clean, summary) {
            info!("Stopping after clean");
            return Ok(());
        }

        let init_date = options
            .init_date
            .unwrap_or_else(|| resolve_init_date(Utc::now()));
        summary.init_date = Some(init_date);
        info!(init_date = %init_date, cycle = %init_date.cycle(), "Resolved cycle");
        self.transition(RunState::CycleResolved);

        if options.skip_fetch {
            info!(grib_dir = %self.config.grib_dir().display(), "Skipping GRIB fetch");
        } else {
            let bbox = self.resolve_bbox()?;
            summary.bbox = Some(bbox);
            let report = self
                .dispatcher
                .fetch_all(init_date, self.config.flength, &bbox)
                .await;
            let gate = self.check_fetch(&report);
            summary.fetch = Some(report);
            gate?;
        }
        self.transition(RunState::GribFetched);
        if done(Step::Fetch, summary) {
            info!("Stopping after fetch");
            return Ok(());
        }

        let params = StageParams {
            root_dir: self.config.root_dir.clone(),
            domain: self.config.domain.clone(),
            init_date,
            flength: self.config.flength,
            resolution_km: self.config.resolution_km,
        };

        for stage in Stage::ALL {
            stage.prepare(&params)?;
            self.transition(RunState::ConfigPrepared(stage));

            let output = self.scripts.run(stage.script()).await?;
            info!(
                stage = %stage,
                elapsed_secs = output.elapsed.as_secs_f64(),
                "Stage finished"
            );
            self.transition(RunState::ExternalRunComplete(stage));

            if done(stage.into(), summary) {
                info!(stage = %stage, "Stopping after stage");
                return Ok(());
            }
        }

        summary.products = collect_products(
            &self.config.path(layout::MODEL_DIR),
            &self.config.products_dir(),
        )
        .await?;
        info!(count = summary.products.len(), "Collected diagnostics");
        Ok(())
    }

    /// Fetch extent: the buffered mesh extent when the static file is
    /// available, the configured extent otherwise.
    fn resolve_bbox(&self) -> RunResult<BoundingBox> {
        let mesh = self.config.static_mesh_path();
        if self.config.use_mesh_extent && mesh.exists() {
            let extent = mpas_mesh::read_mesh_extent(&mesh)?;
            let bbox = extent.buffered(self.config.extent_buffer);
            info!(mesh = %mesh.display(), extent = %extent, bbox = %bbox, "Using mesh extent");
            Ok(bbox)
        } else {
            info!(bbox = %self.config.extent, "Using configured extent");
            Ok(self.config.extent)
        }
    }

    fn check_fetch(&self, report: &FetchReport) -> RunResult<()> {
        if report.is_complete() {
            info!(
                files = report.outcomes.len(),
                bytes = report.total_bytes(),
                "All GRIB files fetched"
            );
            return Ok(());
        }

        let mut missing: Vec<String> = report
            .failed()
            .map(|o| o.filename.clone())
            .chain(report.missing.iter().cloned())
            .collect();
        missing.sort();
        missing.dedup();

        if self.config.allow_partial_fetch {
            warn!(missing = ?missing, "GRIB fetch incomplete, continuing");
            return Ok(());
        }

        Err(RunError::FetchIncomplete {
            missing,
            expected: report.outcomes.len(),
        })
    }

    fn transition(&mut self, next: RunState) {
        info!(from = %self.state, to = %next, "Run state changed");
        self.state = next;
    }
}

/// Move `diag*` files from `model_dir` into `products_dir`.
async fn collect_products(model_dir: &Path, products_dir: &Path) -> RunResult<Vec<PathBuf>> {
    tokio::fs::create_dir_all(products_dir)
        .await
        .map_err(|e| RunError::io(products_dir, e))?;

    let mut entries = tokio::fs::read_dir(model_dir)
        .await
        .map_err(|e| RunError::io(model_dir, e))?;
    let mut moved = Vec::new();

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| RunError::io(model_dir, e))?
    {
        let name = entry.file_name();
        if !name.to_string_lossy().starts_with(DIAG_PREFIX) {
            continue;
        }
        let from = entry.path();
        let to = products_dir.join(&name);
        move_file(&from, &to).await?;
        moved.push(to);
    }

    moved.sort();
    Ok(moved)
}

async fn move_file(from: &Path, to: &Path) -> RunResult<()> {
    if tokio::fs::rename(from, to).await.is_ok() {
        return Ok(());
    }
    // Different filesystems
    tokio::fs::copy(from, to)
        .await
        .map_err(|e| RunError::io(to, e))?;
    tokio::fs::remove_file(from)
        .await
        .map_err(|e| RunError::io(from, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_steps_are_ordered() {
        assert!(Step::Clean < Step::Fetch);
        assert!(Step::Fetch < Step::Wps);
        assert!(Step::Lbc < Step::Forecast);
        assert_eq!(Step::from(Stage::BoundaryConditions), Step::Lbc);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(RunState::Idle.to_string(), "idle");
        assert_eq!(
            RunState::ConfigPrepared(Stage::InitialConditions).to_string(),
            "config_prepared(initial_conditions)"
        );
    }

    #[tokio::test]
    async fn test_collect_products_moves_only_diag_files() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("MPAS-Model");
        let products = dir.path().join("products/mpas");
        std::fs::create_dir_all(&model).unwrap();
        std::fs::write(model.join("diag.2023-06-01_06.00.00.nc"), b"d").unwrap();
        std::fs::write(model.join("history.2023-06-01_06.00.00.nc"), b"h").unwrap();

        let moved = collect_products(&model, &products).await.unwrap();

        assert_eq!(moved, vec![products.join("diag.2023-06-01_06.00.00.nc")]);
        assert!(!model.join("diag.2023-06-01_06.00.00.nc").exists());
        assert!(model.join("history.2023-06-01_06.00.00.nc").exists());
    }
}
