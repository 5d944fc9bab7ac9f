//! GFS GRIB downloader.
//!
//! Fetches every forecast hour of one GFS cycle from NOMADS into
//! `{root}/data/grib`:
//! - Cycle resolved from the current time unless `--init-date` is given
//! - Up to 8 concurrent requests, each retried with exponential backoff
//! - Exit status 3 when any file is missing after the batch

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use downloader::{FetchConfig, GribSource};
use forecast_common::{resolve_init_date, BoundingBox, InitDate};

#[derive(Parser, Debug)]
#[command(name = "downloader")]
#[command(about = "Fetch GFS GRIB files for one forecast cycle")]
struct Args {
    /// Root directory of the model installation
    #[arg(long, env = "ROOT_DIR", default_value = ".")]
    root_dir: PathBuf,

    /// Fetch settings (YAML); command-line flags override it
    #[arg(long, env = "FETCH_CONFIG")]
    config: Option<PathBuf>,

    /// Cycle to fetch, e.g. 2023-06-01T06 (default: latest available)
    #[arg(long, value_parser = InitDate::parse)]
    init_date: Option<InitDate>,

    /// Forecast length in hours
    #[arg(long, default_value = "24")]
    flength: u32,

    /// Bounding box as west,east,south,north
    #[arg(long, allow_hyphen_values = true)]
    bbox: Option<BoundingBox>,

    /// GRIB source
    #[arg(long, value_enum)]
    source: Option<GribSource>,

    /// Override the NOMADS base URL
    #[arg(long)]
    base_url: Option<String>,

    /// Maximum concurrent downloads
    #[arg(long)]
    concurrency: Option<usize>,

    /// Maximum retry attempts per file
    #[arg(long)]
    max_retries: Option<u32>,

    /// Print the fetch report as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Initialize tracing
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = match &args.config {
        Some(path) => FetchConfig::load(path)?,
        None => FetchConfig::default(),
    };
    if let Some(source) = args.source {
        config.source = source;
    }
    if let Some(base_url) = &args.base_url {
        config.base_url = Some(base_url.clone());
    }
    if let Some(concurrency) = args.concurrency {
        config.concurrency = concurrency;
    }
    if let Some(max_retries) = args.max_retries {
        config.max_retries = max_retries;
    }

    let bbox = args.bbox.unwrap_or_default();
    bbox.validate().context("Invalid bounding box")?;

    let init_date = args
        .init_date
        .unwrap_or_else(|| resolve_init_date(Utc::now()));

    info!(
        init_date = %init_date,
        cycle = %init_date.cycle(),
        flength = args.flength,
        bbox = %bbox,
        root_dir = %args.root_dir.display(),
        "Starting GRIB download"
    );

    let dispatcher = config.dispatcher(&args.root_dir)?;
    let report = dispatcher.fetch_all(init_date, args.flength, &bbox).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    if report.is_complete() {
        info!(files = report.outcomes.len(), "All GRIB files fetched");
        Ok(ExitCode::SUCCESS)
    } else {
        warn!(missing = ?report.missing, "GRIB fetch incomplete");
        Ok(ExitCode::from(3))
    }
}
