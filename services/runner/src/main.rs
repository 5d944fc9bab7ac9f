//! MPAS forecast runner.
//!
//! Runs one regional forecast end to end:
//! - Cleans the previous run and resolves the latest GFS cycle
//! - Fetches GRIB files over the mesh extent
//! - Prepares and runs WPS, init_atmosphere (IC and LBC) and atmosphere
//! - Moves diagnostics into `products/mpas`
//!
//! Exit status: 0 success, 2 configuration, 3 incomplete fetch, 4 failed
//! script, 1 anything else.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use forecast_common::InitDate;
use runner::{Driver, RunConfig, RunOptions, Step};

#[derive(Parser, Debug)]
#[command(name = "mpas-runner")]
#[command(about = "Run a regional MPAS forecast from GFS data")]
struct Args {
    /// Root directory of the model installation
    #[arg(long, env = "ROOT_DIR")]
    root_dir: Option<PathBuf>,

    /// Run configuration (YAML); command-line flags override it
    #[arg(long, env = "RUN_CONFIG")]
    config: Option<PathBuf>,

    /// Cycle to run, e.g. 2023-06-01T06 (default: latest available)
    #[arg(long, value_parser = InitDate::parse)]
    init_date: Option<InitDate>,

    /// Forecast length in hours
    #[arg(long)]
    flength: Option<u32>,

    /// Mesh/domain name
    #[arg(long)]
    domain: Option<String>,

    /// Mesh resolution in km
    #[arg(long)]
    resolution_km: Option<u32>,

    /// Use GRIB files already in the data directory
    #[arg(long)]
    skip_fetch: bool,

    /// Stop after this step
    #[arg(long, value_enum)]
    stop_after: Option<Step>,

    /// Continue when some GRIB files could not be fetched
    #[arg(long)]
    allow_partial_fetch: bool,

    /// Print the run summary as JSON on stdout
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

    let config = match build_config(&args) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return Ok(ExitCode::from(e.exit_code()));
        }
    };

    info!(
        root_dir = %config.root_dir.display(),
        domain = %config.domain,
        resolution_km = config.resolution_km,
        flength = config.flength,
        "Starting MPAS run"
    );

    let options = RunOptions {
        init_date: args.init_date,
        skip_fetch: args.skip_fetch,
        stop_after: args.stop_after,
    };

    let result = match Driver::from_config(config) {
        Ok(mut driver) => driver.run(&options).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(summary) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            }
            info!(products = summary.products.len(), "Run complete");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("mpas-runner: {}", e);
            Ok(ExitCode::from(e.exit_code()))
        }
    }
}

fn build_config(args: &Args) -> runner::RunResult<RunConfig> {
    let mut config = match &args.config {
        Some(path) => RunConfig::load(path)?,
        None => RunConfig::default(),
    };

    if let Some(root_dir) = &args.root_dir {
        config.root_dir = root_dir.clone();
    }
    if let Some(flength) = args.flength {
        config.flength = flength;
    }
    if let Some(domain) = &args.domain {
        config.domain = domain.clone();
    }
    if let Some(resolution_km) = args.resolution_km {
        config.resolution_km = resolution_km;
    }
    if args.allow_partial_fetch {
        config.allow_partial_fetch = true;
    }

    config.validate()?;
    Ok(config)
}
