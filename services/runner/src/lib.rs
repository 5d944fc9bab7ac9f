//! Regional MPAS forecast driver.
//!
//! Fetches GFS boundary data for one cycle, prepares the WPS and MPAS
//! configuration files for each stage, runs the stage scripts in order and
//! collects the diagnostics output.

pub mod config;
pub mod driver;
pub mod error;
pub mod process;
pub mod stages;

pub use config::RunConfig;
pub use driver::{Driver, RunOptions, RunState, RunSummary, Step};
pub use error::{RunError, RunResult};
pub use process::{ProcessOutput, ScriptRunner};
pub use stages::{Stage, StageParams};
