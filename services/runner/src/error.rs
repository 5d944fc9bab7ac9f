//! Run driver errors and their process exit codes.

use std::path::PathBuf;

use downloader::FetchConfigError;
use mpas_config::ConfigError;
use mpas_mesh::MeshError;
use thiserror::Error;

pub type RunResult<T> = Result<T, RunError>;

#[derive(Debug, Error)]
pub enum RunError {
    /// Run configuration rejected before anything ran
    #[error("Invalid run configuration: {0}")]
    InvalidConfig(String),

    /// A namelist or streams file could not be edited
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Mesh extent: {0}")]
    Mesh(#[from] MeshError),

    #[error("Fetch setup: {0}")]
    FetchSetup(#[from] FetchConfigError),

    #[error("GRIB fetch incomplete: {} of {expected} files missing ({})", missing.len(), missing.join(", "))]
    FetchIncomplete {
        missing: Vec<String>,
        expected: usize,
    },

    #[error("Failed to launch {script}: {source}")]
    Spawn {
        script: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{script} exited with {}: {stderr}", code.map_or("signal".to_string(), |c| format!("status {}", c)))]
    Process {
        script: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RunError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Process exit status for this failure category.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::InvalidConfig(_) | Self::Config(_) | Self::Mesh(_) | Self::FetchSetup(_) => 2,
            Self::FetchIncomplete { .. } => 3,
            Self::Spawn { .. } | Self::Process { .. } => 4,
            Self::Io { .. } => 1,
        }
    }
}
