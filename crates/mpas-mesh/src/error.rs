//! Error types for mesh reading.

use thiserror::Error;

/// Result type for mesh operations.
pub type MeshResult<T> = Result<T, MeshError>;

/// Error types for mesh reading.
#[derive(Error, Debug)]
pub enum MeshError {
    /// File I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Missing required variable
    #[error("Missing required data: {0}")]
    MissingData(String),

    /// Invalid data format
    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    /// Command execution error (ncdump reader)
    #[error("Command execution failed: {0}")]
    CommandError(String),
}
