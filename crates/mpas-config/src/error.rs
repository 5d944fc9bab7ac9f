//! Error types for namelist and streams editing.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for configuration file operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Error types for configuration file editing.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File could not be read or written
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A namelist group the edit relies on is absent
    #[error("Namelist group '&{group}' not found in {origin}")]
    MissingGroup { group: String, origin: String },

    /// A namelist group was opened but never closed with '/'
    #[error("Namelist group '&{group}' opened on line {line} of {origin} is never terminated")]
    UnterminatedGroup {
        group: String,
        line: usize,
        origin: String,
    },

    /// No <stream>/<immutable_stream> element carries the requested name
    #[error("Stream '{stream}' not found in {origin}")]
    MissingStream { stream: String, origin: String },

    /// The streams file is not well-formed XML
    #[error("Malformed XML in {origin}: {message}")]
    Xml { origin: String, message: String },
}
