//! Run configuration.
//!
//! One explicit [`RunConfig`] is built in `main` (YAML file, then
//! command-line overrides) and passed to every component that needs a path.
//! YAML values may reference the environment with `${VAR}` or
//! `${VAR:-default}`.

use std::path::{Path, PathBuf};

use downloader::FetchConfig;
use forecast_common::BoundingBox;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RunError, RunResult};

/// Paths inside the root directory.
pub mod layout {
    pub const NAMELIST_WPS: &str = "tools/WPS-4.4/namelist.wps";
    pub const MODEL_DIR: &str = "MPAS-Model";
    pub const NAMELIST_INIT: &str = "MPAS-Model/namelist.init_atmosphere";
    pub const NAMELIST_RUN: &str = "MPAS-Model/namelist.atmosphere";
    pub const STREAMS_INIT: &str = "MPAS-Model/streams.init_atmosphere";
    pub const STREAMS_RUN: &str = "MPAS-Model/streams.atmosphere";
    pub const SCRIPTS_DIR: &str = "scripts";
    pub const PRODUCTS_DIR: &str = "products/mpas";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Root of the model installation; every other path is relative to it
    pub root_dir: PathBuf,
    /// Mesh/domain name, e.g. `colorado12km` for `colorado12km.static.nc`
    pub domain: String,
    /// Nominal mesh resolution, drives the model time step
    pub resolution_km: u32,
    /// Forecast length in hours
    pub flength: u32,
    /// Fetch extent when no mesh extent is available
    pub extent: BoundingBox,
    /// Derive the fetch extent from `{domain}.static.nc` when present
    pub use_mesh_extent: bool,
    /// Degrees added on every side of the mesh extent
    pub extent_buffer: f64,
    /// Continue to WPS even if some GRIB files are missing
    pub allow_partial_fetch: bool,
    pub fetch: FetchConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("."),
            domain: "colorado12km".to_string(),
            resolution_km: 12,
            flength: 24,
            extent: BoundingBox::DEFAULT,
            use_mesh_extent: true,
            extent_buffer: 1.0,
            allow_partial_fetch: false,
            fetch: FetchConfig::default(),
        }
    }
}

impl RunConfig {
    /// Load a run configuration from YAML with environment substitution.
    pub fn load(path: &Path) -> RunResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| RunError::io(path, e))?;
        let expanded = expand_env_vars(&content)?;

        let config: RunConfig = serde_yaml::from_str(&expanded).map_err(|e| {
            RunError::InvalidConfig(format!("Failed to parse {}: {}", path.display(), e))
        })?;

        debug!(path = %path.display(), domain = %config.domain, "Loaded run config");
        Ok(config)
    }

    pub fn validate(&self) -> RunResult<()> {
        let invalid = |msg: String| Err(RunError::InvalidConfig(msg));

        if self.domain.is_empty() || self.domain.contains(['/', '\'', '"']) {
            return invalid(format!("Invalid domain name '{}'", self.domain));
        }
        if self.resolution_km == 0 {
            return invalid("resolution_km must be greater than 0".to_string());
        }
        if self.flength == 0 {
            return invalid("flength must be greater than 0".to_string());
        }
        if !self.extent_buffer.is_finite() || self.extent_buffer < 0.0 {
            return invalid(format!("Invalid extent_buffer {}", self.extent_buffer));
        }
        if self.fetch.concurrency == 0 {
            return invalid("fetch.concurrency must be at least 1".to_string());
        }
        self.extent
            .validate()
            .map_err(|e| RunError::InvalidConfig(format!("Invalid extent: {}", e)))?;
        Ok(())
    }

    /// Absolute path of a file inside the root directory.
    pub fn path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.root_dir.join(relative)
    }

    /// `MPAS-Model/{domain}.static.nc`
    pub fn static_mesh_path(&self) -> PathBuf {
        self.path(layout::MODEL_DIR)
            .join(format!("{}.static.nc", self.domain))
    }

    pub fn scripts_dir(&self) -> PathBuf {
        self.path(layout::SCRIPTS_DIR)
    }

    pub fn products_dir(&self) -> PathBuf {
        self.path(layout::PRODUCTS_DIR)
    }

    pub fn grib_dir(&self) -> PathBuf {
        self.fetch.output_dir(&self.root_dir)
    }
}

/// Expand `${VAR}` and `${VAR:-default}` in configuration text.
fn expand_env_vars(content: &str) -> RunResult<String> {
    let mut result = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'

            let mut var_expr = String::new();
            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(c) => var_expr.push(c),
                    None => {
                        return Err(RunError::InvalidConfig(format!(
                            "Unclosed variable substitution: ${{{}",
                            var_expr
                        )))
                    }
                }
            }

            result.push_str(&resolve_var_expr(&var_expr)?);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}

fn resolve_var_expr(expr: &str) -> RunResult<String> {
    if let Some((var_name, default)) = expr.split_once(":-") {
        match std::env::var(var_name.trim()) {
            Ok(val) if !val.is_empty() => Ok(val),
            _ => Ok(default.to_string()),
        }
    } else {
        std::env::var(expr.trim()).map_err(|_| {
            RunError::InvalidConfig(format!("Environment variable {} not set", expr.trim()))
        })
    }
}
