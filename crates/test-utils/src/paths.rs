//! Path utilities for locating test data and building throwaway model roots.

use std::fs;
use std::path::{Path, PathBuf};

use crate::fixtures;

/// Returns the workspace root directory.
///
/// This is determined by walking up from the current crate's manifest directory
/// until we find the workspace Cargo.toml.
pub fn workspace_root() -> PathBuf {
    // Start from the test-utils crate manifest dir
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    PathBuf::from(manifest_dir)
        .parent() // crates/
        .and_then(|p| p.parent()) // workspace root
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from(manifest_dir))
}

/// Searches for a test file in multiple locations.
///
/// This function checks the following locations in order:
/// 1. Environment variable `TEST_DATA_DIR` (if set)
/// 2. `crates/mpas-mesh/testdata/`
/// 3. `testdata/` at the workspace root
pub fn find_test_file(name: &str) -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(test_data_dir) = std::env::var("TEST_DATA_DIR") {
        candidates.push(PathBuf::from(test_data_dir).join(name));
    }

    let root = workspace_root();
    candidates.extend([
        root.join("crates/mpas-mesh/testdata").join(name),
        root.join("testdata").join(name),
    ]);

    candidates.into_iter().find(|path| path.exists())
}

/// Creates a temporary directory for test output.
///
/// The directory is automatically cleaned up when the returned `TempDir` is dropped.
pub fn temp_test_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("Failed to create temporary test directory")
}

/// Relative locations inside a model root directory.
pub mod layout {
    pub const NAMELIST_WPS: &str = "tools/WPS-4.4/namelist.wps";
    pub const NAMELIST_INIT: &str = "MPAS-Model/namelist.init_atmosphere";
    pub const NAMELIST_RUN: &str = "MPAS-Model/namelist.atmosphere";
    pub const STREAMS_INIT: &str = "MPAS-Model/streams.init_atmosphere";
    pub const STREAMS_RUN: &str = "MPAS-Model/streams.atmosphere";
    pub const GRIB_DIR: &str = "data/grib";
    pub const PRODUCTS_DIR: &str = "products/mpas";
    pub const SCRIPTS_DIR: &str = "scripts";

    /// Scripts the runner invokes, in the order of a full run.
    pub const SCRIPTS: [&str; 4] = [
        "clean_all.sh",
        "run_wps.sh",
        "run_init_atmosphere.sh",
        "run_atmosphere.sh",
    ];
}

/// A temporary model root directory laid out like a real installation.
///
/// Every script appends its own name to `calls.log` in the root and exits 0;
/// `run_atmosphere.sh` additionally drops two `diag.*.nc` files into
/// `MPAS-Model/`. Individual scripts can be replaced with
/// [`ModelRoot::write_script`] or [`ModelRoot::failing_script`].
pub struct ModelRoot {
    dir: tempfile::TempDir,
}

impl ModelRoot {
    pub fn new() -> Self {
        let root = Self {
            dir: temp_test_dir(),
        };

        for dir in [
            "tools/WPS-4.4",
            "MPAS-Model",
            layout::GRIB_DIR,
            layout::PRODUCTS_DIR,
            layout::SCRIPTS_DIR,
        ] {
            fs::create_dir_all(root.path().join(dir)).expect("Failed to create model root dir");
        }

        root.write(layout::NAMELIST_WPS, fixtures::NAMELIST_WPS);
        root.write(layout::NAMELIST_INIT, fixtures::NAMELIST_INIT_ATMOSPHERE);
        root.write(layout::NAMELIST_RUN, fixtures::NAMELIST_ATMOSPHERE);
        root.write(layout::STREAMS_INIT, fixtures::STREAMS_INIT_ATMOSPHERE);
        root.write(layout::STREAMS_RUN, fixtures::STREAMS_ATMOSPHERE);

        for script in layout::SCRIPTS {
            root.write_script(script, "");
        }
        root.write_script(
            "run_atmosphere.sh",
            "touch \"$ROOT_DIR/MPAS-Model/diag.2023-06-01_06.00.00.nc\" \
             \"$ROOT_DIR/MPAS-Model/diag.2023-06-01_09.00.00.nc\"",
        );

        root
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write a file relative to the root.
    pub fn write(&self, rel: &str, contents: &str) {
        fs::write(self.path().join(rel), contents).expect("Failed to write fixture file");
    }

    /// Read a file relative to the root.
    pub fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.path().join(rel)).expect("Failed to read fixture file")
    }

    /// Replace `scripts/{name}` with a script that logs its call, runs `body`
    /// and exits 0.
    pub fn write_script(&self, name: &str, body: &str) {
        let script = format!(
            "#!/bin/sh\necho \"{}\" >> \"$ROOT_DIR/calls.log\"\n{}\nexit 0\n",
            name, body
        );
        self.install_script(name, &script);
    }

    /// Replace `scripts/{name}` with a script that logs its call, prints
    /// `stderr` to standard error and exits with `code`.
    pub fn failing_script(&self, name: &str, code: i32, stderr: &str) {
        let script = format!(
            "#!/bin/sh\necho \"{}\" >> \"$ROOT_DIR/calls.log\"\necho \"{}\" >&2\nexit {}\n",
            name, stderr, code
        );
        self.install_script(name, &script);
    }

    /// Script names in the order they were invoked.
    pub fn calls(&self) -> Vec<String> {
        fs::read_to_string(self.path().join("calls.log"))
            .map(|log| log.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }

    fn install_script(&self, name: &str, contents: &str) {
        let path = self.path().join(layout::SCRIPTS_DIR).join(name);
        fs::write(&path, contents).expect("Failed to write script");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
                .expect("Failed to make script executable");
        }
    }
}

impl Default for ModelRoot {
    fn default() -> Self {
        Self::new()
    }
}
