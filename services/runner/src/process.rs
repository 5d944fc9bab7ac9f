//! External script invocation.
//!
//! Scripts run with no arguments, with the root directory as working
//! directory and exported as `ROOT_DIR`. Output is captured; a non-zero exit
//! is an error carrying the tail of stderr.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::Command;
use tracing::{debug, info, instrument};

use crate::error::{RunError, RunResult};

/// Lines of stderr kept in a [`RunError::Process`].
const STDERR_TAIL_LINES: usize = 20;

/// Captured result of a successful script run.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub script: String,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

/// Runs scripts from `{root}/scripts`.
#[derive(Debug, Clone)]
pub struct ScriptRunner {
    root_dir: PathBuf,
    scripts_dir: PathBuf,
}

impl ScriptRunner {
    pub fn new(root_dir: impl Into<PathBuf>, scripts_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            scripts_dir: scripts_dir.into(),
        }
    }

    pub fn script_path(&self, script: &str) -> PathBuf {
        self.scripts_dir.join(script)
    }

    /// Run `script` to completion.
    #[instrument(skip(self))]
    pub async fn run(&self, script: &str) -> RunResult<ProcessOutput> {
        let path = self.script_path(script);
        info!(path = %path.display(), "Running script");
        let started = Instant::now();

        let output = Command::new(&path)
            .current_dir(&self.root_dir)
            .env("ROOT_DIR", absolute(&self.root_dir))
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| RunError::Spawn {
                script: script.to_string(),
                source,
            })?;

        let elapsed = started.elapsed();
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        debug!(stdout = %tail(&stdout, STDERR_TAIL_LINES), "Script output");

        if !output.status.success() {
            return Err(RunError::Process {
                script: script.to_string(),
                code: output.status.code(),
                stderr: tail(&stderr, STDERR_TAIL_LINES),
            });
        }

        info!(elapsed_secs = elapsed.as_secs_f64(), "Script finished");
        Ok(ProcessOutput {
            script: script.to_string(),
            stdout,
            stderr,
            elapsed,
        })
    }
}

fn absolute(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Last `lines` lines of `text`, trimmed.
fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.trim_end().lines().collect();
    let start = all.len().saturating_sub(lines);
    all[start..].join("\n")
}
