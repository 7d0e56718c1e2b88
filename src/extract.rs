use anyhow::{Context, Result};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

use crate::process::{Capture, ToolOutcome, run_tool};

/// Unpacks jars with an external `unzip`-compatible tool.
#[derive(Debug, Clone)]
pub struct Unzip {
    tool: PathBuf,
    timeout: Duration,
}

/// A jar unpacked into a private temporary directory.
///
/// The directory and everything below it is removed when this value is
/// dropped.
#[derive(Debug)]
pub struct Extraction {
    dir: TempDir,
    outcome: ExtractOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractOutcome {
    Complete,
    /// The tool failed or timed out; the directory holds whatever it wrote.
    Partial(String),
}

impl Extraction {
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn outcome(&self) -> &ExtractOutcome {
        &self.outcome
    }
}

impl Unzip {
    pub fn new(tool: PathBuf, timeout: Duration) -> Self {
        Self { tool, timeout }
    }

    /// Runs `<tool> -d <dir> <jar>` into a fresh temporary directory.
    ///
    /// A failing tool is not an error: the extraction is returned as
    /// [`ExtractOutcome::Partial`]. Only failing to create the directory or to
    /// launch the tool at all is reported as `Err`; the latter carries a
    /// [`LaunchError`](crate::process::LaunchError).
    pub fn extract(&self, jar_path: &Path) -> Result<Extraction> {
        let dir = tempfile::Builder::new()
            .prefix("serially-")
            .tempdir()
            .context("Failed to create extraction directory")?;

        let args: [&OsStr; 3] = ["-d".as_ref(), dir.path().as_os_str(), jar_path.as_os_str()];
        let outcome = run_tool(&self.tool, args, Capture::Nothing, self.timeout)?;

        let outcome = match outcome {
            ToolOutcome::Exited { status, .. } if status.success() => ExtractOutcome::Complete,
            other => {
                let reason = other.describe();
                tracing::warn!(
                    jar = %jar_path.display(),
                    %reason,
                    "unzip failed; indexing whatever was extracted"
                );
                ExtractOutcome::Partial(reason)
            }
        };

        Ok(Extraction { dir, outcome })
    }
}
