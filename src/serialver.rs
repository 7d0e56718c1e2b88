//! serialVersionUID resolution.
//!
//! The JDK `serialver` tool is the source of truth; it is wrapped behind
//! [`FingerprintResolver`] so callers can substitute another implementation.

use regex::Regex;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;
use thiserror::Error;

use crate::process::{Capture, LaunchError, run_tool};

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?[0-9]+").expect("static regex is valid"));

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Launch(#[from] LaunchError),

    /// The tool succeeded but printed nothing that looks like a number.
    #[error("unexpected serialver output for {class}: {output:?}")]
    UnexpectedOutput { class: String, output: String },
}

pub trait FingerprintResolver: Send + Sync {
    /// `Ok(None)` means the class has no fingerprint: not serializable,
    /// rejected by the tool, or the tool timed out.
    fn resolve(&self, classpath: &Path, class_name: &str) -> Result<Option<String>, ResolveError>;
}

#[derive(Debug, Clone)]
pub struct Serialver {
    tool: PathBuf,
    timeout: Duration,
}

impl Serialver {
    pub fn new(tool: PathBuf, timeout: Duration) -> Self {
        Self { tool, timeout }
    }
}

impl FingerprintResolver for Serialver {
    fn resolve(&self, classpath: &Path, class_name: &str) -> Result<Option<String>, ResolveError> {
        let args: [&OsStr; 3] = [
            "-classpath".as_ref(),
            classpath.as_os_str(),
            class_name.as_ref(),
        ];
        let outcome = run_tool(&self.tool, args, Capture::Stdout, self.timeout)?;
        let described = outcome.describe();
        let Some(stdout) = outcome.into_success() else {
            tracing::debug!(class = class_name, outcome = %described, "no serialVersionUID");
            return Ok(None);
        };

        let output = String::from_utf8_lossy(&stdout);
        parse_serialver_output(&output)
            .map(Some)
            .ok_or_else(|| ResolveError::UnexpectedOutput {
                class: class_name.to_string(),
                output: output.trim().to_string(),
            })
    }
}

/// First run of digits, with an optional leading minus, anywhere in `output`.
pub fn parse_serialver_output(output: &str) -> Option<String> {
    NUMBER.find(output).map(|m| m.as_str().to_string())
}
