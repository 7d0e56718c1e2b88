//! Bounded invocation of external tools.
//!
//! Both `unzip` and `serialver` are run through [`run_tool`]: stdin and
//! stderr are discarded, stdout is optionally captured, and the child is
//! killed once the timeout elapses.

use std::ffi::OsStr;
use std::io::{self, Read};
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capture {
    Stdout,
    Nothing,
}

/// The tool could not be started, or waiting on it failed. Fatal for the
/// whole ingestion run.
#[derive(Debug, Error)]
#[error("failed to execute {tool}: {source}")]
pub struct LaunchError {
    pub tool: String,
    #[source]
    pub source: io::Error,
}

#[derive(Debug)]
pub enum ToolOutcome {
    Exited { status: ExitStatus, stdout: Vec<u8> },
    TimedOut,
}

impl ToolOutcome {
    /// Captured stdout when the tool exited with status zero.
    pub fn into_success(self) -> Option<Vec<u8>> {
        match self {
            ToolOutcome::Exited { status, stdout } if status.success() => Some(stdout),
            _ => None,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            ToolOutcome::Exited { status, .. } => status.to_string(),
            ToolOutcome::TimedOut => "timed out".to_string(),
        }
    }
}

/// Runs `program` with `args`, waiting at most `timeout`.
///
/// Only a failure to spawn or wait on the child is an `Err`; a non-zero exit
/// or a timeout is reported through [`ToolOutcome`].
pub fn run_tool<I, S>(
    program: &Path,
    args: I,
    capture: Capture,
    timeout: Duration,
) -> Result<ToolOutcome, LaunchError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let stdout = match capture {
        Capture::Stdout => Stdio::piped(),
        Capture::Nothing => Stdio::null(),
    };

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(stdout)
        .stderr(Stdio::null())
        .spawn()
        .map_err(|source| launch_error(program, source))?;

    // Drained on its own thread so a chatty tool cannot block on a full pipe.
    let reader = child.stdout.take().map(|mut out| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = out.read_to_end(&mut buf);
            buf
        })
    });

    let deadline = Instant::now() + timeout;
    loop {
        let polled = match child.try_wait() {
            Ok(polled) => polled,
            Err(source) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(launch_error(program, source));
            }
        };

        if let Some(status) = polled {
            let stdout = match reader {
                Some(handle) => handle.join().unwrap_or_default(),
                None => Vec::new(),
            };
            return Ok(ToolOutcome::Exited { status, stdout });
        }

        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            // The reader is left detached: a grandchild may still hold the pipe.
            return Ok(ToolOutcome::TimedOut);
        }

        thread::sleep(POLL_INTERVAL);
    }
}

fn launch_error(program: &Path, source: io::Error) -> LaunchError {
    LaunchError {
        tool: program.display().to_string(),
        source,
    }
}
