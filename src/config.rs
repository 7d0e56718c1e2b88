use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::cli::Cli;

pub const HOME_ENV: &str = "SERIALLY_HOME";
pub const UNZIP_ENV: &str = "SERIALLY_UNZIP";
pub const SERIALVER_ENV: &str = "SERIALLY_SERIALVER";
pub const JOBS_ENV: &str = "SERIALLY_JOBS";
pub const TIMEOUT_ENV: &str = "SERIALLY_TIMEOUT_SECS";

const JARS_DIR: &str = "jars";
const DB_FILE: &str = "java.sqlite";
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const MAX_DEFAULT_JOBS: usize = 8;

/// On-disk layout rooted at the serially home directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub home: PathBuf,
    pub jars_dir: PathBuf,
    pub db_file: PathBuf,
}

impl Layout {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        let home = home.into();
        Self {
            jars_dir: home.join(JARS_DIR),
            db_file: home.join(DB_FILE),
            home,
        }
    }

    /// Creates the home directory, the jar cache and the database file if any
    /// of them is missing. Existing entries are left untouched.
    pub fn ensure(&self) -> Result<()> {
        std::fs::create_dir_all(&self.jars_dir)
            .with_context(|| format!("Failed to create jar directory: {}", self.jars_dir.display()))?;

        if !self.db_file.exists() {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.db_file)
                .with_context(|| {
                    format!("Failed to create database file: {}", self.db_file.display())
                })?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub unzip: PathBuf,
    pub serialver: PathBuf,
    pub jobs: usize,
    pub tool_timeout: Duration,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            unzip: PathBuf::from("unzip"),
            serialver: PathBuf::from("serialver"),
            jobs: default_jobs(),
            tool_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

pub fn resolve_layout(cli: &Cli) -> Result<Layout> {
    if let Some(p) = cli.home.clone() {
        return Ok(Layout::new(p));
    }
    if let Ok(p) = env::var(HOME_ENV) {
        return Ok(Layout::new(p));
    }
    Ok(Layout::new(serially_home()?))
}

pub fn resolve_ingest_config(cli: &Cli) -> Result<IngestConfig> {
    let defaults = IngestConfig::default();

    let unzip = cli
        .unzip
        .clone()
        .or_else(|| env::var(UNZIP_ENV).ok().map(PathBuf::from))
        .unwrap_or(defaults.unzip);

    let serialver = cli
        .serialver
        .clone()
        .or_else(|| env::var(SERIALVER_ENV).ok().map(PathBuf::from))
        .unwrap_or(defaults.serialver);

    let jobs = match cli.jobs {
        Some(n) => n,
        None => env_number(JOBS_ENV)?.map_or(defaults.jobs, |n| n as usize),
    };
    anyhow::ensure!(jobs > 0, "jobs must be at least 1");

    let timeout_secs = match cli.timeout_secs {
        Some(n) => Some(n),
        None => env_number(TIMEOUT_ENV)?,
    };
    let tool_timeout = timeout_secs.map_or(defaults.tool_timeout, Duration::from_secs);
    anyhow::ensure!(!tool_timeout.is_zero(), "tool timeout must be at least one second");

    Ok(IngestConfig {
        unzip,
        serialver,
        jobs,
        tool_timeout,
    })
}

fn env_number(key: &str) -> Result<Option<u64>> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .with_context(|| format!("{key} is not a valid number: {raw}")),
        Err(_) => Ok(None),
    }
}

fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(MAX_DEFAULT_JOBS)
}

fn serially_home() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Failed to resolve home directory"))?;
    Ok(home.join(".serially"))
}
