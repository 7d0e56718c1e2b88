use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "serially")]
#[command(about = "Index the classes and serialVersionUIDs of every jar in the serially cache")]
pub struct Cli {
    /// Base directory holding the jar cache and the database (default: ~/.serially)
    #[arg(long, value_name = "DIR")]
    pub home: Option<PathBuf>,

    #[arg(long, value_name = "FILE")]
    pub unzip: Option<PathBuf>,

    #[arg(long, value_name = "FILE")]
    pub serialver: Option<PathBuf>,

    /// Concurrent serialver invocations per jar
    #[arg(short = 'j', long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Per-invocation limit for unzip and serialver
    #[arg(long, value_name = "SECS")]
    pub timeout_secs: Option<u64>,

    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
