//! # serially
//!
//! Builds a SQLite index of Java archives, the classes they contain and each
//! class's `serialVersionUID`.
//!
//! ## Architecture
//!
//! - **config**: home directory layout and tool/concurrency settings
//! - **scan**: jar discovery under the cache directory
//! - **hash**: streaming content digest of a jar
//! - **process**: external tool invocation with a timeout
//! - **extract**: `unzip` into a self-deleting temporary directory
//! - **catalog**: class name enumeration over an extracted tree
//! - **serialver**: `serialVersionUID` resolution behind a trait
//! - **store**: the `archive`/`class` tables
//! - **ingest**: the pipeline tying the above together

pub mod catalog;
pub mod cli;
pub mod config;
pub mod extract;
pub mod hash;
pub mod ingest;
pub mod process;
pub mod scan;
pub mod serialver;
pub mod store;
