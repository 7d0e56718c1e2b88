//! Ingestion of the jar cache into the index.
//!
//! Jars are processed one at a time in directory traversal order. For each
//! jar not yet indexed by file name: hash, record the jar, unpack it, then
//! resolve the serialVersionUID of every class on a bounded thread pool and
//! record each class as soon as it resolves.

use anyhow::{Context, Result};
use rayon::ThreadPool;
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::catalog::catalog;
use crate::extract::{ExtractOutcome, Unzip};
use crate::hash::hash_file;
use crate::process::LaunchError;
use crate::scan::{jar_file_name, scan_jars};
use crate::serialver::{FingerprintResolver, ResolveError};
use crate::store::{ClassRow, IndexStore};

#[derive(Debug, Default, Clone, Serialize)]
pub struct IngestReport {
    pub jar_dir: String,
    pub scanned_jars: usize,
    pub ingested_jars: usize,
    pub skipped_jars: usize,
    pub failed_jars: usize,
    pub classes_added: usize,
    pub fingerprinted: usize,
    pub absent: usize,
    pub failed_classes: usize,
    pub duration_ms: u64,
}

impl IngestReport {
    pub fn found_new_jars(&self) -> bool {
        self.ingested_jars > 0
    }

    fn absorb(&mut self, stats: JarStats) {
        self.classes_added += stats.fingerprinted + stats.absent;
        self.fingerprinted += stats.fingerprinted;
        self.absent += stats.absent;
        self.failed_classes += stats.failed;
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct JarStats {
    pub fingerprinted: usize,
    pub absent: usize,
    pub failed: usize,
}

impl JarStats {
    fn merge(self, other: Self) -> Self {
        Self {
            fingerprinted: self.fingerprinted + other.fingerprinted,
            absent: self.absent + other.absent,
            failed: self.failed + other.failed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JarOutcome {
    /// A jar with the same file name is already indexed.
    Skipped,
    Ingested { archive_id: i64, stats: JarStats },
}

pub struct Ingestor<R> {
    store: IndexStore,
    unzip: Unzip,
    resolver: R,
    pool: ThreadPool,
}

impl<R: FingerprintResolver> Ingestor<R> {
    pub fn new(store: IndexStore, unzip: Unzip, resolver: R, jobs: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(jobs.max(1))
            .thread_name(|i| format!("serially-resolve-{i}"))
            .build()
            .context("Failed to build resolver thread pool")?;
        Ok(Self {
            store,
            unzip,
            resolver,
            pool,
        })
    }

    pub fn store(&self) -> &IndexStore {
        &self.store
    }

    /// Ingests every unseen jar under `jar_dir`.
    pub fn run(&self, jar_dir: &Path, on_class: &(dyn Fn(&ClassRow) + Sync)) -> Result<IngestReport> {
        let jars = scan_jars(jar_dir)?;
        let mut report = self.ingest_paths(&jars, on_class)?;
        report.jar_dir = jar_dir.to_string_lossy().to_string();
        Ok(report)
    }

    /// Ingests `jars` in order. A jar that cannot be hashed, recorded or
    /// unpacked is logged and counted, and the next jar is tried. An external
    /// tool that cannot be launched at all aborts the run with an error.
    pub fn ingest_paths(
        &self,
        jars: &[PathBuf],
        on_class: &(dyn Fn(&ClassRow) + Sync),
    ) -> Result<IngestReport> {
        let start = Instant::now();
        let mut report = IngestReport {
            scanned_jars: jars.len(),
            ..IngestReport::default()
        };

        for jar_path in jars.iter() {
            match self.ingest_jar(jar_path, on_class) {
                Ok(JarOutcome::Skipped) => report.skipped_jars += 1,
                Ok(JarOutcome::Ingested { stats, .. }) => {
                    report.ingested_jars += 1;
                    report.absorb(stats);
                }
                Err(err) if err.downcast_ref::<LaunchError>().is_some() => {
                    return Err(err.context(format!(
                        "Aborted ingestion at {}",
                        jar_path.display()
                    )));
                }
                Err(err) => {
                    report.failed_jars += 1;
                    tracing::error!(jar = %jar_path.display(), error = %format!("{err:#}"), "failed to ingest jar");
                }
            }
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            scanned = report.scanned_jars,
            ingested = report.ingested_jars,
            skipped = report.skipped_jars,
            failed = report.failed_jars,
            classes = report.classes_added,
            "ingestion finished"
        );
        Ok(report)
    }

    pub fn ingest_jar(
        &self,
        jar_path: &Path,
        on_class: &(dyn Fn(&ClassRow) + Sync),
    ) -> Result<JarOutcome> {
        let filename = jar_file_name(jar_path)
            .with_context(|| format!("Jar path has no file name: {}", jar_path.display()))?;

        if self.store.contains_archive(&filename)? {
            tracing::debug!(jar = %filename, "already indexed");
            return Ok(JarOutcome::Skipped);
        }

        let hash = hash_file(jar_path)?;
        let Some(archive_id) = self.store.claim_archive(&filename, &hash)? else {
            return Ok(JarOutcome::Skipped);
        };

        let extraction = self.unzip.extract(jar_path)?;
        let root = extraction.root();
        let classes: Vec<String> = catalog(root).collect();

        if classes.is_empty() {
            match extraction.outcome() {
                ExtractOutcome::Complete => {
                    tracing::warn!(jar = %filename, "jar contains no classes")
                }
                ExtractOutcome::Partial(reason) => {
                    tracing::warn!(jar = %filename, %reason, "jar could not be unpacked; no classes indexed")
                }
            }
        }

        let stats = self.pool.install(|| {
            classes
                .par_iter()
                .map(|fqn| self.index_class(archive_id, root, fqn, on_class))
                .try_reduce(JarStats::default, |a, b| Ok(a.merge(b)))
        })?;

        tracing::info!(
            jar = %filename,
            archive_id,
            fingerprinted = stats.fingerprinted,
            absent = stats.absent,
            failed = stats.failed,
            "indexed jar"
        );
        Ok(JarOutcome::Ingested { archive_id, stats })
    }

    fn index_class(
        &self,
        archive_id: i64,
        classpath: &Path,
        fqn: &str,
        on_class: &(dyn Fn(&ClassRow) + Sync),
    ) -> Result<JarStats, LaunchError> {
        let fingerprint = match self.resolver.resolve(classpath, fqn) {
            Ok(fingerprint) => fingerprint,
            Err(ResolveError::Launch(err)) => return Err(err),
            Err(err) => {
                tracing::error!(class = fqn, error = %err, "failed to resolve serialVersionUID");
                return Ok(JarStats {
                    failed: 1,
                    ..JarStats::default()
                });
            }
        };

        if let Err(err) = self
            .store
            .insert_class(archive_id, fqn, fingerprint.as_deref())
        {
            tracing::error!(class = fqn, error = %format!("{err:#}"), "failed to record class");
            return Ok(JarStats {
                failed: 1,
                ..JarStats::default()
            });
        }

        let row = ClassRow {
            archive_id,
            fqn: fqn.to_string(),
            fingerprint,
        };
        on_class(&row);

        if row.fingerprint.is_some() {
            Ok(JarStats {
                fingerprinted: 1,
                ..JarStats::default()
            })
        } else {
            Ok(JarStats {
                absent: 1,
                ..JarStats::default()
            })
        }
    }
}
