//! SQLite index of jars and the classes found in them.
//!
//! Every write is committed before the call returns. Rows are never updated
//! or deleted by the ingestion pipeline.

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Idempotent DDL, run on every open.
const SCHEMA: &str = "
PRAGMA foreign_keys = ON;

-- id aliases the implicit rowid so class rows can reference it.
CREATE TABLE IF NOT EXISTS archive (
    id       INTEGER PRIMARY KEY,
    filename TEXT,
    hash     TEXT
);

CREATE TABLE IF NOT EXISTS class (
    archiveId          INTEGER REFERENCES archive(id) ON DELETE CASCADE,
    fullyQualifiedName TEXT,
    fingerprint        TEXT
);

CREATE INDEX IF NOT EXISTS archive_filename_idx ON archive(filename);
CREATE INDEX IF NOT EXISTS class_archive_idx    ON class(archiveId);
";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassRow {
    pub archive_id: i64,
    pub fqn: String,
    pub fingerprint: Option<String>,
}

/// Shared handle to the index database. The connection sits behind a mutex
/// so resolver threads can insert class rows directly.
#[derive(Debug)]
pub struct IndexStore {
    conn: Mutex<Connection>,
}

impl IndexStore {
    pub fn open(db_path: &Path) -> Result<Self> {
        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open database: {}", db_path.display()))?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)
            .context("Failed to initialise database schema")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("database connection lock poisoned"))
    }

    pub fn contains_archive(&self, filename: &str) -> Result<bool> {
        let conn = self.conn()?;
        contains(&conn, filename)
    }

    pub fn insert_archive(&self, filename: &str, hash: &str) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO archive(filename, hash) VALUES (?1, ?2)",
            params![filename, hash],
        )
        .with_context(|| format!("Failed to insert jar {filename}"))?;
        Ok(conn.last_insert_rowid())
    }

    /// Inserts the archive row unless `filename` is already indexed, as one
    /// transaction under the connection lock. Returns the new row id, or
    /// `None` if the filename was present.
    pub fn claim_archive(&self, filename: &str, hash: &str) -> Result<Option<i64>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        if contains(&tx, filename)? {
            return Ok(None);
        }
        tx.execute(
            "INSERT INTO archive(filename, hash) VALUES (?1, ?2)",
            params![filename, hash],
        )
        .with_context(|| format!("Failed to insert jar {filename}"))?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(Some(id))
    }

    pub fn insert_class(&self, archive_id: i64, fqn: &str, fingerprint: Option<&str>) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO class(archiveId, fullyQualifiedName, fingerprint) VALUES (?1, ?2, ?3)",
            params![archive_id, fqn, fingerprint],
        )
        .with_context(|| format!("Failed to insert class {fqn}"))?;
        Ok(())
    }

    pub fn archive_id(&self, filename: &str) -> Result<Option<i64>> {
        let conn = self.conn()?;
        Ok(conn
            .query_row(
                "SELECT id FROM archive WHERE filename = ?1 ORDER BY id LIMIT 1",
                params![filename],
                |r| r.get(0),
            )
            .optional()?)
    }

    pub fn archive_hash(&self, filename: &str) -> Result<Option<String>> {
        let conn = self.conn()?;
        Ok(conn
            .query_row(
                "SELECT hash FROM archive WHERE filename = ?1 ORDER BY id LIMIT 1",
                params![filename],
                |r| r.get(0),
            )
            .optional()?)
    }

    pub fn classes_of(&self, archive_id: i64) -> Result<Vec<ClassRow>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT archiveId, fullyQualifiedName, fingerprint FROM class
             WHERE archiveId = ?1 ORDER BY fullyQualifiedName",
        )?;
        let rows = stmt.query_map(params![archive_id], |r| {
            Ok(ClassRow {
                archive_id: r.get(0)?,
                fqn: r.get(1)?,
                fingerprint: r.get(2)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn archive_count(&self) -> Result<u64> {
        self.count("SELECT COUNT(*) FROM archive")
    }

    pub fn class_count(&self) -> Result<u64> {
        self.count("SELECT COUNT(*) FROM class")
    }

    fn count(&self, sql: &str) -> Result<u64> {
        let conn = self.conn()?;
        let n: i64 = conn.query_row(sql, [], |r| r.get(0))?;
        Ok(n as u64)
    }
}

fn contains(conn: &Connection, filename: &str) -> Result<bool> {
    Ok(conn
        .query_row(
            "SELECT 1 FROM archive WHERE filename = ?1 LIMIT 1",
            params![filename],
            |_| Ok(true),
        )
        .optional()?
        .unwrap_or(false))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_lookup_archive() -> Result<()> {
        let store = IndexStore::open_in_memory()?;
        assert!(!store.contains_archive("a.jar")?);

        let id = store.insert_archive("a.jar", "abc")?;
        assert!(store.contains_archive("a.jar")?);
        assert_eq!(store.archive_id("a.jar")?, Some(id));
        assert_eq!(store.archive_hash("a.jar")?, Some("abc".to_string()));
        assert!(!store.contains_archive("b.jar")?);
        Ok(())
    }

    #[test]
    fn claim_archive_is_a_dedup_gate() -> Result<()> {
        let store = IndexStore::open_in_memory()?;
        let first = store.claim_archive("a.jar", "h1")?;
        assert!(first.is_some());
        assert_eq!(store.claim_archive("a.jar", "h2")?, None);
        assert_eq!(store.archive_count()?, 1);
        assert_eq!(store.archive_hash("a.jar")?, Some("h1".to_string()));
        Ok(())
    }

    #[test]
    fn class_rows_keep_absent_fingerprints() -> Result<()> {
        let store = IndexStore::open_in_memory()?;
        let id = store.insert_archive("a.jar", "h")?;
        store.insert_class(id, "com.example.Widget", Some("-12"))?;
        store.insert_class(id, "com.example.Plain", None)?;

        let rows = store.classes_of(id)?;
        assert_eq!(
            rows,
            vec![
                ClassRow {
                    archive_id: id,
                    fqn: "com.example.Plain".to_string(),
                    fingerprint: None,
                },
                ClassRow {
                    archive_id: id,
                    fqn: "com.example.Widget".to_string(),
                    fingerprint: Some("-12".to_string()),
                },
            ]
        );
        assert_eq!(store.class_count()?, 2);
        Ok(())
    }

    #[test]
    fn class_must_reference_existing_archive() -> Result<()> {
        let store = IndexStore::open_in_memory()?;
        assert!(store.insert_class(99, "a.B", None).is_err());
        Ok(())
    }

    #[test]
    fn reopening_file_keeps_rows_and_schema() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let db = dir.path().join("java.sqlite");
        std::fs::write(&db, b"")?;

        {
            let store = IndexStore::open(&db)?;
            let id = store.insert_archive("a.jar", "h")?;
            store.insert_class(id, "a.B", Some("1"))?;
        }

        let store = IndexStore::open(&db)?;
        assert_eq!(store.archive_count()?, 1);
        assert_eq!(store.class_count()?, 1);
        Ok(())
    }
}
