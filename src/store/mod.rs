//! SQLite report store
//!
//! Persists repositories, commits, file changes, components and the
//! computed contribution records. Every write group runs inside a single
//! transaction so a failure never leaves half a repository (or half an
//! aggregate pass) behind.

mod schema;

pub use schema::SCHEMA;

use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use std::path::Path;
use tracing::debug;

use crate::config::ComponentConfig;
use crate::models::{ChangeRow, Component, ContributionRecord, LogEntry, Repository};

/// Rows written by one [`ReportStore::ingest`] call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestCounts {
    pub commits: usize,
    pub file_changes: usize,
}

/// Row counts of every table.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StoreCounts {
    pub repositories: usize,
    pub commits: usize,
    pub file_changes: usize,
    pub components: usize,
    pub contributions: usize,
}

/// Handle on a report database.
pub struct ReportStore {
    conn: Connection,
}

impl ReportStore {
    /// Create a fresh report at `path`, replacing any existing file.
    pub fn create(path: &Path) -> Result<Self> {
        if path.exists() {
            std::fs::remove_file(path)
                .with_context(|| format!("Failed to remove existing report {}", path.display()))?;
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open report database {}", path.display()))?;
        debug!("Created report database at {}", path.display());
        Self::init(conn)
    }

    /// Open an existing report.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open report database {}", path.display()))?;
        Self::init(conn)
    }

    /// In-memory report, used by tests.
    pub fn in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        conn.execute_batch(SCHEMA)
            .context("Failed to create report schema")?;
        Ok(Self { conn })
    }

    /// Insert a repository and return its id.
    pub fn insert_repository(&self, name: &str, path: &str) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO repositories (name, path) VALUES (?1, ?2)",
                params![name, path],
            )
            .with_context(|| format!("Failed to insert repository {}", name))?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Insert all components in one transaction.
    ///
    /// Patterns are stored as a JSON array, exactly as configured.
    pub fn insert_components(&mut self, components: &[ComponentConfig]) -> Result<Vec<Component>> {
        let tx = self.conn.transaction()?;
        let mut inserted = Vec::with_capacity(components.len());
        {
            let mut stmt =
                tx.prepare("INSERT INTO components (name, path_patterns) VALUES (?1, ?2)")?;
            for component in components {
                let patterns = serde_json::to_string(&component.paths)?;
                stmt.execute(params![component.name, patterns])
                    .with_context(|| format!("Failed to insert component {}", component.name))?;
                inserted.push(Component {
                    id: tx.last_insert_rowid(),
                    name: component.name.clone(),
                    patterns: component.paths.clone(),
                });
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    /// Write every commit and file change of one repository atomically.
    ///
    /// An error from `entries` or from SQLite rolls the whole repository
    /// back.
    pub fn ingest<I, E>(&mut self, repository_id: i64, entries: I) -> Result<IngestCounts>
    where
        I: IntoIterator<Item = Result<LogEntry, E>>,
        E: std::error::Error + Send + Sync + 'static,
    {
        let tx = self.conn.transaction()?;
        let mut counts = IngestCounts::default();
        {
            let mut commit_stmt = tx.prepare(
                "INSERT INTO commits (hash, repository_id, author, email, date, message)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            let mut change_stmt = tx.prepare(
                "INSERT INTO file_changes (commit_hash, filepath, additions, deletions, change_type)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;

            for entry in entries {
                let entry = entry?;
                let commit = &entry.commit;
                commit_stmt
                    .execute(params![
                        commit.hash,
                        repository_id,
                        commit.author_name,
                        commit.author_email,
                        commit.timestamp.to_rfc3339(),
                        commit.message,
                    ])
                    .with_context(|| format!("Failed to insert commit {}", commit.hash))?;
                counts.commits += 1;

                for change in &entry.changes {
                    change_stmt
                        .execute(params![
                            change.commit_hash,
                            change.filepath,
                            sql_int(change.additions, "additions")?,
                            sql_int(change.deletions, "deletions")?,
                            change.change_type.as_str(),
                        ])
                        .with_context(|| {
                            format!("Failed to insert change {} in {}", change.filepath, commit.hash)
                        })?;
                    counts.file_changes += 1;
                }
            }
        }
        tx.commit()?;
        Ok(counts)
    }

    /// File changes of one repository joined with their commits, in
    /// insertion order.
    pub fn changes_for_repository(&self, repository_id: i64) -> Result<Vec<ChangeRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT c.hash, c.author, c.email, fc.filepath, fc.additions, fc.deletions
             FROM commits c
             JOIN file_changes fc ON c.hash = fc.commit_hash
             WHERE c.repository_id = ?1
             ORDER BY fc.id",
        )?;
        let rows = stmt.query_map(params![repository_id], |row| {
            Ok(ChangeRow {
                commit_hash: row.get(0)?,
                author_name: row.get(1)?,
                author_email: row.get(2)?,
                filepath: row.get(3)?,
                additions: get_count(row, 4)?,
                deletions: get_count(row, 5)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Replace all contribution records in one transaction.
    pub fn replace_contributions(&mut self, records: &[ContributionRecord]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM component_contributions", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO component_contributions
                 (component_id, repository_id, author, email, commit_count, total_additions, total_deletions)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for record in records {
                stmt.execute(params![
                    record.component_id,
                    record.repository_id,
                    record.author_name,
                    record.author_email,
                    sql_int(record.commit_count, "commit_count")?,
                    sql_int(record.total_additions, "total_additions")?,
                    sql_int(record.total_deletions, "total_deletions")?,
                ])
                .with_context(|| {
                    format!(
                        "Failed to insert contribution of {} to component {}",
                        record.author_email, record.component_id
                    )
                })?;
            }
        }
        tx.commit()?;
        Ok(records.len())
    }

    /// All contribution records, ordered by component, repository and email.
    pub fn contributions(&self) -> Result<Vec<ContributionRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT component_id, repository_id, email, author, commit_count, total_additions, total_deletions
             FROM component_contributions
             ORDER BY component_id, repository_id, email",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(ContributionRecord {
                component_id: row.get(0)?,
                repository_id: row.get(1)?,
                author_email: row.get(2)?,
                author_name: row.get(3)?,
                commit_count: get_count(row, 4)?,
                total_additions: get_count(row, 5)?,
                total_deletions: get_count(row, 6)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// All repositories ordered by id.
    pub fn repositories(&self) -> Result<Vec<Repository>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, path FROM repositories ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok(Repository {
                id: row.get(0)?,
                name: row.get(1)?,
                path: row.get(2)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// All components ordered by id, patterns decoded from JSON.
    pub fn components(&self) -> Result<Vec<Component>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, path_patterns FROM components ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut components = Vec::new();
        for row in rows {
            let (id, name, patterns) = row?;
            let patterns: Vec<String> = serde_json::from_str(&patterns)
                .with_context(|| format!("Invalid path_patterns for component {}", name))?;
            components.push(Component { id, name, patterns });
        }
        Ok(components)
    }

    pub fn counts(&self) -> Result<StoreCounts> {
        let count = |table: &str| -> Result<usize> {
            let n: i64 = self
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;
            Ok(n as usize)
        };
        Ok(StoreCounts {
            repositories: count("repositories")?,
            commits: count("commits")?,
            file_changes: count("file_changes")?,
            components: count("components")?,
            contributions: count("component_contributions")?,
        })
    }
}

/// SQLite integers are signed 64-bit.
fn sql_int(value: u64, field: &str) -> Result<i64> {
    i64::try_from(value)
        .with_context(|| format!("{} value {} exceeds the SQLite integer range", field, value))
}

fn get_count(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<u64> {
    let value: i64 = row.get(idx)?;
    u64::try_from(value).map_err(|_| rusqlite::Error::IntegralValueOutOfRange(idx, value))
}

#[cfg(test)]
mod tests;
