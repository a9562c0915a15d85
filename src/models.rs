//! Core data models for gitreport
//!
//! These models flow between the log parser, the report store and the
//! contribution aggregator.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A repository row in the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub id: i64,
    pub name: String,
    pub path: String,
}

/// One commit extracted from the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// Full commit hash
    pub hash: String,
    /// Author display name
    pub author_name: String,
    /// Author email, used as the identity for aggregation
    pub author_email: String,
    /// Author timestamp with its original offset
    pub timestamp: DateTime<FixedOffset>,
    /// Commit subject line
    pub message: String,
}

/// How a file was touched by a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeType {
    Added,
    Modified,
    Deleted,
    Renamed,
}

impl ChangeType {
    /// Infer the change type from numstat counts.
    ///
    /// Renames are detected from the path field, not from the counts.
    pub fn infer(additions: u64, deletions: u64) -> Self {
        match (additions, deletions) {
            (a, 0) if a > 0 => ChangeType::Added,
            (0, d) if d > 0 => ChangeType::Deleted,
            _ => ChangeType::Modified,
        }
    }

    /// Single-letter code stored in `file_changes.change_type`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Added => "A",
            ChangeType::Modified => "M",
            ChangeType::Deleted => "D",
            ChangeType::Renamed => "R",
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(ChangeType::Added),
            "M" => Ok(ChangeType::Modified),
            "D" => Ok(ChangeType::Deleted),
            "R" => Ok(ChangeType::Renamed),
            other => Err(format!("unknown change type '{}'", other)),
        }
    }
}

/// One numstat line of a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    pub commit_hash: String,
    /// Path after the change (the new path for renames)
    pub filepath: String,
    pub additions: u64,
    pub deletions: u64,
    pub change_type: ChangeType,
}

/// A commit together with the file changes listed under it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub commit: Commit,
    pub changes: Vec<FileChange>,
}

/// A named group of `repository:pattern` entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    pub id: i64,
    pub name: String,
    pub patterns: Vec<String>,
}

/// A stored file change joined with its owning commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRow {
    pub commit_hash: String,
    pub author_name: String,
    pub author_email: String,
    pub filepath: String,
    pub additions: u64,
    pub deletions: u64,
}

/// Identity of one contribution record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContributionKey {
    pub component_id: i64,
    pub repository_id: i64,
    pub author_email: String,
}

/// Per (component, repository, author) totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionRecord {
    pub component_id: i64,
    pub repository_id: i64,
    pub author_email: String,
    pub author_name: String,
    /// Distinct commits with at least one matching file
    pub commit_count: u64,
    pub total_additions: u64,
    pub total_deletions: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_type_inference() {
        assert_eq!(ChangeType::infer(10, 0), ChangeType::Added);
        assert_eq!(ChangeType::infer(0, 4), ChangeType::Deleted);
        assert_eq!(ChangeType::infer(3, 2), ChangeType::Modified);
        assert_eq!(ChangeType::infer(0, 0), ChangeType::Modified);
    }

    #[test]
    fn test_change_type_codes() {
        for ct in [
            ChangeType::Added,
            ChangeType::Modified,
            ChangeType::Deleted,
            ChangeType::Renamed,
        ] {
            assert_eq!(ct.as_str().parse::<ChangeType>(), Ok(ct));
        }
        assert!("X".parse::<ChangeType>().is_err());
    }
}
