use super::*;
use crate::models::{ChangeType, Commit, FileChange};
use chrono::DateTime;
use std::io;

fn entry(hash: &str, email: &str, changes: &[(&str, u64, u64)]) -> LogEntry {
    LogEntry {
        commit: Commit {
            hash: hash.to_string(),
            author_name: email.split('@').next().unwrap_or_default().to_string(),
            author_email: email.to_string(),
            timestamp: DateTime::parse_from_rfc3339("2024-03-01T10:00:00+01:00").unwrap(),
            message: format!("commit {}", hash),
        },
        changes: changes
            .iter()
            .map(|(path, add, del)| FileChange {
                commit_hash: hash.to_string(),
                filepath: path.to_string(),
                additions: *add,
                deletions: *del,
                change_type: ChangeType::infer(*add, *del),
            })
            .collect(),
    }
}

fn ok_entries(entries: Vec<LogEntry>) -> impl Iterator<Item = Result<LogEntry, io::Error>> {
    entries.into_iter().map(Ok)
}

#[test]
fn test_ingest_and_read_back() {
    let mut store = ReportStore::in_memory().unwrap();
    let repo_id = store.insert_repository("core", "/repos/core").unwrap();

    let counts = store
        .ingest(
            repo_id,
            ok_entries(vec![
                entry("h1", "alice@example.com", &[("src/a.rs", 10, 2), ("src/b.rs", 1, 0)]),
                entry("h2", "bob@example.com", &[("README.md", 0, 3)]),
            ]),
        )
        .unwrap();
    assert_eq!(counts, IngestCounts { commits: 2, file_changes: 3 });

    let rows = store.changes_for_repository(repo_id).unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].commit_hash, "h1");
    assert_eq!(rows[0].filepath, "src/a.rs");
    assert_eq!(rows[0].additions, 10);
    assert_eq!(rows[0].deletions, 2);
    assert_eq!(rows[0].author_name, "alice");
    assert_eq!(rows[2].author_email, "bob@example.com");

    let counts = store.counts().unwrap();
    assert_eq!(counts.repositories, 1);
    assert_eq!(counts.commits, 2);
    assert_eq!(counts.file_changes, 3);
}

#[test]
fn test_rows_are_scoped_to_repository() {
    let mut store = ReportStore::in_memory().unwrap();
    let a = store.insert_repository("a", "/a").unwrap();
    let b = store.insert_repository("b", "/b").unwrap();

    store.ingest(a, ok_entries(vec![entry("ha", "x@x.io", &[("a.rs", 1, 1)])])).unwrap();
    store.ingest(b, ok_entries(vec![entry("hb", "y@y.io", &[("b.rs", 2, 2)])])).unwrap();

    let rows = store.changes_for_repository(b).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].filepath, "b.rs");
}

#[test]
fn test_failed_ingest_rolls_back_repository() {
    let mut store = ReportStore::in_memory().unwrap();
    let repo_id = store.insert_repository("core", "/repos/core").unwrap();

    // Duplicate commit hash violates the primary key half way through
    let result = store.ingest(
        repo_id,
        ok_entries(vec![
            entry("h1", "alice@example.com", &[("a.rs", 1, 0)]),
            entry("h1", "alice@example.com", &[("b.rs", 1, 0)]),
        ]),
    );
    assert!(result.is_err());

    let counts = store.counts().unwrap();
    assert_eq!(counts.commits, 0);
    assert_eq!(counts.file_changes, 0);
}

#[test]
fn test_source_error_rolls_back_repository() {
    let mut store = ReportStore::in_memory().unwrap();
    let repo_id = store.insert_repository("core", "/repos/core").unwrap();

    let entries: Vec<Result<LogEntry, io::Error>> = vec![
        Ok(entry("h1", "alice@example.com", &[("a.rs", 1, 0)])),
        Err(io::Error::other("stream broke")),
    ];
    assert!(store.ingest(repo_id, entries).is_err());
    assert_eq!(store.counts().unwrap().commits, 0);
}

#[test]
fn test_unknown_repository_violates_foreign_key() {
    let mut store = ReportStore::in_memory().unwrap();
    let result = store.ingest(42, ok_entries(vec![entry("h1", "a@x.io", &[])]));
    assert!(result.is_err());
}

#[test]
fn test_duplicate_repository_name_fails() {
    let store = ReportStore::in_memory().unwrap();
    store.insert_repository("core", "/a").unwrap();
    assert!(store.insert_repository("core", "/b").is_err());
}

#[test]
fn test_components_round_trip_patterns_as_json() {
    let mut store = ReportStore::in_memory().unwrap();
    let inserted = store
        .insert_components(&[
            ComponentConfig {
                name: "API".to_string(),
                paths: vec!["core:src/api/**".to_string(), "web:*.ts".to_string()],
            },
            ComponentConfig {
                name: "Docs".to_string(),
                paths: vec![],
            },
        ])
        .unwrap();
    assert_eq!(inserted.len(), 2);
    assert_ne!(inserted[0].id, inserted[1].id);

    let components = store.components().unwrap();
    assert_eq!(components, inserted);
}

#[test]
fn test_replace_contributions_is_full_recompute() {
    let mut store = ReportStore::in_memory().unwrap();
    let repo_id = store.insert_repository("core", "/core").unwrap();
    let components = store
        .insert_components(&[ComponentConfig {
            name: "All".to_string(),
            paths: vec!["core:**".to_string()],
        }])
        .unwrap();

    let record = |email: &str, commits: u64| ContributionRecord {
        component_id: components[0].id,
        repository_id: repo_id,
        author_email: email.to_string(),
        author_name: "Someone".to_string(),
        commit_count: commits,
        total_additions: 5,
        total_deletions: 1,
    };

    store
        .replace_contributions(&[record("b@x.io", 1), record("a@x.io", 2)])
        .unwrap();
    let stored = store.contributions().unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].author_email, "a@x.io");
    assert_eq!(stored[0].commit_count, 2);

    store.replace_contributions(&[record("c@x.io", 7)]).unwrap();
    let stored = store.contributions().unwrap();
    assert_eq!(stored, vec![record("c@x.io", 7)]);
}

#[test]
fn test_failed_contribution_write_keeps_previous_records() {
    let mut store = ReportStore::in_memory().unwrap();
    let repo_id = store.insert_repository("core", "/core").unwrap();
    let components = store
        .insert_components(&[ComponentConfig {
            name: "All".to_string(),
            paths: vec!["core:**".to_string()],
        }])
        .unwrap();

    let record = |component_id: i64, email: &str| ContributionRecord {
        component_id,
        repository_id: repo_id,
        author_email: email.to_string(),
        author_name: "Someone".to_string(),
        commit_count: 1,
        total_additions: 2,
        total_deletions: 3,
    };
    let previous = vec![record(components[0].id, "a@x.io")];
    store.replace_contributions(&previous).unwrap();

    // Unknown component id violates the foreign key after the delete ran
    let result = store.replace_contributions(&[
        record(components[0].id, "b@x.io"),
        record(999, "c@x.io"),
    ]);
    assert!(result.is_err());
    assert_eq!(store.contributions().unwrap(), previous);
}

#[test]
fn test_counts_beyond_sqlite_range_are_rejected() {
    let mut store = ReportStore::in_memory().unwrap();
    let repo_id = store.insert_repository("core", "/core").unwrap();

    let mut huge = entry("h1", "alice@example.com", &[("a.rs", 1, 0)]);
    huge.changes[0].additions = u64::MAX;
    let err = store.ingest(repo_id, ok_entries(vec![huge])).unwrap_err();
    assert!(format!("{:#}", err).contains("additions"));
    assert_eq!(store.counts().unwrap().commits, 0);

    let components = store
        .insert_components(&[ComponentConfig {
            name: "All".to_string(),
            paths: vec!["core:**".to_string()],
        }])
        .unwrap();
    let record = ContributionRecord {
        component_id: components[0].id,
        repository_id: repo_id,
        author_email: "a@x.io".to_string(),
        author_name: "A".to_string(),
        commit_count: i64::MAX as u64 + 1,
        total_additions: 0,
        total_deletions: 0,
    };
    assert!(store.replace_contributions(&[record]).is_err());
    assert!(store.contributions().unwrap().is_empty());
}

#[test]
fn test_create_replaces_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("report.db");

    {
        let store = ReportStore::create(&path).unwrap();
        store.insert_repository("old", "/old").unwrap();
    }
    assert!(path.exists());

    let store = ReportStore::create(&path).unwrap();
    assert_eq!(store.counts().unwrap(), StoreCounts::default());

    store.insert_repository("new", "/new").unwrap();
    drop(store);

    let reopened = ReportStore::open(&path).unwrap();
    let repos = reopened.repositories().unwrap();
    assert_eq!(repos.len(), 1);
    assert_eq!(repos[0].name, "new");
}
