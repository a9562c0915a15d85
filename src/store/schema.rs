//! Report database schema

/// Tables and indexes of a report. Applied to a freshly created database.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS repositories (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT UNIQUE NOT NULL,
    path TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS commits (
    hash TEXT PRIMARY KEY,
    repository_id INTEGER NOT NULL,
    author TEXT NOT NULL,
    email TEXT NOT NULL,
    date DATETIME NOT NULL,
    message TEXT NOT NULL,
    FOREIGN KEY (repository_id) REFERENCES repositories(id)
);

CREATE TABLE IF NOT EXISTS file_changes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    commit_hash TEXT NOT NULL,
    filepath TEXT NOT NULL,
    additions INTEGER NOT NULL,
    deletions INTEGER NOT NULL,
    change_type TEXT NOT NULL,
    FOREIGN KEY (commit_hash) REFERENCES commits(hash)
);

CREATE TABLE IF NOT EXISTS components (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT UNIQUE NOT NULL,
    path_patterns TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS component_contributions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    component_id INTEGER NOT NULL,
    repository_id INTEGER NOT NULL,
    author TEXT NOT NULL,
    email TEXT NOT NULL,
    commit_count INTEGER NOT NULL,
    total_additions INTEGER NOT NULL,
    total_deletions INTEGER NOT NULL,
    FOREIGN KEY (component_id) REFERENCES components(id),
    FOREIGN KEY (repository_id) REFERENCES repositories(id)
);

CREATE INDEX IF NOT EXISTS idx_commits_repo ON commits(repository_id);
CREATE INDEX IF NOT EXISTS idx_file_changes_commit ON file_changes(commit_hash);
CREATE INDEX IF NOT EXISTS idx_component_contributions_component ON component_contributions(component_id);
"#;
