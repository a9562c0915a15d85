//! Report configuration
//!
//! Describes which repositories to ingest, how to filter their history and
//! which components to aggregate contributions for.
//!
//! # Configuration Format
//!
//! ```yaml
//! # report.yaml
//! output: report.db
//!
//! repositories:
//!   - name: backend
//!     path: ../backend
//!   - name: web
//!     path: ../web
//!
//! filters:
//!   since: "2024-01-01"
//!   until: "2024-12-31"
//!   authors: ["alice@example.com"]
//!   branch: main
//!
//! components:
//!   - name: API
//!     paths:
//!       - "backend:src/api/**"
//!       - "web:src/client/api/*.ts"
//! ```
//!
//! TOML (`report.toml`) and JSON (`report.json`) files with the same shape
//! are accepted as well; the format is chosen by file extension.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::git;

/// Config file used when none is given on the command line.
pub const DEFAULT_CONFIG_PATH: &str = "report.yaml";

/// Report database written when the config has no `output`.
pub const DEFAULT_OUTPUT_PATH: &str = "report.db";

/// Errors found while loading or validating a configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("no repositories specified")]
    NoRepositories,

    #[error("repository name is required")]
    MissingRepositoryName,

    #[error("repository path is required for '{0}'")]
    MissingRepositoryPath(String),

    #[error("invalid git repository: {}", .0.display())]
    InvalidRepository(PathBuf),

    #[error("duplicate repository name '{0}'")]
    DuplicateRepository(String),

    #[error("component name is required")]
    MissingComponentName,

    #[error("duplicate component name '{0}'")]
    DuplicateComponent(String),
}

/// Top-level report configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Path of the SQLite report (default: report.db)
    #[serde(default)]
    pub output: Option<PathBuf>,

    /// Repositories to ingest, in processing order
    #[serde(default)]
    pub repositories: Vec<RepositoryConfig>,

    /// History filters applied to every repository
    #[serde(default)]
    pub filters: Filters,

    /// Components to aggregate contributions for
    #[serde(default)]
    pub components: Vec<ComponentConfig>,
}

/// A repository to ingest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    #[serde(default)]
    pub path: PathBuf,

    /// Unique name, referenced by component patterns
    #[serde(default)]
    pub name: String,
}

/// History filters passed through to `git log`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filters {
    #[serde(default)]
    pub since: Option<String>,

    #[serde(default)]
    pub until: Option<String>,

    /// Author patterns; a commit matching any of them is kept
    #[serde(default)]
    pub authors: Vec<String>,

    #[serde(default)]
    pub branch: Option<String>,
}

impl Filters {
    pub fn since(&self) -> Option<&str> {
        non_empty(&self.since)
    }

    pub fn until(&self) -> Option<&str> {
        non_empty(&self.until)
    }

    pub fn branch(&self) -> Option<&str> {
        non_empty(&self.branch)
    }

    /// Author filters, ignoring blank entries.
    pub fn authors(&self) -> impl Iterator<Item = &str> {
        self.authors
            .iter()
            .map(|a| a.trim())
            .filter(|a| !a.is_empty())
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// A named component.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentConfig {
    #[serde(default)]
    pub name: String,

    /// Entries of the form `<repository>:<glob pattern>`
    #[serde(default)]
    pub paths: Vec<String>,
}

/// Load a report configuration from `path`.
///
/// The format follows the extension: `.toml`, `.json`, anything else is
/// read as YAML. Relative repository paths are resolved against the
/// directory containing the config file.
pub fn load_report_config(path: &Path) -> Result<ReportConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    let parsed = match extension.as_deref() {
        Some("toml") => toml::from_str::<ReportConfig>(&content).map_err(|e| e.to_string()),
        Some("json") => serde_json::from_str::<ReportConfig>(&content).map_err(|e| e.to_string()),
        _ => serde_yaml::from_str::<ReportConfig>(&content).map_err(|e| e.to_string()),
    };

    let mut config = parsed.map_err(|message| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    })?;

    let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
    config.resolve_paths(base_dir);

    debug!(
        "Loaded config from {}: {} repositories, {} components",
        path.display(),
        config.repositories.len(),
        config.components.len()
    );
    Ok(config)
}

impl ReportConfig {
    /// Where the report database goes.
    pub fn output_path(&self) -> PathBuf {
        match &self.output {
            Some(p) if !p.as_os_str().is_empty() => p.clone(),
            _ => PathBuf::from(DEFAULT_OUTPUT_PATH),
        }
    }

    /// Make relative repository paths relative to `base_dir`.
    pub fn resolve_paths(&mut self, base_dir: &Path) {
        for repo in &mut self.repositories {
            if !repo.path.as_os_str().is_empty() && repo.path.is_relative() {
                repo.path = base_dir.join(&repo.path);
            }
        }
    }

    /// Check the configuration, including that every repository path is a
    /// git repository.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_structure()?;

        for repo in &self.repositories {
            if !git::is_git_repository(&repo.path) {
                return Err(ConfigError::InvalidRepository(repo.path.clone()));
            }
        }
        Ok(())
    }

    /// Checks that need no filesystem access.
    pub fn validate_structure(&self) -> Result<(), ConfigError> {
        if self.repositories.is_empty() {
            return Err(ConfigError::NoRepositories);
        }

        let mut names = HashSet::new();
        for repo in &self.repositories {
            if repo.name.trim().is_empty() {
                return Err(ConfigError::MissingRepositoryName);
            }
            if repo.path.as_os_str().is_empty() {
                return Err(ConfigError::MissingRepositoryPath(repo.name.clone()));
            }
            if !names.insert(repo.name.as_str()) {
                return Err(ConfigError::DuplicateRepository(repo.name.clone()));
            }
        }

        let mut components = HashSet::new();
        for component in &self.components {
            if component.name.trim().is_empty() {
                return Err(ConfigError::MissingComponentName);
            }
            if !components.insert(component.name.as_str()) {
                return Err(ConfigError::DuplicateComponent(component.name.clone()));
            }
        }

        Ok(())
    }
}
