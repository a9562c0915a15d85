//! Running the external `git log` producer
//!
//! The log text is produced by the `git` binary rather than libgit2 so that
//! history filters (`--since`, `--author`, branch names) behave exactly as
//! they do on the command line.

use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;
use tracing::debug;

use super::log::PRETTY_FORMAT;
use crate::config::{Filters, RepositoryConfig};

/// Failures of the log producer. All of them are fatal for the run.
#[derive(Error, Debug)]
pub enum GitError {
    #[error("failed to run git in {}: {source}", .path.display())]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("git log failed in {} ({status}): {stderr}", .path.display())]
    CommandFailed {
        path: PathBuf,
        status: String,
        stderr: String,
    },
}

/// Produces raw log text for a repository.
pub trait LogSource: Send + Sync {
    fn fetch(&self, repo: &RepositoryConfig, filters: &Filters) -> Result<String, GitError>;
}

/// [`LogSource`] backed by the `git` executable.
#[derive(Debug, Clone)]
pub struct GitCli {
    program: PathBuf,
}

impl GitCli {
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("git"),
        }
    }

    /// Use a specific git binary.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new()
    }
}

impl LogSource for GitCli {
    fn fetch(&self, repo: &RepositoryConfig, filters: &Filters) -> Result<String, GitError> {
        let args = log_args(filters);
        debug!("Running {} {} in {}", self.program.display(), args.join(" "), repo.path.display());

        let output = Command::new(&self.program)
            .args(&args)
            .current_dir(&repo.path)
            .output()
            .map_err(|source| GitError::Spawn {
                path: repo.path.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(GitError::CommandFailed {
                path: repo.path.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Arguments for `git log`, filters appended after the fixed flags.
pub fn log_args(filters: &Filters) -> Vec<String> {
    let mut args = vec![
        "-c".to_string(),
        "core.quotepath=off".to_string(),
        "log".to_string(),
        "--numstat".to_string(),
        format!("--pretty=format:{}", PRETTY_FORMAT),
    ];

    if let Some(since) = filters.since() {
        args.push(format!("--since={}", since));
    }
    if let Some(until) = filters.until() {
        args.push(format!("--until={}", until));
    }
    for author in filters.authors() {
        args.push(format!("--author={}", author));
    }
    if let Some(branch) = filters.branch() {
        args.push(branch.to_string());
    }

    args
}

/// Check that `path` is the root of a git repository.
pub fn is_git_repository(path: &Path) -> bool {
    git2::Repository::open(path).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_args_without_filters() {
        let args = log_args(&Filters::default());
        assert_eq!(
            args,
            vec![
                "-c",
                "core.quotepath=off",
                "log",
                "--numstat",
                "--pretty=format:%H%x00%an%x00%ae%x00%ai%x00%s%x00",
            ]
        );
    }

    #[test]
    fn test_log_args_with_filters() {
        let filters = Filters {
            since: Some("2024-01-01".to_string()),
            until: Some("".to_string()),
            authors: vec!["alice".to_string(), "bob@example.com".to_string()],
            branch: Some("release/1.0".to_string()),
        };

        let args = log_args(&filters);
        let tail: Vec<&str> = args[5..].iter().map(String::as_str).collect();
        assert_eq!(
            tail,
            vec![
                "--since=2024-01-01",
                "--author=alice",
                "--author=bob@example.com",
                "release/1.0",
            ]
        );
    }

    #[test]
    fn test_missing_binary_is_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let git = GitCli::with_program("/nonexistent/git-binary");
        let repo = RepositoryConfig {
            path: dir.path().to_path_buf(),
            name: "x".to_string(),
        };

        let err = git.fetch(&repo, &Filters::default()).unwrap_err();
        assert!(matches!(err, GitError::Spawn { .. }));
    }

    #[test]
    fn test_is_git_repository() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!is_git_repository(dir.path()));
        git2::Repository::init(dir.path()).unwrap();
        assert!(is_git_repository(dir.path()));
    }
}
