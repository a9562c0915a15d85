//! Git history ingestion
//!
//! Runs `git log --numstat` for a repository and parses its output into
//! commits and file changes.
//!
//! # Example
//!
//! ```no_run
//! use gitreport::config::{Filters, RepositoryConfig};
//! use gitreport::git::{GitCli, LogParser, LogSource};
//!
//! let repo = RepositoryConfig { path: "/path/to/repo".into(), name: "repo".into() };
//! let text = GitCli::new().fetch(&repo, &Filters::default()).unwrap();
//!
//! for entry in LogParser::new(text.as_bytes()) {
//!     let entry = entry.unwrap();
//!     println!("{} touched {} files", entry.commit.hash, entry.changes.len());
//! }
//! ```

pub mod command;
pub mod log;

pub use command::{is_git_repository, log_args, GitCli, GitError, LogSource};
pub use log::{LogParser, ParseStats, SkipReason};
