//! Report pipeline
//!
//! Orchestrates a full report run:
//! 1. Create a fresh report store
//! 2. Register repositories and components
//! 3. Fetch and parse every repository's log
//! 4. Write each repository in its own transaction
//! 5. Aggregate component contributions and write them
//!
//! Aggregation only starts once every repository has been committed.

use anyhow::{Context, Result};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::collections::HashMap;
use std::convert::Infallible;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use crate::aggregate::compute_contributions;
use crate::config::{Filters, ReportConfig, RepositoryConfig};
use crate::git::{GitCli, LogParser, LogSource, ParseStats};
use crate::models::LogEntry;
use crate::store::ReportStore;

/// Full report pipeline over a log source.
pub struct ReportPipeline<S: LogSource = GitCli> {
    source: S,
    /// Repositories fetched concurrently (1 = sequential)
    workers: usize,
    /// Whether to draw progress spinners
    show_progress: bool,
}

/// A repository's log, fetched and parsed but not yet written.
struct ParsedLog {
    entries: Vec<LogEntry>,
    stats: ParseStats,
}

impl ReportPipeline<GitCli> {
    /// Pipeline reading history with the `git` executable.
    pub fn new() -> Self {
        Self::with_source(GitCli::new())
    }
}

impl Default for ReportPipeline<GitCli> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: LogSource> ReportPipeline<S> {
    pub fn with_source(source: S) -> Self {
        Self {
            source,
            workers: 1,
            show_progress: true,
        }
    }

    /// Fetch and parse up to `workers` repositories at once.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Disable progress spinners.
    pub fn without_progress(mut self) -> Self {
        self.show_progress = false;
        self
    }

    /// Run the pipeline, replacing any report at `output`.
    pub fn run(&self, config: &ReportConfig, output: &Path) -> Result<ReportSummary> {
        let mut store = ReportStore::create(output)?;
        self.run_with_store(&mut store, config)
    }

    /// Run the pipeline against an already created store.
    pub fn run_with_store(
        &self,
        store: &mut ReportStore,
        config: &ReportConfig,
    ) -> Result<ReportSummary> {
        config.validate_structure()?;
        let mut summary = ReportSummary::default();

        let mut repository_ids = HashMap::new();
        for repo in &config.repositories {
            let id = store.insert_repository(&repo.name, &repo.path.display().to_string())?;
            debug!("Registered repository {} as {}", repo.name, id);
            repository_ids.insert(repo.name.clone(), id);
        }
        summary.repositories = repository_ids.len();

        let components = store.insert_components(&config.components)?;
        summary.components = components.len();

        if self.workers > 1 && config.repositories.len() > 1 {
            self.ingest_parallel(store, config, &repository_ids, &mut summary)?;
        } else {
            self.ingest_sequential(store, config, &repository_ids, &mut summary)?;
        }

        let records = compute_contributions(store, &components, &repository_ids)?;
        summary.contributions = store.replace_contributions(&records)?;

        info!("Report complete: {}", summary.summary());
        Ok(summary)
    }

    /// Fetch, parse and write one repository at a time, streaming parsed
    /// commits straight into the store.
    fn ingest_sequential(
        &self,
        store: &mut ReportStore,
        config: &ReportConfig,
        repository_ids: &HashMap<String, i64>,
        summary: &mut ReportSummary,
    ) -> Result<()> {
        for repo in &config.repositories {
            let spinner = self.spinner(None, &repo.name);

            let text = self
                .source
                .fetch(repo, &config.filters)
                .with_context(|| format!("Failed to read history of {}", repo.name))?;

            spinner.set_message(format!("Ingesting {}...", repo.name));
            let mut parser = LogParser::new(text.as_bytes());
            let counts = store
                .ingest(repository_ids[&repo.name], parser.by_ref())
                .with_context(|| format!("Failed to store history of {}", repo.name))?;
            let stats = parser.stats();

            summary.add(counts.commits, counts.file_changes, &stats);
            spinner.finish_with_message(format!(
                "{}: {} commits, {} file changes",
                repo.name, counts.commits, counts.file_changes
            ));
        }
        Ok(())
    }

    /// Fetch and parse all repositories on a thread pool, then write them
    /// one by one. A fetch failure aborts before anything is written.
    fn ingest_parallel(
        &self,
        store: &mut ReportStore,
        config: &ReportConfig,
        repository_ids: &HashMap<String, i64>,
        summary: &mut ReportSummary,
    ) -> Result<()> {
        info!(
            "Fetching {} repositories with {} workers",
            config.repositories.len(),
            self.workers
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()?;

        let progress = MultiProgress::new();
        let parsed: Vec<ParsedLog> = pool.install(|| {
            config
                .repositories
                .par_iter()
                .map(|repo| {
                    let spinner = self.spinner(Some(&progress), &repo.name);
                    let parsed = self.fetch_and_parse(repo, &config.filters)?;
                    spinner.finish_with_message(format!(
                        "{}: {} commits parsed",
                        repo.name,
                        parsed.entries.len()
                    ));
                    Ok(parsed)
                })
                .collect::<Result<Vec<_>>>()
        })?;

        for (repo, log) in config.repositories.iter().zip(parsed) {
            let counts = store
                .ingest(
                    repository_ids[&repo.name],
                    log.entries.into_iter().map(Ok::<_, Infallible>),
                )
                .with_context(|| format!("Failed to store history of {}", repo.name))?;
            summary.add(counts.commits, counts.file_changes, &log.stats);
        }
        Ok(())
    }

    fn fetch_and_parse(&self, repo: &RepositoryConfig, filters: &Filters) -> Result<ParsedLog> {
        let text = self
            .source
            .fetch(repo, filters)
            .with_context(|| format!("Failed to read history of {}", repo.name))?;

        let mut parser = LogParser::new(text.as_bytes());
        let entries = parser
            .by_ref()
            .collect::<std::io::Result<Vec<_>>>()
            .with_context(|| format!("Failed to parse history of {}", repo.name))?;
        let stats = parser.stats();
        debug!(
            "Parsed {} commits from {} ({} lines skipped)",
            stats.commits,
            repo.name,
            stats.skipped()
        );

        Ok(ParsedLog { entries, stats })
    }

    fn spinner(&self, multi: Option<&MultiProgress>, name: &str) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let spinner = ProgressBar::new_spinner();
        let spinner = match multi {
            Some(multi) => multi.add(spinner),
            None => spinner,
        };
        spinner.set_style(spinner_style());
        spinner.set_message(format!("Reading history of {}...", name));
        spinner.enable_steady_tick(Duration::from_millis(100));
        spinner
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
        .template("{spinner:.green} {msg}")
        .expect("valid template")
}

/// Totals of a report run.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct ReportSummary {
    pub repositories: usize,
    pub commits: usize,
    pub file_changes: usize,
    /// Log lines dropped by the parser
    pub skipped_lines: usize,
    pub components: usize,
    /// Contribution records written
    pub contributions: usize,
}

impl ReportSummary {
    fn add(&mut self, commits: usize, file_changes: usize, stats: &ParseStats) {
        self.commits += commits;
        self.file_changes += file_changes;
        self.skipped_lines += stats.skipped();
    }

    /// Get a summary string.
    pub fn summary(&self) -> String {
        let mut parts = vec![
            format!("{} repositories", self.repositories),
            format!("{} commits", self.commits),
            format!("{} file changes", self.file_changes),
            format!("{} components", self.components),
            format!("{} contribution records", self.contributions),
        ];
        if self.skipped_lines > 0 {
            parts.push(format!("{} skipped log lines", self.skipped_lines));
        }
        parts.join(", ")
    }
}
