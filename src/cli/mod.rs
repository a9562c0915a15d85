//! CLI definition and entry point

mod report;

use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::{load_report_config, DEFAULT_CONFIG_PATH};
use crate::pipeline::ReportPipeline;
use crate::store::ReportStore;

pub use report::{print_top_contributors, top_contributors};

/// Parse and validate workers count (1-64)
fn parse_workers(s: &str) -> Result<usize, String> {
    let n: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if n == 0 {
        Err("workers must be at least 1".to_string())
    } else if n > 64 {
        Err("workers cannot exceed 64".to_string())
    } else {
        Ok(n)
    }
}

/// gitreport - per-component contribution reports from git history
#[derive(Parser, Debug)]
#[command(name = "gitreport")]
#[command(
    version,
    about = "Build a SQLite report of who contributed to which component across git repositories",
    after_help = "\
Examples:
  gitreport                          Use ./report.yaml
  gitreport team.yaml -v             Use team.yaml and print top contributors
  gitreport --dry-run -c team.toml   Only validate the configuration
  gitreport -o /tmp/out.db           Write the report elsewhere"
)]
pub struct Cli {
    /// Configuration file (takes precedence over --config)
    #[arg(value_name = "CONFIG")]
    pub config_path: Option<PathBuf>,

    /// Configuration file
    #[arg(short, long, env = "GITREPORT_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Log progress and print the top contributors of each component
    #[arg(short, long)]
    pub verbose: bool,

    /// Validate the configuration and exit
    #[arg(long)]
    pub dry_run: bool,

    /// Report database (overrides the configured output)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Number of repositories fetched in parallel (1-64)
    #[arg(long, default_value = "1", value_parser = parse_workers)]
    pub workers: usize,

    /// Contributors listed per component with --verbose
    #[arg(long, default_value = "5")]
    pub top: usize,
}

impl Cli {
    /// The configuration file to load.
    pub fn config_file(&self) -> &Path {
        self.config_path.as_deref().unwrap_or(&self.config)
    }

    /// Log filter used when `RUST_LOG` is not set.
    pub fn default_log_filter(&self) -> &'static str {
        if self.verbose {
            "info"
        } else {
            "warn"
        }
    }
}

pub fn run(cli: Cli) -> Result<()> {
    let config_file = cli.config_file();
    info!("Loading configuration from {}", config_file.display());

    let config = load_report_config(config_file)?;
    config.validate()?;

    if cli.dry_run {
        println!("Configuration is valid");
        return Ok(());
    }

    let output = cli.output.clone().unwrap_or_else(|| config.output_path());
    let summary = ReportPipeline::new()
        .with_workers(cli.workers)
        .run(&config, &output)
        .with_context(|| format!("Failed to build report {}", output.display()))?;

    println!(
        "{} Report written to {}",
        style("[OK]").green(),
        style(output.display()).cyan()
    );
    println!("  {}", summary.summary());

    if cli.verbose {
        let store = ReportStore::open(&output)?;
        print_top_contributors(&store, cli.top)?;
    }

    Ok(())
}
