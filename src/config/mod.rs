//! Configuration module for gitreport
//!
//! This module handles:
//! - Loading the report configuration (YAML, TOML or JSON)
//! - Validating repositories and components before any work starts

mod report_config;

pub use report_config::{
    ComponentConfig,
    ConfigError,
    Filters,
    ReportConfig,
    RepositoryConfig,
    DEFAULT_CONFIG_PATH,
    DEFAULT_OUTPUT_PATH,
    load_report_config,
};
