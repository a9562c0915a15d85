//! gitreport library
//!
//! Ingests git history from several repositories into a SQLite report and
//! computes per-component contribution statistics.
//!
//! The stages are usable on their own:
//! - [`git`] runs `git log` and parses its output
//! - [`store`] persists repositories, commits and aggregates
//! - [`matcher`] decides whether a path belongs to a component
//! - [`aggregate`] folds stored changes into contribution records
//! - [`pipeline`] ties them together

pub mod aggregate;
pub mod cli;
pub mod config;
pub mod git;
pub mod matcher;
pub mod models;
pub mod pipeline;
pub mod store;
