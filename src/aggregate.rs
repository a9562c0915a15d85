//! Component contribution aggregation
//!
//! Folds stored file changes into one [`ContributionRecord`] per
//! (component, repository, author email). Each component entry names a
//! repository and a glob pattern as `<repository>:<pattern>`; a file change
//! counts towards a component when any pattern for its repository matches.
//!
//! Commits are deduplicated per key: a commit touching several matching
//! files counts once, while its additions and deletions are summed over
//! every matching file.

use anyhow::Result;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, info};

use crate::matcher::CompiledPattern;
use crate::models::{ChangeRow, Component, ContributionKey, ContributionRecord};
use crate::store::ReportStore;

/// A component's patterns grouped by repository name.
#[derive(Debug, Clone, Default)]
pub struct PatternGroups {
    groups: BTreeMap<String, Vec<CompiledPattern>>,
}

impl PatternGroups {
    /// Group `<repository>:<pattern>` entries. Entries without a `:` are
    /// skipped.
    pub fn parse(entries: &[String]) -> Self {
        let mut groups: BTreeMap<String, Vec<CompiledPattern>> = BTreeMap::new();
        for entry in entries {
            let Some((repository, pattern)) = entry.split_once(':') else {
                debug!("Skipping component pattern without repository: {:?}", entry);
                continue;
            };
            groups
                .entry(repository.to_string())
                .or_default()
                .push(CompiledPattern::new(pattern));
        }
        Self { groups }
    }

    /// Patterns targeting `repository`, if any.
    pub fn for_repository(&self, repository: &str) -> Option<&[CompiledPattern]> {
        self.groups.get(repository).map(Vec::as_slice)
    }

    pub fn repositories(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// True if any pattern matches `path`.
pub fn matches_any(patterns: &[CompiledPattern], path: &str) -> bool {
    patterns.iter().any(|p| p.matches(path))
}

/// Running totals for one key.
#[derive(Debug, Default)]
struct Accumulator {
    /// Last display name seen for the email
    author_name: String,
    commits: HashSet<String>,
    additions: u64,
    deletions: u64,
}

/// In-memory fold of matched rows. Build a new one for every run.
#[derive(Debug, Default)]
pub struct Aggregator {
    totals: HashMap<ContributionKey, Accumulator>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one matched row to the totals of its key.
    pub fn observe(&mut self, component_id: i64, repository_id: i64, row: &ChangeRow) {
        let key = ContributionKey {
            component_id,
            repository_id,
            author_email: row.author_email.clone(),
        };
        let acc = self.totals.entry(key).or_default();
        acc.author_name.clone_from(&row.author_name);
        if !acc.commits.contains(&row.commit_hash) {
            acc.commits.insert(row.commit_hash.clone());
        }
        acc.additions += row.additions;
        acc.deletions += row.deletions;
    }

    /// Scan `rows` and observe every row matched by `patterns`.
    ///
    /// Returns the number of matched rows.
    pub fn scan(
        &mut self,
        component_id: i64,
        repository_id: i64,
        patterns: &[CompiledPattern],
        rows: &[ChangeRow],
    ) -> usize {
        let mut matched = 0;
        for row in rows {
            if matches_any(patterns, &row.filepath) {
                self.observe(component_id, repository_id, row);
                matched += 1;
            }
        }
        matched
    }

    /// Number of distinct keys seen so far.
    pub fn len(&self) -> usize {
        self.totals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }

    /// Emit one record per key, sorted by key.
    pub fn finish(self) -> Vec<ContributionRecord> {
        let mut records: Vec<ContributionRecord> = self
            .totals
            .into_iter()
            .map(|(key, acc)| ContributionRecord {
                component_id: key.component_id,
                repository_id: key.repository_id,
                author_email: key.author_email,
                author_name: acc.author_name,
                commit_count: acc.commits.len() as u64,
                total_additions: acc.additions,
                total_deletions: acc.deletions,
            })
            .collect();
        records.sort_by(|a, b| {
            (a.component_id, a.repository_id, &a.author_email)
                .cmp(&(b.component_id, b.repository_id, &b.author_email))
        });
        records
    }
}

/// Compute contribution records for `components` from the stored history.
///
/// `repository_ids` maps configured repository names to their ids. Patterns
/// naming any other repository are ignored. Each repository's rows are read
/// once and shared by every component that targets it.
pub fn compute_contributions(
    store: &ReportStore,
    components: &[Component],
    repository_ids: &HashMap<String, i64>,
) -> Result<Vec<ContributionRecord>> {
    let grouped: Vec<(i64, PatternGroups)> = components
        .iter()
        .map(|c| (c.id, PatternGroups::parse(&c.patterns)))
        .collect();

    for (component, (_, groups)) in components.iter().zip(&grouped) {
        for repository in groups.repositories() {
            if !repository_ids.contains_key(repository) {
                debug!(
                    "Component {} references unknown repository {}, skipping",
                    component.name, repository
                );
            }
        }
    }

    let mut repositories: Vec<(&str, i64)> = repository_ids
        .iter()
        .map(|(name, id)| (name.as_str(), *id))
        .collect();
    repositories.sort_by_key(|(_, id)| *id);

    let mut aggregator = Aggregator::new();
    for (name, repository_id) in repositories {
        let targeting: Vec<(i64, &[CompiledPattern])> = grouped
            .iter()
            .filter_map(|(component_id, groups)| {
                groups.for_repository(name).map(|p| (*component_id, p))
            })
            .collect();
        if targeting.is_empty() {
            continue;
        }

        let rows = store.changes_for_repository(repository_id)?;
        for (component_id, patterns) in targeting {
            let matched = aggregator.scan(component_id, repository_id, patterns, &rows);
            debug!(
                "Component {} matched {} of {} file changes in {}",
                component_id,
                matched,
                rows.len(),
                name
            );
        }
    }

    let records = aggregator.finish();
    info!("Computed {} contribution records", records.len());
    Ok(records)
}
