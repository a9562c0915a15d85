//! Verbose report output

use anyhow::Result;
use console::style;
use std::collections::HashMap;

use crate::models::ContributionRecord;
use crate::store::ReportStore;

/// The `n` largest contributors to a component, most commits first.
///
/// Ties are broken by lines changed, then by email.
pub fn top_contributors(
    records: &[ContributionRecord],
    component_id: i64,
    n: usize,
) -> Vec<&ContributionRecord> {
    let mut rows: Vec<&ContributionRecord> = records
        .iter()
        .filter(|r| r.component_id == component_id)
        .collect();
    rows.sort_by(|a, b| {
        b.commit_count
            .cmp(&a.commit_count)
            .then_with(|| lines_changed(b).cmp(&lines_changed(a)))
            .then_with(|| a.author_email.cmp(&b.author_email))
    });
    rows.truncate(n);
    rows
}

fn lines_changed(record: &ContributionRecord) -> u64 {
    record.total_additions + record.total_deletions
}

/// Print the top contributors of every component in the report.
pub fn print_top_contributors(store: &ReportStore, n: usize) -> Result<()> {
    let repositories: HashMap<i64, String> = store
        .repositories()?
        .into_iter()
        .map(|r| (r.id, r.name))
        .collect();
    let records = store.contributions()?;

    for component in store.components()? {
        println!();
        println!("  {}", style(&component.name).bold());

        let top = top_contributors(&records, component.id, n);
        if top.is_empty() {
            println!("    {}", style("no matching changes").dim());
            continue;
        }
        for record in top {
            let repo = repositories
                .get(&record.repository_id)
                .map(String::as_str)
                .unwrap_or("?");
            println!(
                "    {:<24} {:<16} {:>5} commits  {} {}",
                record.author_name,
                style(repo).cyan(),
                record.commit_count,
                style(format!("+{}", record.total_additions)).green(),
                style(format!("-{}", record.total_deletions)).red(),
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(component_id: i64, email: &str, commits: u64, add: u64, del: u64) -> ContributionRecord {
        ContributionRecord {
            component_id,
            repository_id: 1,
            author_email: email.to_string(),
            author_name: email.to_string(),
            commit_count: commits,
            total_additions: add,
            total_deletions: del,
        }
    }

    #[test]
    fn test_top_contributors_ordering() {
        let records = vec![
            record(1, "a@x.io", 2, 10, 0),
            record(1, "b@x.io", 5, 1, 1),
            record(1, "c@x.io", 2, 30, 5),
            record(1, "d@x.io", 2, 10, 0),
            record(2, "e@x.io", 99, 0, 0),
        ];

        let emails: Vec<&str> = top_contributors(&records, 1, 10)
            .iter()
            .map(|r| r.author_email.as_str())
            .collect();
        assert_eq!(emails, vec!["b@x.io", "c@x.io", "a@x.io", "d@x.io"]);

        assert_eq!(top_contributors(&records, 1, 2).len(), 2);
        assert!(top_contributors(&records, 3, 5).is_empty());
    }
}
