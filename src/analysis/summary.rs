//! Aggregate contribution statistics.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::git::CommitInfo;

/// Ownership below this share is left out of the evidence bundle.
pub const SIGNIFICANT_OWNERSHIP: f64 = 0.3;

/// Totals over a person's commits.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContributionSummary {
    /// Number of commits.
    pub total_commits: usize,
    /// Lines added.
    pub total_insertions: usize,
    /// Lines removed.
    pub total_deletions: usize,
    /// Lines added minus lines removed.
    pub net_lines: i64,
    /// Distinct files touched.
    pub files_touched_count: usize,
    /// Distinct parent directories touched.
    pub directories_touched_count: usize,
    /// Distinct files touched, sorted.
    pub files_touched: Vec<String>,
    /// Commits per week over the active period, one decimal.
    pub avg_commits_per_week: f64,
    /// Largest `insertions + deletions` of a single commit.
    pub largest_single_commit: usize,
}

impl ContributionSummary {
    /// Summarises `commits`.
    pub fn from_commits(commits: &[CommitInfo]) -> Self {
        let mut files = BTreeSet::new();
        let mut directories = BTreeSet::new();
        for commit in commits {
            for path in commit.files.keys() {
                files.insert(path.clone());
                directories.insert(path.rsplit_once('/').map_or("", |(dir, _)| dir));
            }
        }

        let total_insertions: usize = commits.iter().map(CommitInfo::insertions).sum();
        let total_deletions: usize = commits.iter().map(CommitInfo::deletions).sum();

        let avg_commits_per_week = match (
            commits.iter().map(|c| c.date).min(),
            commits.iter().map(|c| c.date).max(),
        ) {
            (Some(first), Some(last)) => {
                let weeks = ((last - first).num_days() as f64 / 7.0).max(1.0);
                (commits.len() as f64 / weeks * 10.0).round() / 10.0
            }
            _ => 0.0,
        };

        Self {
            total_commits: commits.len(),
            total_insertions,
            total_deletions,
            net_lines: total_insertions as i64 - total_deletions as i64,
            files_touched_count: files.len(),
            directories_touched_count: directories.len(),
            files_touched: files.into_iter().collect(),
            avg_commits_per_week,
            largest_single_commit: commits
                .iter()
                .map(CommitInfo::total_changes)
                .max()
                .unwrap_or(0),
        }
    }

    /// Lines added plus lines removed.
    pub fn total_changes(&self) -> usize {
        self.total_insertions + self.total_deletions
    }
}

/// Files ranked by how many commits touched them, most first; ties by path.
pub fn hot_files(commits: &[CommitInfo], top_n: usize) -> Vec<(String, usize)> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for commit in commits {
        for path in commit.files.keys() {
            *counts.entry(path.as_str()).or_default() += 1;
        }
    }

    let mut ranked: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(path, n)| (path.to_string(), n))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(top_n);
    ranked
}

/// Approximate ownership per file: one tenth per commit, capped at 1.0.
///
/// Only the person's own commits are counted, so this is a lower bound on
/// familiarity rather than a share of all activity.
pub fn ownership_map(commits: &[CommitInfo]) -> BTreeMap<String, f64> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for commit in commits {
        for path in commit.files.keys() {
            *counts.entry(path.clone()).or_default() += 1;
        }
    }

    counts
        .into_iter()
        .map(|(path, n)| (path, (n as f64 / 10.0).min(1.0)))
        .collect()
}
