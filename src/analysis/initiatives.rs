//! Clustering of commits into initiatives.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, FixedOffset};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::themes::{dominant_word, ThemeVocabulary};
use crate::config::AnalysisOptions;
use crate::git::CommitInfo;

/// Inclusive span between the first and last commit of an initiative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Earliest commit timestamp.
    pub start: DateTime<FixedOffset>,
    /// Latest commit timestamp.
    pub end: DateTime<FixedOffset>,
}

impl TimeWindow {
    /// Whole days covered by the window.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }
}

/// A cluster of commits inferred to be one coherent piece of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Initiative {
    /// Stable identifier, `I1`, `I2`, ... in chronological order.
    pub id: String,
    /// Member commit hashes, oldest first.
    pub commits: Vec<String>,
    /// Span of the member commits.
    pub window: TimeWindow,
    /// Union of theme tags matched in member messages.
    pub themes: BTreeSet<String>,
    /// Distinct files touched.
    pub files: BTreeSet<String>,
    /// Lines added across members.
    pub insertions: usize,
    /// Lines removed across members.
    pub deletions: usize,
    /// Heuristic complexity; see [`complexity_score`].
    pub complexity_score: u32,
    /// Most repeated meaningful word in member messages.
    pub focus: Option<String>,
}

impl Initiative {
    /// Lines added plus lines removed.
    pub fn total_changes(&self) -> usize {
        self.insertions + self.deletions
    }

    /// Resolves member hashes against `commits`, skipping unknown ones.
    pub fn resolve<'a>(&self, commits: &'a [CommitInfo]) -> Vec<&'a CommitInfo> {
        self.commits
            .iter()
            .filter_map(|h| commits.iter().find(|c| &c.hash == h))
            .collect()
    }
}

/// Complexity of a group of commits.
///
/// `10 * commits + 5 * directories + 2 * files + lines / 100`; monotonic in
/// every input. The weights are a policy choice.
pub fn complexity_score(commit_count: usize, files: &BTreeSet<String>, lines: usize) -> u32 {
    let directories: BTreeSet<&str> = files
        .iter()
        .map(|f| f.rsplit_once('/').map_or("", |(dir, _)| dir))
        .collect();

    let score = commit_count * 10 + directories.len() * 5 + files.len() * 2 + lines / 100;
    u32::try_from(score).unwrap_or(u32::MAX)
}

/// Groups commits into initiatives.
pub struct SignalAnalyzer<'v> {
    vocabulary: &'v ThemeVocabulary,
    window: Duration,
    min_commits: usize,
}

impl<'v> SignalAnalyzer<'v> {
    /// Creates an analyzer chaining commits no more than `window_days` apart.
    pub fn new(vocabulary: &'v ThemeVocabulary, window_days: u32, min_commits: usize) -> Self {
        Self {
            vocabulary,
            window: Duration::days(i64::from(window_days)),
            min_commits: min_commits.max(1),
        }
    }

    /// Creates an analyzer from the analysis options.
    pub fn from_options(vocabulary: &'v ThemeVocabulary, options: &AnalysisOptions) -> Self {
        Self::new(
            vocabulary,
            options.window_days,
            options.min_initiative_commits,
        )
    }

    /// Clusters `commits` into initiatives, most complex first.
    ///
    /// Commits are ordered by time; each one joins the open group when it is
    /// within the window of the group's latest commit, otherwise it opens a
    /// new group. Groups below the minimum size are dropped. Empty input gives
    /// an empty result.
    pub fn analyze(&self, commits: &[CommitInfo]) -> Vec<Initiative> {
        let mut ordered: Vec<&CommitInfo> = commits.iter().collect();
        ordered.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.hash.cmp(&b.hash)));

        let mut groups: Vec<Vec<&CommitInfo>> = Vec::new();
        for commit in ordered {
            let joins = groups
                .last()
                .and_then(|g| g.last())
                .is_some_and(|last| commit.date - last.date <= self.window);
            match groups.last_mut() {
                Some(group) if joins => group.push(commit),
                _ => groups.push(vec![commit]),
            }
        }

        let mut initiatives: Vec<Initiative> = groups
            .into_iter()
            .filter(|g| g.len() >= self.min_commits)
            .enumerate()
            .filter_map(|(idx, group)| self.build(idx + 1, &group))
            .collect();

        initiatives.sort_by(|a, b| {
            b.complexity_score
                .cmp(&a.complexity_score)
                .then_with(|| a.window.start.cmp(&b.window.start))
        });

        debug!(
            commits = commits.len(),
            initiatives = initiatives.len(),
            "Clustered commits into initiatives"
        );

        initiatives
    }

    fn build(&self, ordinal: usize, group: &[&CommitInfo]) -> Option<Initiative> {
        let start = group.first()?.date;
        let end = group.last()?.date;

        let mut themes = BTreeSet::new();
        let mut files = BTreeSet::new();
        let mut insertions = 0;
        let mut deletions = 0;

        for commit in group {
            themes.extend(self.vocabulary.tags_for(&commit.message));
            files.extend(commit.files.keys().cloned());
            insertions += commit.insertions();
            deletions += commit.deletions();
        }

        Some(Initiative {
            id: format!("I{ordinal}"),
            commits: group.iter().map(|c| c.hash.clone()).collect(),
            window: TimeWindow { start, end },
            complexity_score: complexity_score(group.len(), &files, insertions + deletions),
            focus: dominant_word(group.iter().map(|c| c.message.as_str())),
            themes,
            files,
            insertions,
            deletions,
        })
    }
}
