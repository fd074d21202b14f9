//! The evidence bundle written next to the bullet document.
//!
//! Everything the analysis derived, trimmed to sizes that fit into a prompt:
//! the newest 200 commits in compact form plus every commit a kept initiative
//! refers to, the ten most complex initiatives, at most 30 hot files and 100
//! issues and pull requests each.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::analysis::summary::SIGNIFICANT_OWNERSHIP;
use crate::analysis::{CodebaseProfile, ContributionSummary, ImpactHint, Initiative, ThemeSignal};
use crate::config::EvidenceFormat;
use crate::git::{abbreviate_hash, CommitInfo};
use crate::github::{GitHubActivity, PrAnalysis};

const MAX_COMMITS: usize = 200;
const COMMIT_MESSAGE_LEN: usize = 140;
const FILES_PER_COMMIT: usize = 10;
const MAX_INITIATIVES: usize = 10;
const FILES_PER_INITIATIVE: usize = 20;
const MAX_HOT_FILES: usize = 30;
const MAX_GITHUB_ITEMS: usize = 100;

/// Who and what the bundle describes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceMetadata {
    /// Person the evidence is about.
    pub person_name: String,
    /// Their role.
    pub role: String,
    /// Repository that was analysed.
    pub repo_path: String,
    /// When the bundle was produced.
    pub generated_at: DateTime<FixedOffset>,
    /// Version of this tool.
    pub tool_version: String,
}

/// A commit reduced to what a prompt needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompactCommit {
    /// Abbreviated hash.
    pub sha: String,
    /// First line of the message, truncated.
    pub msg: String,
    /// Up to ten touched paths.
    pub files: Vec<String>,
    /// Lines added.
    pub insertions: usize,
    /// Lines removed.
    pub deletions: usize,
    /// `YYYY-MM-DD`.
    pub date: String,
}

impl From<&CommitInfo> for CompactCommit {
    fn from(commit: &CommitInfo) -> Self {
        Self {
            sha: commit.short_hash().to_string(),
            msg: commit.subject().chars().take(COMMIT_MESSAGE_LEN).collect(),
            files: commit.files.keys().take(FILES_PER_COMMIT).cloned().collect(),
            insertions: commit.insertions(),
            deletions: commit.deletions(),
            date: commit.date.format("%Y-%m-%d").to_string(),
        }
    }
}

/// An initiative as presented to the narrative stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitiativeEvidence {
    /// Initiative identifier.
    pub id: String,
    /// Theme tags.
    pub themes: Vec<String>,
    /// Dominant word of the member messages.
    pub focus: Option<String>,
    /// Member commit count.
    pub commit_count: usize,
    /// Abbreviated member hashes.
    pub commits: Vec<String>,
    /// First day of the window.
    pub start: String,
    /// Last day of the window.
    pub end: String,
    /// Up to twenty touched paths.
    pub files_affected: Vec<String>,
    /// Lines added plus removed.
    pub total_changes: usize,
    /// Complexity score.
    pub complexity_score: u32,
}

impl From<&Initiative> for InitiativeEvidence {
    fn from(initiative: &Initiative) -> Self {
        Self {
            id: initiative.id.clone(),
            themes: initiative.themes.iter().cloned().collect(),
            focus: initiative.focus.clone(),
            commit_count: initiative.commits.len(),
            commits: initiative
                .commits
                .iter()
                .map(|h| abbreviate_hash(h).to_string())
                .collect(),
            start: initiative.window.start.format("%Y-%m-%d").to_string(),
            end: initiative.window.end.format("%Y-%m-%d").to_string(),
            files_affected: initiative
                .files
                .iter()
                .take(FILES_PER_INITIATIVE)
                .cloned()
                .collect(),
            total_changes: initiative.total_changes(),
            complexity_score: initiative.complexity_score,
        }
    }
}

/// A file and how many of the person's commits touched it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotFile {
    /// Repository-relative path.
    pub path: String,
    /// Commits touching it.
    pub commits: usize,
}

/// Everything passed to the narrative stages and written to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceBundle {
    /// Subject and provenance.
    pub metadata: EvidenceMetadata,
    /// Newest commits first-line summaries, oldest first.
    pub commits: Vec<CompactCommit>,
    /// Totals.
    pub summary: ContributionSummary,
    /// Most frequently touched files.
    pub top_files: Vec<HotFile>,
    /// File counts per extension in the working tree.
    pub languages: BTreeMap<String, usize>,
    /// Component buckets of the working tree.
    pub components: BTreeMap<String, Vec<String>>,
    /// Most complex initiatives.
    pub initiatives: Vec<InitiativeEvidence>,
    /// Per-theme aggregates.
    pub theme_signals: Vec<ThemeSignal>,
    /// Advisory impact estimates.
    pub impact_hints: Vec<ImpactHint>,
    /// Files with significant ownership.
    pub ownership_map: BTreeMap<String, f64>,
    /// Authored pull request statistics, when GitHub ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pr_analysis: Option<PrAnalysis>,
    /// Repository issues.
    pub issues: Vec<crate::github::IssueRecord>,
    /// Repository pull requests.
    pub prs: Vec<crate::github::PullRecord>,
    /// Sources that failed or were skipped, with the reason.
    pub skipped_sources: Vec<String>,
}

/// Borrowed inputs of [`EvidenceBundle::assemble`].
pub struct EvidenceInputs<'a> {
    /// Subject and provenance.
    pub metadata: EvidenceMetadata,
    /// The person's commits.
    pub commits: &'a [CommitInfo],
    /// Totals over those commits.
    pub summary: &'a ContributionSummary,
    /// Hot files, most touched first.
    pub hot_files: &'a [(String, usize)],
    /// Working tree scan, if it ran.
    pub codebase: Option<&'a CodebaseProfile>,
    /// Initiatives, most complex first.
    pub initiatives: &'a [Initiative],
    /// Theme aggregates.
    pub theme_signals: &'a [ThemeSignal],
    /// Impact estimates.
    pub impact_hints: &'a [ImpactHint],
    /// Ownership per file.
    pub ownership: &'a BTreeMap<String, f64>,
    /// GitHub data, if it ran.
    pub github: Option<&'a GitHubActivity>,
    /// Authored pull request statistics.
    pub pr_analysis: Option<PrAnalysis>,
    /// Failed or skipped sources.
    pub skipped_sources: Vec<String>,
}

impl EvidenceBundle {
    /// Builds the bundle, applying the size limits.
    ///
    /// Commits referenced by a kept initiative are always included, even when
    /// they fall outside the newest-commit window.
    pub fn assemble(inputs: EvidenceInputs<'_>) -> Self {
        let kept = &inputs.initiatives[..inputs.initiatives.len().min(MAX_INITIATIVES)];
        let referenced: BTreeSet<&str> = kept
            .iter()
            .flat_map(|i| i.commits.iter().map(String::as_str))
            .collect();
        let start = inputs.commits.len().saturating_sub(MAX_COMMITS);
        let commits = inputs
            .commits
            .iter()
            .enumerate()
            .filter(|(idx, c)| *idx >= start || referenced.contains(c.hash.as_str()))
            .map(|(_, c)| CompactCommit::from(c))
            .collect();
        let initiatives: Vec<InitiativeEvidence> =
            kept.iter().map(InitiativeEvidence::from).collect();

        let (issues, prs) = inputs.github.map_or_else(
            || (Vec::new(), Vec::new()),
            |g| {
                (
                    g.issues.iter().take(MAX_GITHUB_ITEMS).cloned().collect(),
                    g.prs.iter().take(MAX_GITHUB_ITEMS).cloned().collect(),
                )
            },
        );

        Self {
            metadata: inputs.metadata,
            commits,
            summary: inputs.summary.clone(),
            top_files: inputs
                .hot_files
                .iter()
                .take(MAX_HOT_FILES)
                .map(|(path, commits)| HotFile {
                    path: path.clone(),
                    commits: *commits,
                })
                .collect(),
            languages: inputs
                .codebase
                .map(|c| c.languages.clone())
                .unwrap_or_default(),
            components: inputs
                .codebase
                .map(|c| c.components.clone())
                .unwrap_or_default(),
            impact_hints: inputs
                .impact_hints
                .iter()
                .filter(|h| initiatives.iter().any(|i| i.id == h.initiative_id))
                .cloned()
                .collect(),
            initiatives,
            theme_signals: inputs.theme_signals.to_vec(),
            ownership_map: inputs
                .ownership
                .iter()
                .filter(|(_, share)| **share > SIGNIFICANT_OWNERSHIP)
                .map(|(path, share)| (path.clone(), *share))
                .collect(),
            pr_analysis: inputs.pr_analysis,
            issues,
            prs,
            skipped_sources: inputs.skipped_sources,
        }
    }

    /// Serializes the bundle for the research stage.
    ///
    /// Impact hints are repeated as plain sentences after the JSON so their
    /// estimate wording reaches the model verbatim.
    pub fn to_prompt_blob(&self) -> Result<String> {
        let mut blob =
            serde_json::to_string_pretty(self).context("Failed to serialize evidence bundle")?;
        if !self.impact_hints.is_empty() {
            blob.push_str("\n\nImpact estimates (advisory only):\n");
            for hint in &self.impact_hints {
                blob.push_str("- ");
                blob.push_str(&hint.to_prompt_text());
                blob.push('\n');
            }
        }
        Ok(blob)
    }

    /// Writes the bundle into `dir` as `signals.json` or `signals.yaml`.
    pub fn write_to_dir(&self, dir: &Path, format: EvidenceFormat) -> Result<PathBuf> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;

        match format {
            EvidenceFormat::Json => {
                let path = dir.join("signals.json");
                let json = serde_json::to_string_pretty(self)
                    .context("Failed to serialize evidence bundle")?;
                fs::write(&path, json)
                    .with_context(|| format!("Failed to write file: {}", path.display()))?;
                Ok(path)
            }
            EvidenceFormat::Yaml => {
                let path = dir.join("signals.yaml");
                super::yaml::write_yaml_file(self, &path)?;
                Ok(path)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{ImpactEstimator, SignalAnalyzer, ThemeVocabulary};
    use crate::git::commit::test_support::commit;
    use proptest::prelude::*;

    fn metadata() -> EvidenceMetadata {
        EvidenceMetadata {
            person_name: "Jane Doe".to_string(),
            role: "Software Engineer".to_string(),
            repo_path: "/srv/widgets".to_string(),
            generated_at: DateTime::parse_from_rfc3339("2024-06-01T12:00:00Z").unwrap(),
            tool_version: "test".to_string(),
        }
    }

    fn bundle_for(commits: &[CommitInfo]) -> EvidenceBundle {
        let vocab = ThemeVocabulary::builtin().unwrap();
        let initiatives = SignalAnalyzer::new(&vocab, 7, 2).analyze(commits);
        let summary = ContributionSummary::from_commits(commits);
        let hints = ImpactEstimator::new().estimate_all(&initiatives, &summary);
        let signals = crate::analysis::detect_theme_signals(commits, &vocab);
        let hot = crate::analysis::hot_files(commits, 50);
        let ownership = crate::analysis::ownership_map(commits);

        EvidenceBundle::assemble(EvidenceInputs {
            metadata: metadata(),
            commits,
            summary: &summary,
            hot_files: &hot,
            codebase: None,
            initiatives: &initiatives,
            theme_signals: &signals,
            impact_hints: &hints,
            ownership: &ownership,
            github: None,
            pr_analysis: None,
            skipped_sources: vec!["GitHub: GITHUB_TOKEN not set".to_string()],
        })
    }

    fn sample_commits() -> Vec<CommitInfo> {
        vec![
            commit(
                "0123456789abcdef",
                "2024-05-01T09:00:00Z",
                "Add cache for sessions\n\nLong body",
                &[("src/session.rs", 50, 0)],
            ),
            commit("1123456789abcdef", "2024-05-02T09:00:00Z", "Tune cache eviction", &[("src/cache.rs", 20, 5)]),
        ]
    }

    #[test]
    fn test_compact_commit() {
        let bundle = bundle_for(&sample_commits());
        assert_eq!(bundle.commits.len(), 2);
        assert_eq!(bundle.commits[0].sha, "0123456789");
        assert_eq!(bundle.commits[0].msg, "Add cache for sessions");
        assert_eq!(bundle.commits[0].date, "2024-05-01");
        assert_eq!(bundle.initiatives.len(), 1);
        assert_eq!(bundle.skipped_sources.len(), 1);
        assert!(bundle.ownership_map.is_empty());
    }

    #[test]
    fn test_old_initiative_commits_stay_in_bundle() {
        let mut commits = vec![
            commit("00000003e8", "2020-01-01T09:00:00Z", "Optimize cache layout", &[("src/cache.rs", 900, 100), ("src/store.rs", 300, 50)]),
            commit("00000003e9", "2020-01-02T09:00:00Z", "Optimize cache eviction", &[("src/cache.rs", 700, 80), ("src/evict.rs", 200, 10)]),
        ];
        let base = DateTime::parse_from_rfc3339("2021-01-01T00:00:00Z").unwrap();
        for i in 0..203i64 {
            let mut c = commit(&format!("{:010x}", 0x1000 + i), "2021-01-01T00:00:00Z", "Update notes", &[("NOTES.md", 1, 0)]);
            c.date = base + chrono::Duration::days(30 * i);
            commits.push(c);
        }

        let bundle = bundle_for(&commits);
        let initiative = bundle
            .initiatives
            .iter()
            .find(|i| i.commits.contains(&"00000003e8".to_string()))
            .unwrap();
        for sha in &initiative.commits {
            assert!(bundle.commits.iter().any(|c| &c.sha == sha), "{sha} missing");
        }
        assert_eq!(bundle.commits.len(), MAX_COMMITS + 2);
        assert_eq!(bundle.commits[0].msg, "Optimize cache layout");
    }

    #[test]
    fn test_prompt_blob_labels_estimates() {
        let blob = bundle_for(&sample_commits()).to_prompt_blob().unwrap();
        assert!(blob.contains("\"person_name\": \"Jane Doe\""));
        assert!(blob.contains("Impact estimates (advisory only):"));
        assert!(blob.contains("Unverified estimate"));
    }

    #[test]
    fn test_write_json_and_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = bundle_for(&sample_commits());

        let json_path = bundle.write_to_dir(dir.path(), EvidenceFormat::Json).unwrap();
        assert!(json_path.ends_with("signals.json"));
        let parsed: EvidenceBundle =
            serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(parsed.metadata, bundle.metadata);

        let yaml_path = bundle
            .write_to_dir(&dir.path().join("nested"), EvidenceFormat::Yaml)
            .unwrap();
        assert!(yaml_path.ends_with("signals.yaml"));
        let parsed: serde_yaml::Value =
            serde_yaml::from_str(&fs::read_to_string(&yaml_path).unwrap()).unwrap();
        assert_eq!(parsed["metadata"]["person_name"].as_str(), Some("Jane Doe"));
    }

    prop_compose! {
        fn arb_commits()(specs in prop::collection::vec((0i64..400 * 24, 0usize..400, 0usize..6), 0..320)) -> Vec<CommitInfo> {
            specs
                .into_iter()
                .enumerate()
                .map(|(i, (hours, lines, file))| {
                    let path = format!("src/m{file}.rs");
                    let mut c = commit(&format!("{i:040x}"), "2024-01-01T00:00:00Z", "optimize cache path", &[(path.as_str(), lines, 1)]);
                    c.date = c.date + chrono::Duration::hours(hours);
                    c
                })
                .collect()
        }
    }

    proptest! {
        #[test]
        fn bundle_only_references_real_commits(commits in arb_commits()) {
            let bundle = bundle_for(&commits);
            prop_assert!(bundle.commits.len() >= commits.len().min(MAX_COMMITS));
            prop_assert!(bundle.initiatives.len() <= MAX_INITIATIVES);
            for initiative in &bundle.initiatives {
                prop_assert!(initiative.commit_count > 0);
                for sha in &initiative.commits {
                    prop_assert!(commits.iter().any(|c| c.hash.starts_with(sha.as_str())));
                    prop_assert!(bundle.commits.iter().any(|c| &c.sha == sha), "{} missing from bundle", sha);
                }
            }
            for hint in &bundle.impact_hints {
                prop_assert!(hint.confidence < 1.0);
                prop_assert!(bundle.initiatives.iter().any(|i| i.id == hint.initiative_id));
            }
        }
    }
}
