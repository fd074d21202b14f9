//! Advisory impact estimates derived from change volume.
//!
//! Nothing here is measured. Every number is a plausible range picked from
//! the size of a change and is only ever handed to the narrative stage as
//! prompt material, labelled as an estimate and carrying a confidence below
//! certainty.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::initiatives::Initiative;
use super::summary::ContributionSummary;
use super::themes::ThemeVocabulary;
use crate::git::CommitInfo;

/// Upper bound of any confidence this module produces.
pub const MAX_CONFIDENCE: f64 = 0.9;

const MIN_CONFIDENCE: f64 = 0.05;
const CONFIDENCE_PER_COMMIT: f64 = 0.02;
const DOMINANT_SHARE_BONUS: f64 = 0.05;
const MAX_EVIDENCE_MESSAGES: usize = 5;
const EVIDENCE_MESSAGE_LEN: usize = 100;

/// Coarse size of a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ImpactLevel {
    /// At most 200 lines over at most 3 files.
    Low,
    /// More than 200 lines or more than 3 files.
    Medium,
    /// More than 1000 lines or more than 10 files.
    High,
}

impl ImpactLevel {
    /// Buckets a change by lines and files touched.
    pub fn classify(lines: usize, files: usize) -> Self {
        if lines > 1000 || files > 10 {
            Self::High
        } else if lines > 200 || files > 3 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    fn base_confidence(self) -> f64 {
        match self {
            Self::Low => 0.25,
            Self::Medium => 0.4,
            Self::High => 0.55,
        }
    }

    /// Index into the per-level range tables.
    fn rank(self) -> usize {
        match self {
            Self::Low => 0,
            Self::Medium => 1,
            Self::High => 2,
        }
    }
}

impl fmt::Display for ImpactLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        };
        f.write_str(label)
    }
}

/// An unverified, confidence-scored numeric estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactHint {
    /// Initiative the estimate is about.
    pub initiative_id: String,
    /// Theme that selected the metric.
    pub theme: String,
    /// Metric name, e.g. `latency_reduction`.
    pub metric: String,
    /// Point estimate.
    pub value: f64,
    /// Lower end of the plausible range.
    pub low: f64,
    /// Upper end of the plausible range.
    pub high: f64,
    /// Unit suffix: `%`, `x`, or a noun.
    pub unit: String,
    /// Confidence in `[0, 1)`.
    pub confidence: f64,
    /// Size bucket of the initiative.
    pub level: ImpactLevel,
}

impl ImpactHint {
    /// Renders the hint as a line of prompt text.
    pub fn to_prompt_text(&self) -> String {
        let metric = self.metric.replace('_', " ");
        let range = if self.low < self.high {
            format!(
                " (plausible range {}-{}{})",
                format_number(self.low),
                format_number(self.high),
                unit_suffix(&self.unit)
            )
        } else {
            String::new()
        };
        format!(
            "[{}] estimated {metric}: ~{}{}{range}, confidence {:.2}, {} impact. \
             Unverified estimate; do not state it as a measured result.",
            self.initiative_id,
            format_number(self.value),
            unit_suffix(&self.unit),
            self.confidence,
            self.level,
        )
    }
}

fn unit_suffix(unit: &str) -> String {
    match unit {
        "%" | "x" => unit.to_string(),
        other => format!(" {other}"),
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.1}")
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

struct MetricRule {
    metric: &'static str,
    unit: &'static str,
    /// Ranges for Low, Medium and High; `None` leaves the value unclamped.
    ranges: Option<[(f64, f64); 3]>,
    value: fn(lines: usize, files: usize) -> f64,
}

const PERFORMANCE_RULES: &[MetricRule] = &[
    MetricRule {
        metric: "latency_reduction",
        unit: "%",
        ranges: Some([(2.0, 10.0), (10.0, 25.0), (25.0, 50.0)]),
        value: |lines, _| (lines as f64 / 20.0).min(50.0),
    },
    MetricRule {
        metric: "throughput_gain",
        unit: "x",
        ranges: Some([(1.1, 1.5), (1.5, 2.0), (2.0, 3.0)]),
        value: |_, files| (files as f64).min(3.0),
    },
];

const RELIABILITY_RULES: &[MetricRule] = &[MetricRule {
    metric: "error_reduction",
    unit: "%",
    ranges: Some([(5.0, 20.0), (20.0, 50.0), (50.0, 90.0)]),
    value: |lines, _| (lines as f64 / 10.0).min(90.0),
}];

const ARCHITECTURE_RULES: &[MetricRule] = &[MetricRule {
    metric: "components_refactored",
    unit: "files",
    ranges: None,
    value: |_, files| files as f64,
}];

const FEATURE_RULES: &[MetricRule] = &[MetricRule {
    metric: "components_delivered",
    unit: "files",
    ranges: None,
    value: |_, files| files as f64,
}];

const FALLBACK_RULES: &[MetricRule] = &[MetricRule {
    metric: "lines_changed",
    unit: "lines",
    ranges: None,
    value: |lines, _| lines as f64,
}];

fn rules_for(theme: &str) -> &'static [MetricRule] {
    match theme {
        "performance" => PERFORMANCE_RULES,
        "reliability" => RELIABILITY_RULES,
        "architecture" => ARCHITECTURE_RULES,
        "feature" => FEATURE_RULES,
        _ => FALLBACK_RULES,
    }
}

/// Turns initiatives into impact hints.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImpactEstimator;

impl ImpactEstimator {
    /// Creates an estimator.
    pub fn new() -> Self {
        Self
    }

    /// Hints for one initiative, one or more per theme tag.
    ///
    /// An initiative without themes gets a single `lines_changed` hint.
    /// Confidence gets a small bonus when the initiative accounts for more
    /// than a quarter of all changed lines in `summary`.
    pub fn estimate(&self, initiative: &Initiative, summary: &ContributionSummary) -> Vec<ImpactHint> {
        let lines = initiative.total_changes();
        let files = initiative.files.len();
        let level = ImpactLevel::classify(lines, files);

        let mut confidence =
            level.base_confidence() + CONFIDENCE_PER_COMMIT * initiative.commits.len() as f64;
        let total = summary.total_changes();
        if total > 0 && lines as f64 / total as f64 > 0.25 {
            confidence += DOMINANT_SHARE_BONUS;
        }
        let confidence = round2(confidence.clamp(MIN_CONFIDENCE, MAX_CONFIDENCE));

        let untagged = ["other".to_string()];
        let themes: Vec<&String> = if initiative.themes.is_empty() {
            untagged.iter().collect()
        } else {
            initiative.themes.iter().collect()
        };

        let mut hints = Vec::new();
        for theme in themes {
            for rule in rules_for(theme) {
                let raw = (rule.value)(lines, files);
                let (value, low, high) = match rule.ranges {
                    Some(ranges) => {
                        let (low, high) = ranges[level.rank()];
                        (round2(raw.clamp(low, high)), low, high)
                    }
                    None => (raw, raw, raw),
                };
                hints.push(ImpactHint {
                    initiative_id: initiative.id.clone(),
                    theme: theme.clone(),
                    metric: rule.metric.to_string(),
                    value,
                    low,
                    high,
                    unit: rule.unit.to_string(),
                    confidence,
                    level,
                });
            }
        }
        hints
    }

    /// Hints for every initiative, in initiative order.
    pub fn estimate_all(
        &self,
        initiatives: &[Initiative],
        summary: &ContributionSummary,
    ) -> Vec<ImpactHint> {
        initiatives
            .iter()
            .flat_map(|i| self.estimate(i, summary))
            .collect()
    }
}

/// Aggregate of one theme across all of a person's commits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeSignal {
    /// Theme tag.
    pub theme: String,
    /// Commits whose message matched the theme.
    pub commit_count: usize,
    /// First lines of up to five matching commits.
    pub evidence: Vec<String>,
    /// Size bucket of the matching commits together.
    pub level: ImpactLevel,
    /// `min(0.9, commits / 10 + lines / 1000)`.
    pub confidence: f64,
    /// Distinct files touched by matching commits.
    pub files_involved: usize,
    /// Human-readable metric hints.
    pub metrics_hints: Vec<String>,
}

/// Per-theme signals over `commits`, in vocabulary order; themes with no
/// matching commit are omitted.
pub fn detect_theme_signals(commits: &[CommitInfo], vocabulary: &ThemeVocabulary) -> Vec<ThemeSignal> {
    let mut signals = Vec::new();

    for theme in vocabulary.tags() {
        let matching: Vec<&CommitInfo> = commits
            .iter()
            .filter(|c| vocabulary.matches(theme, &c.message))
            .collect();
        if matching.is_empty() {
            continue;
        }

        let lines: usize = matching.iter().map(|c| c.total_changes()).sum();
        let mut files = std::collections::BTreeSet::new();
        for commit in &matching {
            files.extend(commit.files.keys().map(String::as_str));
        }

        let confidence = round2(
            (matching.len() as f64 / 10.0 + lines as f64 / 1000.0).min(MAX_CONFIDENCE),
        );

        signals.push(ThemeSignal {
            theme: theme.to_string(),
            commit_count: matching.len(),
            evidence: matching
                .iter()
                .take(MAX_EVIDENCE_MESSAGES)
                .map(|c| c.subject().chars().take(EVIDENCE_MESSAGE_LEN).collect())
                .collect(),
            level: ImpactLevel::classify(lines, files.len()),
            confidence,
            files_involved: files.len(),
            metrics_hints: metric_hints(theme, lines, files.len()),
        });
    }

    signals
}

fn metric_hints(theme: &str, lines: usize, files: usize) -> Vec<String> {
    match theme {
        "performance" => vec![
            format!(
                "Potential latency reduction: ~{}%",
                (lines as f64 / 20.0).min(50.0).round()
            ),
            format!("Potential throughput increase: ~{}x", files.min(3)),
        ],
        "reliability" => vec![format!(
            "Potential error reduction: ~{}%",
            (lines as f64 / 10.0).min(90.0).round()
        )],
        "architecture" => vec![format!("Components refactored: {files} files")],
        "feature" => vec![format!("Components delivered: {files} files")],
        _ => vec![format!("Lines changed: {lines}")],
    }
}
