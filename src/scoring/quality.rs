//! Deterministic quality checks for drafted CV sections.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::config::OutputOptions;

const METRICS_WEIGHT: f64 = 0.3;
const TECHNICAL_WEIGHT: f64 = 0.3;
const LENGTH_WEIGHT: f64 = 0.2;
const VOICE_WEIGHT: f64 = 0.2;

/// Default lower bound on description words.
pub const DEFAULT_MIN_WORDS: usize = 20;
/// Default upper bound on description words.
pub const DEFAULT_MAX_WORDS: usize = 80;

/// Technical vocabulary, grouped for readability only.
pub const TECHNICAL_VOCABULARY: &[(&str, &[&str])] = &[
    (
        "architecture",
        &["microservices", "api", "rest", "graphql", "database", "cache", "queue"],
    ),
    (
        "performance",
        &["latency", "throughput", "optimization", "scaling", "load", "performance"],
    ),
    (
        "infrastructure",
        &["docker", "kubernetes", "aws", "azure", "gcp", "ci/cd", "deployment"],
    ),
    (
        "languages",
        &["python", "javascript", "typescript", "java", "go", "rust", "kotlin"],
    ),
    (
        "frameworks",
        &["react", "angular", "vue", "django", "flask", "spring", "express"],
    ),
    (
        "databases",
        &["postgresql", "mysql", "mongodb", "redis", "elasticsearch", "dynamodb"],
    ),
    (
        "tools",
        &["git", "jira", "jenkins", "terraform", "ansible", "prometheus", "grafana"],
    ),
];

static METRIC_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\d+%|\d+x|\d+ms|\d+s|\d+\.\d+[a-z]*|\$\d+|\d+k\b|\d+m\b|\d+ (?:users?|files?|requests?|transactions?|errors?)",
    )
    .unwrap()
});

static TECHNICAL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    let alternatives: Vec<String> = TECHNICAL_VOCABULARY
        .iter()
        .flat_map(|(_, terms)| terms.iter().map(|t| regex::escape(t)))
        .collect();
    Regex::new(&format!(r"(?i)\b(?:{})\b", alternatives.join("|"))).unwrap()
});

static PASSIVE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:is|are|was|were|be|been|being)\s+(?:\w+ly\s+)?\w+(?:ed|en)\b").unwrap()
});

static BREAK_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").unwrap());

/// Result of the four presence checks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityAssessment {
    /// A numeric or metric token appears somewhere in the section.
    pub has_metrics: bool,
    /// At least one technical vocabulary term appears.
    pub has_technical_terms: bool,
    /// Description word count is within the configured bounds.
    pub appropriate_length: bool,
    /// The bullet's first clause does not read as passive voice.
    pub active_voice: bool,
    /// Weighted sum of the checks, in [0, 1].
    pub score: f64,
    /// One suggestion per failed check.
    pub suggestions: Vec<String>,
}

/// A drafted section together with its assessment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulletDraft {
    /// Section heading after verb enhancement.
    pub title: String,
    /// The one-line CV bullet.
    pub bullet: String,
    /// Supporting detail shown under the bullet.
    pub description: String,
    /// Quality score in `[0, 1]`.
    pub score: f64,
    /// Fixes suggested by the scorer.
    pub suggestions: Vec<String>,
}

/// Scores drafted sections.
#[derive(Debug, Clone, Copy)]
pub struct QualityScorer {
    min_words: usize,
    max_words: usize,
}

impl Default for QualityScorer {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_WORDS, DEFAULT_MAX_WORDS)
    }
}

impl QualityScorer {
    /// Creates a scorer accepting descriptions of `min_words..=max_words` words.
    pub fn new(min_words: usize, max_words: usize) -> Self {
        Self {
            min_words,
            max_words,
        }
    }

    /// Creates a scorer from the output configuration.
    pub fn from_options(options: &OutputOptions) -> Self {
        Self::new(options.min_words, options.max_words)
    }

    /// Runs every check against one section.
    pub fn assess(&self, title: &str, bullet: &str, description: &str) -> QualityAssessment {
        let full_text = format!("{title} {bullet} {description}");

        let has_metrics = METRIC_PATTERN.is_match(&full_text);
        let has_technical_terms = TECHNICAL_PATTERN.is_match(&full_text);

        let words = description.split_whitespace().count();
        let appropriate_length = (self.min_words..=self.max_words).contains(&words);

        let active_voice = !PASSIVE_PATTERN.is_match(first_clause(bullet));

        let score = [
            (has_metrics, METRICS_WEIGHT),
            (has_technical_terms, TECHNICAL_WEIGHT),
            (appropriate_length, LENGTH_WEIGHT),
            (active_voice, VOICE_WEIGHT),
        ]
        .iter()
        .filter(|(passed, _)| *passed)
        .map(|(_, weight)| weight)
        .sum::<f64>();

        let mut suggestions = Vec::new();
        if !has_metrics {
            suggestions.push("Add specific metrics (percentages, time improvements, scale)".to_string());
        }
        if !has_technical_terms {
            suggestions.push("Include more technical terminology and technologies".to_string());
        }
        if !appropriate_length {
            if words < self.min_words {
                suggestions.push("Expand description with more technical details".to_string());
            } else {
                suggestions.push("Condense description to focus on key achievements".to_string());
            }
        }
        if !active_voice {
            suggestions.push("Use more active voice constructions".to_string());
        }

        QualityAssessment {
            has_metrics,
            has_technical_terms,
            appropriate_length,
            active_voice,
            score: (score * 100.0).round() / 100.0,
            suggestions,
        }
    }

    /// Assesses a section and packages it as a [`BulletDraft`].
    pub fn draft(&self, title: &str, bullet: &str, description: &str) -> BulletDraft {
        let assessment = self.assess(title, bullet, description);
        BulletDraft {
            title: title.to_string(),
            bullet: bullet.to_string(),
            description: description.to_string(),
            score: assessment.score,
            suggestions: assessment.suggestions,
        }
    }
}

/// Text of `bullet` up to the first clause break, without line-break tags.
fn first_clause(bullet: &str) -> &str {
    let text = match BREAK_TAG.find(bullet) {
        Some(m) => &bullet[..m.start()],
        None => bullet,
    };
    text.split([',', ';', '.', ':'])
        .next()
        .unwrap_or(text)
        .trim()
}
