//! Keyword vocabulary mapping commit messages to theme tags.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use anyhow::{Context, Result};
use regex::Regex;

use crate::config::AnalysisOptions;

/// Built-in vocabulary used when the configuration does not supply one.
pub const DEFAULT_THEMES: &[(&str, &[&str])] = &[
    (
        "performance",
        &[
            "optimize",
            "performance",
            "speed",
            "latency",
            "cache",
            "async",
            "parallel",
        ],
    ),
    (
        "architecture",
        &[
            "refactor",
            "architecture",
            "design",
            "pattern",
            "structure",
            "migration",
        ],
    ),
    (
        "reliability",
        &[
            "fix",
            "bug",
            "error",
            "exception",
            "test",
            "security",
            "validation",
        ],
    ),
    (
        "feature",
        &[
            "add",
            "implement",
            "feature",
            "endpoint",
            "api",
            "ui",
            "component",
        ],
    ),
];

#[derive(Debug, Clone)]
struct Theme {
    tag: String,
    pattern: Regex,
}

/// Compiled theme vocabulary.
///
/// A keyword matches case-insensitively at the start of a word, so
/// `optimize` matches "optimized" but `fix` does not match "prefix".
#[derive(Debug, Clone)]
pub struct ThemeVocabulary {
    themes: Vec<Theme>,
}

impl ThemeVocabulary {
    /// Compiles a vocabulary from theme tag to keywords.
    pub fn new<I, K, S>(themes: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, Vec<S>)>,
        K: Into<String>,
        S: AsRef<str>,
    {
        let mut compiled = Vec::new();
        for (tag, keywords) in themes {
            let tag = tag.into();
            let alternatives: Vec<String> = keywords
                .iter()
                .map(|k| k.as_ref().trim())
                .filter(|k| !k.is_empty())
                .map(regex::escape)
                .collect();
            if alternatives.is_empty() {
                continue;
            }
            let pattern = Regex::new(&format!(r"(?i)\b(?:{})", alternatives.join("|")))
                .with_context(|| format!("Failed to compile keywords for theme '{tag}'"))?;
            compiled.push(Theme { tag, pattern });
        }
        Ok(Self { themes: compiled })
    }

    /// The built-in vocabulary.
    pub fn builtin() -> Result<Self> {
        Self::new(
            DEFAULT_THEMES
                .iter()
                .map(|(tag, words)| (*tag, words.to_vec())),
        )
    }

    /// The configured vocabulary, or the built-in one.
    pub fn from_options(options: &AnalysisOptions) -> Result<Self> {
        match &options.themes {
            Some(themes) => Self::new(themes.iter().map(|(k, v)| (k.clone(), v.clone()))),
            None => Self::builtin(),
        }
    }

    /// Theme tags in vocabulary order.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.themes.iter().map(|t| t.tag.as_str())
    }

    /// Every tag whose keywords occur in `message`.
    pub fn tags_for(&self, message: &str) -> BTreeSet<String> {
        self.themes
            .iter()
            .filter(|t| t.pattern.is_match(message))
            .map(|t| t.tag.clone())
            .collect()
    }

    /// Whether `message` mentions a keyword of `tag`.
    pub fn matches(&self, tag: &str, message: &str) -> bool {
        self.themes
            .iter()
            .any(|t| t.tag == tag && t.pattern.is_match(message))
    }
}

/// Most frequent meaningful word (alphabetic, longer than three characters)
/// across `messages`, title-cased, provided it occurs at least twice.
/// Ties go to the word seen first.
pub fn dominant_word<'a, I>(messages: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    let mut order = 0usize;

    for message in messages {
        for word in message.to_lowercase().split_whitespace() {
            if word.chars().count() > 3 && word.chars().all(char::is_alphabetic) {
                let entry = counts.entry(word.to_string()).or_insert((0, order));
                entry.0 += 1;
                order += 1;
            }
        }
    }

    let (word, (count, _)) = counts
        .into_iter()
        .max_by(|(_, (ca, fa)), (_, (cb, fb))| ca.cmp(cb).then_with(|| fb.cmp(fa)))?;

    if count < 2 {
        return None;
    }

    let mut chars = word.chars();
    chars
        .next()
        .map(|first| first.to_uppercase().chain(chars).collect())
}

/// Per-tag keyword lists of the built-in vocabulary, for display.
pub fn default_theme_map() -> BTreeMap<String, Vec<String>> {
    DEFAULT_THEMES
        .iter()
        .map(|(tag, words)| {
            (
                (*tag).to_string(),
                words.iter().map(|w| (*w).to_string()).collect(),
            )
        })
        .collect()
}
