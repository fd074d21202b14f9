//! Section layout repair, enhancement and rendering of the bullet document.
//!
//! Every section of the final document has the shape
//!
//! ```text
//! ## Title
//! **Bullet Point:** one line <br />
//! **Description:** a few sentences
//! ```
//!
//! Model output drifts from that shape in predictable ways (list items, lower
//! case labels, a bare paragraph under the heading), so it is repaired before
//! sections are extracted, enhanced and scored.

use std::fmt::Write as _;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use super::quality::{BulletDraft, QualityScorer};

const BULLET_LABEL: &str = "**Bullet Point:**";
const DESCRIPTION_LABEL: &str = "**Description:**";
const BREAK_TAG: &str = "<br />";
const MAX_SUGGESTIONS: usize = 5;

const HIGH_QUALITY: f64 = 0.8;
const MEDIUM_QUALITY: f64 = 0.6;
const LOW_QUALITY: f64 = 0.5;

/// Leading verbs replaced by stronger ones in section titles.
const STRONG_VERBS: &[(&str, &str)] = &[
    ("built", "Architected"),
    ("made", "Implemented"),
    ("created", "Developed"),
    ("improved", "Optimized"),
    ("fixed", "Resolved"),
    ("updated", "Enhanced"),
    ("added", "Delivered"),
];

const FILLER_WORDS: &[&str] = &["successfully", "effectively", "efficiently"];

const PASSIVE_FIXES: &[(&str, &str)] = &[
    ("was implemented", "implemented"),
    ("was created", "created"),
    ("was developed", "developed"),
    ("were improved", "improved"),
    ("has been", "is"),
];

static BULLET_LABEL_VARIANT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\*{0,2}\s*bullet\s*[- ]?point\s*:\s*\*{0,2}\s*").unwrap()
});
static DESCRIPTION_LABEL_VARIANT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\*{0,2}\s*description\s*:\s*\*{0,2}\s*").unwrap());
static TRAILING_BREAKS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:\s*<br\s*/?>\s*)+$").unwrap());
static FILLER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\s*\b(?:{})\b", FILLER_WORDS.join("|"))).unwrap()
});

/// One `## Title` block. Missing parts are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Section {
    /// Heading text without the `## ` marker.
    pub title: String,
    /// Text after the bullet label.
    pub bullet: String,
    /// Text after the description label.
    pub description: String,
}

/// Count of sections per quality band.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QualityDistribution {
    /// Score above 0.8.
    pub high: usize,
    /// Score from 0.5 to 0.8 inclusive.
    pub medium: usize,
    /// Score below 0.5.
    pub low: usize,
}

/// Whole-document quality report.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OutputValidation {
    /// No blocking issues were found.
    pub valid: bool,
    /// Mean section score, 0.0 for an empty document.
    pub average_quality: f64,
    /// Sections found in the document.
    pub section_count: usize,
    /// Problems that make the document invalid.
    pub issues: Vec<String>,
    /// Improvement hints, at most a handful.
    pub suggestions: Vec<String>,
    /// Section counts per quality band.
    pub distribution: QualityDistribution,
}

fn is_list_item(line: &str) -> bool {
    line.trim_start().starts_with("- ")
}

/// Rewrites `text` so every `## ` section carries exactly one bullet line and
/// one description line.
///
/// A leading `# ` heading is kept, list items are dropped and label spelling
/// is normalized. A section with no labels is split at its first sentence.
pub fn validate_and_autofix_sections(text: &str) -> String {
    if text.trim().is_empty() {
        return text.to_string();
    }

    let lines: Vec<&str> = text.lines().collect();
    let mut out: Vec<String> = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        if i == 0 && line.starts_with("# ") {
            out.push(line.to_string());
            i += 1;
            continue;
        }
        if is_list_item(line) {
            i += 1;
            continue;
        }
        if !line.starts_with("## ") {
            out.push(line.to_string());
            i += 1;
            continue;
        }

        out.push(line.trim().to_string());
        i += 1;
        let mut body = Vec::new();
        while i < lines.len() && !lines[i].starts_with("## ") {
            if !is_list_item(lines[i]) {
                body.push(lines[i]);
            }
            i += 1;
        }

        let (bullet, description) = repair_section_body(&body);
        out.push(format!("{BULLET_LABEL} {bullet} {BREAK_TAG}"));
        out.push(format!("{DESCRIPTION_LABEL} {description}"));
        out.push(String::new());
    }

    let mut fixed = out.join("\n").trim_end().to_string();
    fixed.push('\n');
    fixed
}

enum Field {
    Preamble,
    Bullet,
    Description,
    Ignored,
}

/// Returns `(bullet, description)` for the lines under one heading.
fn repair_section_body(body: &[&str]) -> (String, String) {
    let mut bullet: Option<String> = None;
    let mut description: Option<String> = None;
    let mut preamble: Vec<&str> = Vec::new();
    let mut current = Field::Preamble;

    for raw in body {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(m) = BULLET_LABEL_VARIANT.find(line) {
            current = if bullet.is_none() {
                bullet = Some(line[m.end()..].to_string());
                Field::Bullet
            } else {
                Field::Ignored
            };
        } else if let Some(m) = DESCRIPTION_LABEL_VARIANT.find(line) {
            current = if description.is_none() {
                description = Some(line[m.end()..].to_string());
                Field::Description
            } else {
                Field::Ignored
            };
        } else {
            let target = match current {
                Field::Preamble => {
                    preamble.push(line);
                    continue;
                }
                Field::Bullet => bullet.as_mut(),
                Field::Description => description.as_mut(),
                Field::Ignored => None,
            };
            if let Some(value) = target {
                if !value.is_empty() {
                    value.push(' ');
                }
                value.push_str(line);
            }
        }
    }

    let bullet = bullet.map(|b| strip_breaks(&b));
    let description = description.map(|d| d.trim().to_string());

    if bullet.is_none() && description.is_none() {
        let paragraph = preamble.join(" ");
        if paragraph.is_empty() {
            return (
                "Summary unavailable.".to_string(),
                "Details unavailable.".to_string(),
            );
        }
        return match split_first_sentence(&paragraph) {
            (first, Some(rest)) => (first.to_string(), rest.to_string()),
            (first, None) => (first.to_string(), paragraph.clone()),
        };
    }

    let description = match description.filter(|d| !d.is_empty()) {
        Some(d) => d,
        None if !preamble.is_empty() => preamble.join(" "),
        None => "Summary not provided.".to_string(),
    };
    let bullet = match bullet.filter(|b| !b.is_empty()) {
        Some(b) => b,
        None => split_first_sentence(&description).0.to_string(),
    };
    (bullet, description)
}

/// Splits `text` after its first sentence terminator that is followed by
/// whitespace.
fn split_first_sentence(text: &str) -> (&str, Option<&str>) {
    for (idx, c) in text.char_indices() {
        if matches!(c, '.' | '!' | '?') {
            let end = idx + c.len_utf8();
            let rest = &text[end..];
            if rest.starts_with(char::is_whitespace) {
                let rest = rest.trim();
                return (
                    text[..end].trim(),
                    (!rest.is_empty()).then_some(rest),
                );
            }
        }
    }
    (text.trim(), None)
}

fn strip_breaks(text: &str) -> String {
    TRAILING_BREAKS.replace(text.trim(), "").trim().to_string()
}

/// Parses `## ` sections out of a formatted document.
pub fn extract_sections(text: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut current: Option<Section> = None;

    for line in text.lines().map(str::trim) {
        if let Some(title) = line.strip_prefix("## ") {
            if let Some(section) = current.take() {
                sections.push(section);
            }
            current = Some(Section {
                title: title.trim().to_string(),
                ..Section::default()
            });
        } else if let Some(bullet) = line.strip_prefix(BULLET_LABEL) {
            if let Some(section) = current.as_mut() {
                section.bullet = strip_breaks(bullet);
            }
        } else if let Some(description) = line.strip_prefix(DESCRIPTION_LABEL) {
            if let Some(section) = current.as_mut() {
                section.description = description.trim().to_string();
            }
        }
    }

    sections.extend(current);
    sections
}

/// Strengthens the wording of one section.
pub fn enhance_section(section: &Section) -> Section {
    Section {
        title: enhance_title(&section.title),
        bullet: enhance_bullet(&section.bullet),
        description: enhance_description(&section.description),
    }
}

fn enhance_title(title: &str) -> String {
    let title = title.trim();
    let (first, rest) = match title.split_once(' ') {
        Some((first, rest)) => (first, Some(rest)),
        None => (title, None),
    };
    let replacement = STRONG_VERBS
        .iter()
        .find(|(weak, _)| first.eq_ignore_ascii_case(weak))
        .map(|(_, strong)| *strong);

    match (replacement, rest) {
        (Some(strong), Some(rest)) => format!("{strong} {rest}"),
        (Some(strong), None) => strong.to_string(),
        (None, _) => title.to_string(),
    }
}

fn enhance_bullet(bullet: &str) -> String {
    let without_filler = FILLER_PATTERN.replace_all(bullet, "");
    let collapsed = without_filler.split_whitespace().collect::<Vec<_>>().join(" ");
    capitalize_first(&collapsed)
}

fn enhance_description(description: &str) -> String {
    PASSIVE_FIXES
        .iter()
        .fold(description.trim().to_string(), |acc, (passive, active)| {
            acc.replace(passive, active)
        })
}

fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Repairs, extracts, enhances and scores every section in `text`.
pub fn draft_sections(text: &str, scorer: &QualityScorer) -> Vec<BulletDraft> {
    extract_sections(&validate_and_autofix_sections(text))
        .iter()
        .map(enhance_section)
        .map(|s| scorer.draft(&s.title, &s.bullet, &s.description))
        .collect()
}

fn average(scores: &[f64]) -> f64 {
    if scores.is_empty() {
        0.0
    } else {
        scores.iter().sum::<f64>() / scores.len() as f64
    }
}

/// Renders the final bullet document.
///
/// `note` is emitted as a block quote under the quality line, used to flag
/// offline drafts.
pub fn format_complete_output(
    title: &str,
    person: &str,
    drafts: &[BulletDraft],
    note: Option<&str>,
) -> String {
    let mut out = format!("# {title}\n\n");

    if drafts.is_empty() {
        let _ = writeln!(out, "*No CV sections could be drafted for {person}*\n");
    } else {
        let scores: Vec<f64> = drafts.iter().map(|d| d.score).collect();
        let avg = average(&scores);
        let indicator = if avg > HIGH_QUALITY {
            "🔥"
        } else if avg > MEDIUM_QUALITY {
            "✨"
        } else {
            "📝"
        };
        let _ = writeln!(out, "*{indicator} Enhanced CV content generated for {person}*\n");
    }

    if let Some(note) = note {
        let _ = writeln!(out, "> {note}\n");
    }

    for draft in drafts {
        let _ = writeln!(out, "## {}", draft.title);
        let _ = writeln!(out, "{BULLET_LABEL} {} {BREAK_TAG}", draft.bullet);
        let _ = writeln!(out, "{DESCRIPTION_LABEL} {}\n", draft.description);
    }

    let mut out = out.trim_end().to_string();
    out.push('\n');
    out
}

/// Scores every section of a rendered document.
pub fn validate_output_quality(text: &str, scorer: &QualityScorer) -> OutputValidation {
    let sections = extract_sections(text);
    if sections.is_empty() {
        return OutputValidation {
            valid: false,
            issues: vec!["No valid sections found".to_string()],
            suggestions: vec!["Check section formatting".to_string()],
            ..OutputValidation::default()
        };
    }

    let mut issues = Vec::new();
    let mut suggestions = Vec::new();
    let mut scores = Vec::new();

    for (n, section) in sections.iter().enumerate().map(|(i, s)| (i + 1, s)) {
        if section.title.is_empty() || section.bullet.is_empty() || section.description.is_empty()
        {
            issues.push(format!("Section {n}: Missing required components"));
            continue;
        }

        let assessment = scorer.assess(&section.title, &section.bullet, &section.description);
        scores.push(assessment.score);
        if assessment.score < LOW_QUALITY {
            issues.push(format!(
                "Section {n} '{}': Low quality score ({:.1})",
                section.title, assessment.score
            ));
            suggestions.extend(
                assessment
                    .suggestions
                    .iter()
                    .map(|s| format!("Section {n}: {s}")),
            );
        }
    }

    suggestions.truncate(MAX_SUGGESTIONS);
    let distribution = QualityDistribution {
        high: scores.iter().filter(|s| **s > HIGH_QUALITY).count(),
        medium: scores
            .iter()
            .filter(|s| (LOW_QUALITY..=HIGH_QUALITY).contains(*s))
            .count(),
        low: scores.iter().filter(|s| **s < LOW_QUALITY).count(),
    };

    OutputValidation {
        valid: issues.is_empty(),
        average_quality: average(&scores),
        section_count: sections.len(),
        issues,
        suggestions,
        distribution,
    }
}
