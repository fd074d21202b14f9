//! Heuristic drafting used when no language model is available.
//!
//! Sections are assembled from the most complex initiatives and, when there
//! are fewer of those than requested, a closing section summarising all
//! contributions. The output uses the same section layout as the model
//! stages so it goes through the same formatting and scoring.

use std::fmt::Write as _;

use crate::data::evidence::{EvidenceBundle, InitiativeEvidence};

/// Line added to the bullet document when it was drafted offline.
pub const OFFLINE_NOTE: &str = "[Offline mode] Language model pipeline unavailable. \
Sections were drafted from local signals and carry no model editing.";

const MAX_SUBJECTS: usize = 3;

fn theme_verb(theme: Option<&str>) -> &'static str {
    match theme {
        Some("performance") => "Optimized",
        Some("architecture") => "Architected",
        Some("reliability") => "Hardened",
        Some("feature") => "Delivered",
        _ => "Developed",
    }
}

fn theme_noun(theme: Option<&str>) -> &'static str {
    match theme {
        Some("performance") => "performance",
        Some("architecture") => "architecture",
        Some("reliability") => "reliability",
        Some("feature") => "features",
        _ => "improvements",
    }
}

/// Drafts up to `bullets_count` sections from `bundle`.
pub fn draft_sections(bundle: &EvidenceBundle, bullets_count: usize) -> String {
    let mut sections: Vec<String> = bundle
        .initiatives
        .iter()
        .take(bullets_count)
        .map(|i| initiative_section(bundle, i))
        .collect();

    if sections.len() < bullets_count && bundle.summary.total_commits > 0 {
        sections.push(summary_section(bundle));
    }

    if sections.is_empty() {
        return String::new();
    }
    sections.join("\n\n")
}

fn initiative_section(bundle: &EvidenceBundle, initiative: &InitiativeEvidence) -> String {
    let theme = initiative.themes.first().map(String::as_str);
    let subject = initiative
        .focus
        .as_deref()
        .map(str::to_lowercase)
        .unwrap_or_else(|| "core".to_string());
    let title = format!("{} {subject} {}", theme_verb(theme), theme_noun(theme));

    let themes = if initiative.themes.is_empty() {
        "general development".to_string()
    } else {
        initiative.themes.join(", ")
    };
    let bullet = format!(
        "Delivered {} touching {} with {} lines changed across {themes}.",
        counted(initiative.commit_count, "commit"),
        counted(initiative.files_affected.len(), "file"),
        initiative.total_changes,
    );

    let subjects: Vec<&str> = initiative
        .commits
        .iter()
        .filter_map(|sha| bundle.commits.iter().find(|c| &c.sha == sha))
        .map(|c| c.msg.as_str())
        .take(MAX_SUBJECTS)
        .collect();

    let mut description = format!(
        "Work ran from {} to {} as initiative {} with complexity score {}.",
        initiative.start, initiative.end, initiative.id, initiative.complexity_score
    );
    if !subjects.is_empty() {
        let _ = write!(description, " Key changes: {}.", subjects.join("; "));
    }

    format_section(&title, &bullet, &description)
}

fn summary_section(bundle: &EvidenceBundle) -> String {
    let summary = &bundle.summary;
    let bullet = format!(
        "Authored {} touching {} with +{}/-{} line changes.",
        counted(summary.total_commits, "commit"),
        counted(summary.files_touched_count, "file"),
        summary.total_insertions,
        summary.total_deletions
    );

    let mut description = format!(
        "Averaged {} commits per week across {} directories.",
        summary.avg_commits_per_week, summary.directories_touched_count
    );
    let hot: Vec<String> = bundle
        .top_files
        .iter()
        .take(5)
        .map(|f| format!("{} ({})", f.path, f.commits))
        .collect();
    if !hot.is_empty() {
        let _ = write!(description, " Most touched files: {}.", hot.join(", "));
    }
    if !bundle.languages.is_empty() {
        let langs: Vec<String> = bundle
            .languages
            .iter()
            .map(|(ext, n)| format!("{ext}:{n}"))
            .collect();
        let _ = write!(description, " Language breakdown: {}.", langs.join(", "));
    }

    format_section("Sustained codebase contributions", &bullet, &description)
}

fn counted(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("1 {noun}")
    } else {
        format!("{n} {noun}s")
    }
}

fn format_section(title: &str, bullet: &str, description: &str) -> String {
    format!("## {title}\n**Bullet Point:** {bullet} <br />\n**Description:** {description}")
}
