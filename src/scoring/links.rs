//! Proof link handling for the bullet document.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::git::GitHubSlug;

/// Repository prefixes that models and sample configs tend to emit in place
/// of the real one.
const PLACEHOLDER_PREFIXES: &[&str] = &[
    "https://github.com/project/repo/",
    "https://github.com/your-org-or-username/your-repo-name/",
    "https://github.com/org/repo/",
    "https://github.com/owner/repo/",
    "https://github.com/${GITHUB_OWNER}/${GITHUB_REPO}/",
    "https://github.com/${owner}/${repo}/",
    "https://github.com/<owner>/<repo>/",
    "https://github.com/<ORG>/<REPO>/",
];

static PROOF_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[Proof\]\(([^)]+)\)").unwrap());
static COMMIT_SHA: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9a-fA-F]{7,40}$").unwrap());
static PULL_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+$").unwrap());
static REPEATED_BLANKS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]{2,}").unwrap());
static MARKDOWN_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").unwrap());
static BARE_URL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"https?://\S+").unwrap());

/// Rewrites placeholder repository URLs to point at `slug`.
pub fn normalize_proof_links(text: &str, slug: &GitHubSlug) -> String {
    if slug.owner.is_empty() || slug.repo.is_empty() {
        return text.to_string();
    }
    let base = format!("https://github.com/{}/{}/", slug.owner, slug.repo);
    PLACEHOLDER_PREFIXES
        .iter()
        .fold(text.to_string(), |acc, placeholder| acc.replace(placeholder, &base))
}

/// Drops `[Proof](...)` links whose commit SHA or pull number is malformed.
///
/// Links to anything other than a commit or a pull request are kept.
pub fn sanitize_proof_links(text: &str) -> String {
    let cleaned = PROOF_LINK.replace_all(text, |caps: &Captures<'_>| {
        let url = &caps[1];
        let keep = if let Some(sha) = path_segment_after(url, "/commit/") {
            COMMIT_SHA.is_match(sha)
        } else if let Some(number) = path_segment_after(url, "/pull/") {
            PULL_NUMBER.is_match(number)
        } else {
            true
        };
        if keep {
            caps[0].to_string()
        } else {
            String::new()
        }
    });
    REPEATED_BLANKS.replace_all(&cleaned, " ").into_owned()
}

/// Removes every link, keeping link text.
pub fn remove_links(text: &str) -> String {
    let text = MARKDOWN_LINK.replace_all(text, "$1");
    let text = BARE_URL.replace_all(&text, "");
    text.replace("Proof:", "").replace("Proof", "")
}

/// The path segment following the last `marker` in `url`.
fn path_segment_after<'a>(url: &'a str, marker: &str) -> Option<&'a str> {
    let (_, rest) = url.rsplit_once(marker)?;
    Some(rest.split('/').next().unwrap_or(rest))
}
