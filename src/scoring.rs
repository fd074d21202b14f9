//! Quality scoring and final formatting of CV sections.

pub mod format;
pub mod links;
pub mod quality;

pub use format::{
    draft_sections, extract_sections, format_complete_output, validate_and_autofix_sections,
    validate_output_quality, OutputValidation, QualityDistribution, Section,
};
pub use links::{normalize_proof_links, remove_links, sanitize_proof_links};
pub use quality::{BulletDraft, QualityAssessment, QualityScorer};

use crate::config::OutputOptions;
use crate::git::GitHubSlug;

/// Turns raw section text into scored drafts and a rendered document.
#[derive(Debug, Clone)]
pub struct OutputFormatter {
    scorer: QualityScorer,
    proof_links: bool,
    slug: Option<GitHubSlug>,
}

impl OutputFormatter {
    /// Creates a formatter; `slug` is used to repair placeholder links.
    pub fn new(options: &OutputOptions, slug: Option<GitHubSlug>) -> Self {
        Self {
            scorer: QualityScorer::from_options(options),
            proof_links: options.proof_links,
            slug,
        }
    }

    /// Applies the link policy to `text`.
    ///
    /// With proof links enabled, placeholder URLs are repointed at the real
    /// repository and malformed proof links are dropped. Otherwise every link
    /// is removed.
    pub fn apply_link_policy(&self, text: &str) -> String {
        if !self.proof_links {
            return remove_links(text);
        }
        let text = match &self.slug {
            Some(slug) => normalize_proof_links(text, slug),
            None => text.to_string(),
        };
        sanitize_proof_links(&text)
    }

    /// Link policy, layout repair, enhancement and scoring in one pass.
    pub fn drafts(&self, text: &str) -> Vec<BulletDraft> {
        draft_sections(&self.apply_link_policy(text), &self.scorer)
    }

    /// Renders `drafts` and reports on the result.
    pub fn render(
        &self,
        title: &str,
        person: &str,
        drafts: &[BulletDraft],
        note: Option<&str>,
    ) -> (String, OutputValidation) {
        let document = format_complete_output(title, person, drafts, note);
        let validation = validate_output_quality(&document, &self.scorer);
        (document, validation)
    }
}
