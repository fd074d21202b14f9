//! End-to-end run: evidence collection, narrative drafting and formatting.
//!
//! Steps run strictly in sequence. Data source failures are reported and the
//! run continues with the remaining evidence; a failed language model call
//! falls back to the offline drafts. Only configuration and output I/O errors
//! abort a run.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::analysis::{
    detect_theme_signals, hot_files, ownership_map, CodebaseProfile, CodebaseScanner,
    ContributionSummary, ImpactEstimator, ImpactHint, Initiative, SignalAnalyzer, ThemeSignal,
    ThemeVocabulary,
};
use crate::config::{Config, LlmProvider};
use crate::data::{EvidenceBundle, EvidenceInputs, EvidenceMetadata};
use crate::error::DataSourceError;
use crate::git::{partition_by_author, CommitInfo, GitHubSlug, GitRepository, RemoteInfo};
use crate::github::{self, GitHubActivity, PrAnalysis};
use crate::narrative::{self, AiClient, NarrativeGenerator, NarrativeRequest, OFFLINE_NOTE};
use crate::scoring::{BulletDraft, OutputFormatter, OutputValidation};
use crate::utils::{check_ai_credentials, get_env_var, ProgressTracker};

/// Name of the rendered bullet document.
pub const BULLETS_FILE: &str = "bullets.md";

const TOTAL_STEPS: usize = 7;

/// Per-run settings that come from the command line rather than the config.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Repository to analyse.
    pub repo_path: PathBuf,
    /// Overrides `output.directory`.
    pub output_dir: Option<PathBuf>,
    /// Skips the language model regardless of configuration.
    pub offline: bool,
}

/// What a run produced.
#[derive(Debug)]
pub struct RunReport {
    /// Written evidence file.
    pub evidence_path: PathBuf,
    /// Written bullet document.
    pub bullets_path: PathBuf,
    /// Scored sections in document order.
    pub drafts: Vec<BulletDraft>,
    /// Quality report over the rendered document.
    pub validation: OutputValidation,
    /// True when the sections were drafted without a language model.
    pub offline: bool,
    /// Sources that failed or were skipped.
    pub skipped_sources: Vec<String>,
}

/// Evidence gathered from the repository itself.
#[derive(Default)]
struct History {
    commits: Vec<CommitInfo>,
    slug: Option<GitHubSlug>,
    workdir: Option<PathBuf>,
}

/// Runs the whole pipeline for `config`.
pub async fn run<W: Write>(
    config: &Config,
    options: &RunOptions,
    progress: &mut ProgressTracker<W>,
) -> Result<RunReport> {
    run_with_client(config, options, progress, connect_client).await
}

/// Resolves credentials for `llm` and builds the matching client.
///
/// `Ok(None)` means no credentials were found.
fn connect_client(config: &Config) -> Result<Option<Box<dyn AiClient>>> {
    let Some(credentials) = check_ai_credentials(&config.llm)? else {
        return Ok(None);
    };
    narrative::create_client(&credentials, config.llm.max_tokens).map(Some)
}

/// [`run`] with the language model client supplied by `connect`.
async fn run_with_client<W, C>(
    config: &Config,
    options: &RunOptions,
    progress: &mut ProgressTracker<W>,
    connect: C,
) -> Result<RunReport>
where
    W: Write,
    C: FnOnce(&Config) -> Result<Option<Box<dyn AiClient>>>,
{
    progress.set_total_steps(TOTAL_STEPS);
    let mut skipped_sources = Vec::new();

    // 1. History
    progress.step_with_details("Reading git history", &options.repo_path.display().to_string());
    let history = match read_history(config, &options.repo_path) {
        Ok(history) => history,
        Err(e) => {
            report_source_failure(progress, &mut skipped_sources, &e);
            History::default()
        }
    };
    let total_read = history.commits.len();
    let (mine, others) = partition_by_author(history.commits, &config.you);
    progress.info(format!(
        "{} of {total_read} commits authored by {}",
        mine.len(),
        config.you.full_name
    ));
    debug!(others = others.len(), "Commits by other authors ignored");

    // 2. Signals
    progress.step("Analyzing contribution signals");
    let vocabulary = ThemeVocabulary::from_options(&config.analysis)?;
    let initiatives = SignalAnalyzer::from_options(&vocabulary, &config.analysis).analyze(&mine);
    let summary = ContributionSummary::from_commits(&mine);
    let hot = hot_files(&mine, config.analysis.hot_file_top_n);
    let ownership = ownership_map(&mine);
    let theme_signals = detect_theme_signals(&mine, &vocabulary);
    let impact_hints = ImpactEstimator::new().estimate_all(&initiatives, &summary);
    progress.info(format!(
        "{} initiatives, {} theme signals, {} impact hints",
        initiatives.len(),
        theme_signals.len(),
        impact_hints.len()
    ));

    // 3. Working tree
    progress.step("Scanning codebase");
    let scan_root = history
        .workdir
        .clone()
        .unwrap_or_else(|| options.repo_path.clone());
    let codebase = match CodebaseScanner::new(&config.analysis).scan(&scan_root) {
        Ok(profile) => {
            report_scan(progress, &profile);
            Some(profile)
        }
        Err(e) => {
            report_source_failure(progress, &mut skipped_sources, &e);
            None
        }
    };

    // 4. GitHub
    progress.step("Fetching GitHub activity");
    let slug = github::resolve_slug(&config.github, history.slug);
    let token = get_env_var("GITHUB_TOKEN").ok();
    let activity = match github::load_activity(&config.github, slug.clone(), token, &config.you)
        .await
    {
        Ok(Ok(activity)) => {
            progress.success(format!(
                "{} issues, {} pull requests",
                activity.issues.len(),
                activity.prs.len()
            ));
            Some(activity)
        }
        Ok(Err(reason)) => {
            progress.info(format!("GitHub skipped: {reason}"));
            skipped_sources.push(format!("GitHub: {reason}"));
            None
        }
        Err(e) => {
            report_source_failure(progress, &mut skipped_sources, &e);
            None
        }
    };
    let pr_analysis = activity
        .as_ref()
        .map(|a| PrAnalysis::from_pulls(&a.prs, &config.you));

    // 5. Evidence
    progress.step("Writing evidence bundle");
    let bundle = assemble_bundle(
        config,
        options,
        &EvidenceParts {
            commits: &mine,
            summary: &summary,
            hot_files: &hot,
            codebase: codebase.as_ref(),
            initiatives: &initiatives,
            theme_signals: &theme_signals,
            impact_hints: &impact_hints,
            ownership: &ownership,
            github: activity.as_ref(),
        },
        pr_analysis,
        skipped_sources.clone(),
    );
    let output_dir = options
        .output_dir
        .clone()
        .unwrap_or_else(|| config.output.directory.clone());
    let evidence_path = bundle.write_to_dir(&output_dir, config.output.evidence_format)?;
    progress.success(format!("Evidence written to {}", evidence_path.display()));

    // 6. Narrative
    progress.step("Drafting CV sections");
    let (raw_sections, offline) = draft_narrative(config, options, &bundle, progress, connect).await;

    // 7. Formatting
    progress.step("Formatting output");
    let formatter = OutputFormatter::new(&config.output, slug);
    let drafts = formatter.drafts(&raw_sections);
    let title = document_title(config, &options.repo_path);
    let note = offline.then_some(OFFLINE_NOTE);
    let (document, validation) =
        formatter.render(&title, &config.you.full_name, &drafts, note);

    let bullets_path = output_dir.join(BULLETS_FILE);
    fs::write(&bullets_path, &document)
        .with_context(|| format!("Failed to write file: {}", bullets_path.display()))?;

    report_validation(progress, &validation);
    progress.success(format!("Bullet points written to {}", bullets_path.display()));
    info!(
        sections = drafts.len(),
        average_quality = validation.average_quality,
        offline,
        "Run complete"
    );

    Ok(RunReport {
        evidence_path,
        bullets_path,
        drafts,
        validation,
        offline,
        skipped_sources,
    })
}

fn read_history(config: &Config, path: &Path) -> Result<History, DataSourceError> {
    let error = |e: anyhow::Error| DataSourceError::Repository {
        path: path.to_path_buf(),
        reason: format!("{e:#}"),
    };

    let repo = GitRepository::open_at(path).map_err(error)?;
    let commits = repo.load_history(&config.git).map_err(error)?;
    let slug = match RemoteInfo::detect_github_slug(repo.repository()) {
        Ok(slug) => slug,
        Err(e) => {
            warn!(error = %e, "Could not inspect remotes");
            None
        }
    };

    Ok(History {
        commits,
        slug,
        workdir: repo.workdir().map(Path::to_path_buf),
    })
}

fn report_source_failure<W: Write>(
    progress: &mut ProgressTracker<W>,
    skipped: &mut Vec<String>,
    error: &DataSourceError,
) {
    warn!(source = error.source_name(), error = %error, "Data source failed");
    progress.error(error);
    skipped.push(format!("{}: {error}", error.source_name()));
}

fn report_scan<W: Write>(progress: &mut ProgressTracker<W>, profile: &CodebaseProfile) {
    let suffix = if profile.truncated { " (truncated)" } else { "" };
    progress.info(format!(
        "{} files in {} languages{suffix}",
        profile.files.len(),
        profile.languages.len()
    ));
}

fn report_validation<W: Write>(progress: &mut ProgressTracker<W>, validation: &OutputValidation) {
    progress.info(format!(
        "{} sections, average quality {:.2}",
        validation.section_count, validation.average_quality
    ));
    for issue in &validation.issues {
        progress.warning(issue);
    }
    for suggestion in &validation.suggestions {
        progress.info(suggestion);
    }
}

/// Borrowed analysis results feeding the bundle.
struct EvidenceParts<'a> {
    commits: &'a [CommitInfo],
    summary: &'a ContributionSummary,
    hot_files: &'a [(String, usize)],
    codebase: Option<&'a CodebaseProfile>,
    initiatives: &'a [Initiative],
    theme_signals: &'a [ThemeSignal],
    impact_hints: &'a [ImpactHint],
    ownership: &'a BTreeMap<String, f64>,
    github: Option<&'a GitHubActivity>,
}

fn assemble_bundle(
    config: &Config,
    options: &RunOptions,
    parts: &EvidenceParts<'_>,
    pr_analysis: Option<PrAnalysis>,
    skipped_sources: Vec<String>,
) -> EvidenceBundle {
    EvidenceBundle::assemble(EvidenceInputs {
        metadata: EvidenceMetadata {
            person_name: config.you.full_name.clone(),
            role: config.you.role.clone(),
            repo_path: options.repo_path.display().to_string(),
            generated_at: chrono::Utc::now().into(),
            tool_version: crate::VERSION.to_string(),
        },
        commits: parts.commits,
        summary: parts.summary,
        hot_files: parts.hot_files,
        codebase: parts.codebase,
        initiatives: parts.initiatives,
        theme_signals: parts.theme_signals,
        impact_hints: parts.impact_hints,
        ownership: parts.ownership,
        github: parts.github,
        pr_analysis,
        skipped_sources,
    })
}

/// Returns the raw section text and whether it was drafted offline.
async fn draft_narrative<W, C>(
    config: &Config,
    options: &RunOptions,
    bundle: &EvidenceBundle,
    progress: &mut ProgressTracker<W>,
    connect: C,
) -> (String, bool)
where
    W: Write,
    C: FnOnce(&Config) -> Result<Option<Box<dyn AiClient>>>,
{
    let bullets = config.output.bullets_count;
    let offline = || narrative::draft_sections(bundle, bullets);

    if bundle.summary.total_commits == 0 {
        progress.warning(format!(
            "No commits attributed to {}; nothing to draft",
            config.you.full_name
        ));
        return (String::new(), true);
    }
    if options.offline || config.llm.provider == LlmProvider::Offline {
        progress.info("Offline mode requested; drafting from local signals");
        return (offline(), true);
    }

    let client = match connect(config) {
        Ok(Some(client)) => client,
        Ok(None) => {
            progress.info("No language model credentials found; drafting from local signals");
            return (offline(), true);
        }
        Err(e) => {
            progress.warning(format!("{e:#}; drafting from local signals"));
            return (offline(), true);
        }
    };
    let generator = NarrativeGenerator::new(client);
    let metadata = generator.metadata();
    progress.success(format!(
        "{} client ready (model: {})",
        metadata.provider, metadata.model
    ));

    let evidence = match bundle.to_prompt_blob() {
        Ok(evidence) => evidence,
        Err(e) => {
            progress.warning(format!("{e:#}; drafting from local signals"));
            return (offline(), true);
        }
    };
    let request = NarrativeRequest {
        person: &config.you.full_name,
        role: &config.you.role,
        style: &config.output.style,
        bullets_count: bullets,
        evidence: &evidence,
    };

    let result = generator
        .generate(&request, |stage| {
            progress.info(format!("Running {} stage", stage.name()));
        })
        .await;

    match result {
        Ok(text) => (text, false),
        Err(e) => {
            warn!(error = %e, "Narrative pipeline failed");
            progress.warning(format!("{e}; falling back to offline drafting"));
            (offline(), true)
        }
    }
}

fn document_title(config: &Config, repo_path: &Path) -> String {
    if let Some(title) = &config.output.title {
        return title.clone();
    }
    fs::canonicalize(repo_path)
        .ok()
        .as_deref()
        .and_then(Path::file_name)
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Repository".to_string())
}
