//! Configuration file loading and validation.
//!
//! The configuration is read once at startup from a YAML file and turned into
//! an immutable [`Config`] that is passed explicitly to every stage. All
//! validation problems are reported as [`ConfigError`] naming the offending
//! field.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset, NaiveDate};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default configuration file name, resolved against the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

/// Configuration errors. Always fatal.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file does not exist.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The configuration file exists but could not be read.
    #[error("Failed to read configuration file {}: {source}", path.display())]
    Read {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid YAML for the expected layout.
    #[error("Invalid YAML in config file: {0}")]
    InvalidYaml(String),

    /// A required top-level section is absent.
    #[error("Missing required config section: {0}")]
    MissingSection(&'static str),

    /// A required field is absent or empty.
    #[error("'{0}' is required")]
    MissingField(&'static str),

    /// A field is present but has an unusable value.
    #[error("'{field}' {reason}")]
    InvalidField {
        /// Dotted path of the field.
        field: String,
        /// What is wrong with it.
        reason: String,
    },
}

impl ConfigError {
    /// Returns the dotted field path or section name the error refers to.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::MissingSection(name) | Self::MissingField(name) => Some(*name),
            Self::InvalidField { field, .. } => Some(field.as_str()),
            Self::NotFound(_) | Self::Read { .. } | Self::InvalidYaml(_) => None,
        }
    }

    fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// The person whose contributions are analysed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    /// Full name, also accepted as an author name.
    pub full_name: String,
    /// Role used to tailor the editing stage.
    pub role: String,
    /// Alternative author names and GitHub logins.
    pub aliases: Vec<String>,
    /// Author email addresses.
    pub emails: Vec<String>,
}

impl Identity {
    /// Returns true when a commit author name or email belongs to this person.
    ///
    /// Names match exactly against the full name or an alias; emails match
    /// case-insensitively.
    pub fn matches(&self, name: &str, email: &str) -> bool {
        if name == self.full_name || self.aliases.iter().any(|a| a == name) {
            return true;
        }
        self.emails.iter().any(|e| e.eq_ignore_ascii_case(email))
    }

    /// Returns true when a GitHub login belongs to this person.
    pub fn matches_login(&self, login: &str) -> bool {
        self.aliases.iter().any(|a| a.eq_ignore_ascii_case(login))
    }
}

/// History selection options.
#[derive(Debug, Clone, Default)]
pub struct GitOptions {
    /// Only commits authored at or after this instant.
    pub since: Option<DateTime<FixedOffset>>,
    /// Only commits authored at or before this instant.
    pub until: Option<DateTime<FixedOffset>>,
    /// Whether merge commits are read.
    pub include_merge_commits: bool,
}

/// Signal analysis options.
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    /// Upper bound on files visited by the codebase scan.
    pub max_files: usize,
    /// How many hot files are ranked.
    pub hot_file_top_n: usize,
    /// File extensions (without dot) considered by the codebase scan; empty means all.
    pub languages_of_interest: Vec<String>,
    /// Compiled exclude globs applied to repository-relative paths.
    pub exclude: GlobSet,
    /// The raw exclude patterns, kept for reporting.
    pub exclude_patterns: Vec<String>,
    /// Gap in days that still chains two commits into one initiative.
    pub window_days: u32,
    /// Groups with fewer commits are not reported as initiatives.
    pub min_initiative_commits: usize,
    /// Optional replacement theme vocabulary: theme tag to keywords.
    pub themes: Option<BTreeMap<String, Vec<String>>>,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            max_files: 2000,
            hot_file_top_n: 50,
            languages_of_interest: Vec::new(),
            exclude: GlobSet::empty(),
            exclude_patterns: Vec::new(),
            window_days: 7,
            min_initiative_commits: 2,
            themes: None,
        }
    }
}

/// Optional GitHub source.
#[derive(Debug, Clone, Default)]
pub struct GitHubOptions {
    /// Repository owner; detected from the `origin` remote when absent.
    pub owner: Option<String>,
    /// Repository name; detected from the `origin` remote when absent.
    pub repo: Option<String>,
    /// API base URL override (GitHub Enterprise or tests).
    pub api_url: Option<String>,
    /// Maximum issues and pull requests fetched each.
    pub max_items: usize,
}

/// Which language model backend drafts the narrative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// Pick from available credentials.
    #[default]
    Auto,
    /// Anthropic Messages API.
    Claude,
    /// OpenAI chat completions.
    OpenAi,
    /// Local Ollama, OpenAI-compatible.
    Ollama,
    /// Never call a model.
    Offline,
}

/// Language model options.
#[derive(Debug, Clone)]
pub struct LlmOptions {
    /// Backend selection.
    pub provider: LlmProvider,
    /// Model override.
    pub model: Option<String>,
    /// Base URL override for OpenAI-compatible backends.
    pub base_url: Option<String>,
    /// Output token ceiling per stage.
    pub max_tokens: u32,
}

impl Default for LlmOptions {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Auto,
            model: None,
            base_url: None,
            max_tokens: 4096,
        }
    }
}

/// Evidence file serialization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvidenceFormat {
    /// `signals.json`
    #[default]
    Json,
    /// `signals.yaml`
    Yaml,
}

/// Output options.
#[derive(Debug, Clone)]
pub struct OutputOptions {
    /// Number of CV sections requested from the model.
    pub bullets_count: usize,
    /// Editing style hint.
    pub style: String,
    /// Directory receiving the evidence file and bullet document.
    pub directory: PathBuf,
    /// Evidence file format.
    pub evidence_format: EvidenceFormat,
    /// Keep `[Proof](...)` links instead of stripping all links.
    pub proof_links: bool,
    /// Heading of the bullet document; defaults to the repository directory name.
    pub title: Option<String>,
    /// Lower bound on description word count.
    pub min_words: usize,
    /// Upper bound on description word count.
    pub max_words: usize,
}

/// Validated, immutable configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Where the configuration was loaded from.
    pub source: PathBuf,
    /// The person being profiled.
    pub you: Identity,
    /// History selection.
    pub git: GitOptions,
    /// Signal analysis.
    pub analysis: AnalysisOptions,
    /// GitHub source.
    pub github: GitHubOptions,
    /// Language model backend.
    pub llm: LlmOptions,
    /// Output documents.
    pub output: OutputOptions,
}

// ── Raw file layout ──────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    you: Option<RawIdentity>,
    git: Option<RawGit>,
    analysis: Option<RawAnalysis>,
    output: Option<RawOutput>,
    #[serde(default)]
    github: RawGitHub,
    #[serde(default)]
    llm: RawLlm,
}

#[derive(Debug, Default, Deserialize)]
struct RawIdentity {
    full_name: Option<String>,
    role: Option<String>,
    #[serde(default)]
    aliases: Vec<String>,
    emails: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct RawGit {
    since: Option<String>,
    until: Option<String>,
    #[serde(default)]
    include_merge_commits: bool,
}

#[derive(Debug, Default, Deserialize)]
struct RawAnalysis {
    max_files: Option<usize>,
    hot_file_top_n: Option<usize>,
    #[serde(default)]
    languages_of_interest: Vec<String>,
    #[serde(default)]
    exclude_paths: Vec<String>,
    window_days: Option<i64>,
    min_initiative_commits: Option<usize>,
    themes: Option<BTreeMap<String, Vec<String>>>,
}

#[derive(Debug, Default, Deserialize)]
struct RawGitHub {
    owner: Option<String>,
    repo: Option<String>,
    api_url: Option<String>,
    max_items: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct RawLlm {
    #[serde(default)]
    provider: LlmProvider,
    model: Option<String>,
    base_url: Option<String>,
    max_tokens: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct RawOutput {
    bullets_count: Option<i64>,
    style: Option<String>,
    directory: Option<PathBuf>,
    #[serde(default)]
    evidence_format: EvidenceFormat,
    #[serde(default)]
    proof_links: bool,
    title: Option<String>,
    min_words: Option<usize>,
    max_words: Option<usize>,
}

impl Config {
    /// Loads and validates the configuration file at `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_yaml_str(&content, path)
    }

    /// Parses and validates configuration text. `source` is only recorded.
    pub fn from_yaml_str(content: &str, source: &Path) -> Result<Self, ConfigError> {
        let raw: Option<RawConfig> =
            serde_yaml::from_str(content).map_err(|e| ConfigError::InvalidYaml(e.to_string()))?;
        let raw = raw.unwrap_or_default();

        let you = raw.you.ok_or(ConfigError::MissingSection("you"))?;
        let git = raw.git.ok_or(ConfigError::MissingSection("git"))?;
        let analysis = raw.analysis.ok_or(ConfigError::MissingSection("analysis"))?;
        let output = raw.output.ok_or(ConfigError::MissingSection("output"))?;

        let config = Self {
            source: source.to_path_buf(),
            you: validate_identity(you)?,
            git: validate_git(git)?,
            analysis: validate_analysis(analysis)?,
            github: GitHubOptions {
                owner: raw.github.owner.filter(|s| !s.trim().is_empty()),
                repo: raw.github.repo.filter(|s| !s.trim().is_empty()),
                api_url: raw.github.api_url,
                max_items: raw.github.max_items.unwrap_or(100),
            },
            llm: LlmOptions {
                provider: raw.llm.provider,
                model: raw.llm.model,
                base_url: raw.llm.base_url,
                max_tokens: raw.llm.max_tokens.unwrap_or(4096),
            },
            output: validate_output(output)?,
        };

        tracing::debug!(
            source = %config.source.display(),
            person = %config.you.full_name,
            bullets = config.output.bullets_count,
            "Configuration loaded"
        );

        Ok(config)
    }
}

fn validate_identity(raw: RawIdentity) -> Result<Identity, ConfigError> {
    let full_name = raw
        .full_name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .ok_or(ConfigError::MissingField("you.full_name"))?;

    let emails: Vec<String> = raw
        .emails
        .unwrap_or_default()
        .into_iter()
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())
        .collect();
    if emails.is_empty() {
        return Err(ConfigError::invalid(
            "you.emails",
            "must be a non-empty list",
        ));
    }

    Ok(Identity {
        full_name,
        role: raw.role.unwrap_or_else(|| "Software Engineer".to_string()),
        aliases: raw.aliases,
        emails,
    })
}

fn validate_git(raw: RawGit) -> Result<GitOptions, ConfigError> {
    let since = raw
        .since
        .as_deref()
        .map(|s| parse_date_bound(s, false).ok_or_else(|| bad_date("git.since", s)))
        .transpose()?;
    let until = raw
        .until
        .as_deref()
        .map(|s| parse_date_bound(s, true).ok_or_else(|| bad_date("git.until", s)))
        .transpose()?;

    if let (Some(since), Some(until)) = (since, until) {
        if since > until {
            return Err(ConfigError::invalid(
                "git.since",
                "must not be later than 'git.until'",
            ));
        }
    }

    Ok(GitOptions {
        since,
        until,
        include_merge_commits: raw.include_merge_commits,
    })
}

fn validate_analysis(raw: RawAnalysis) -> Result<AnalysisOptions, ConfigError> {
    let defaults = AnalysisOptions::default();

    let window_days = match raw.window_days {
        None => defaults.window_days,
        Some(days) if days >= 1 => u32::try_from(days)
            .map_err(|_| ConfigError::invalid("analysis.window_days", "is too large"))?,
        Some(_) => {
            return Err(ConfigError::invalid(
                "analysis.window_days",
                "must be at least 1",
            ))
        }
    };

    let mut builder = GlobSetBuilder::new();
    for pattern in &raw.exclude_paths {
        let glob = Glob::new(pattern).map_err(|e| {
            ConfigError::invalid("analysis.exclude_paths", format!("has a bad glob: {e}"))
        })?;
        builder.add(glob);
    }
    let exclude = builder
        .build()
        .map_err(|e| ConfigError::invalid("analysis.exclude_paths", e.to_string()))?;

    if let Some(themes) = &raw.themes {
        if themes.is_empty() {
            return Err(ConfigError::invalid(
                "analysis.themes",
                "must define at least one theme when present",
            ));
        }
        if let Some((tag, _)) = themes.iter().find(|(_, words)| words.is_empty()) {
            return Err(ConfigError::invalid(
                &format!("analysis.themes.{tag}"),
                "must list at least one keyword",
            ));
        }
    }

    let max_files = raw.max_files.unwrap_or(defaults.max_files);
    if max_files == 0 {
        return Err(ConfigError::invalid(
            "analysis.max_files",
            "must be at least 1",
        ));
    }

    Ok(AnalysisOptions {
        max_files,
        hot_file_top_n: raw.hot_file_top_n.unwrap_or(defaults.hot_file_top_n),
        languages_of_interest: raw
            .languages_of_interest
            .into_iter()
            .map(|l| l.trim_start_matches('.').to_lowercase())
            .collect(),
        exclude,
        exclude_patterns: raw.exclude_paths,
        window_days,
        min_initiative_commits: raw
            .min_initiative_commits
            .unwrap_or(defaults.min_initiative_commits)
            .max(1),
        themes: raw.themes,
    })
}

fn validate_output(raw: RawOutput) -> Result<OutputOptions, ConfigError> {
    let bullets_count = match raw.bullets_count {
        Some(n) if n > 0 => n as usize,
        _ => {
            return Err(ConfigError::invalid(
                "output.bullets_count",
                "must be a positive integer",
            ))
        }
    };

    let min_words = raw.min_words.unwrap_or(20);
    let max_words = raw.max_words.unwrap_or(80);
    if min_words > max_words {
        return Err(ConfigError::invalid(
            "output.min_words",
            "must not exceed 'output.max_words'",
        ));
    }

    Ok(OutputOptions {
        bullets_count,
        style: raw
            .style
            .unwrap_or_else(|| "senior_technical_lead".to_string()),
        directory: raw.directory.unwrap_or_else(|| PathBuf::from("output")),
        evidence_format: raw.evidence_format,
        proof_links: raw.proof_links,
        title: raw.title,
        min_words,
        max_words,
    })
}

fn bad_date(field: &str, value: &str) -> ConfigError {
    ConfigError::invalid(
        field,
        format!("has unrecognised date '{value}' (expected YYYY-MM-DD or RFC 3339)"),
    )
}

/// Parses a `YYYY-MM-DD` or RFC 3339 date. Plain dates resolve to the start of
/// the day, or to its last second when `end_of_day` is set, in UTC.
pub fn parse_date_bound(value: &str, end_of_day: bool) -> Option<DateTime<FixedOffset>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt);
    }

    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()?;
    let time = if end_of_day {
        date.and_hms_opt(23, 59, 59)?
    } else {
        date.and_hms_opt(0, 0, 0)?
    };
    Some(time.and_utc().fixed_offset())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const VALID: &str = r"
you:
  full_name: Test User
  aliases: [tuser]
  emails: [test@example.com]
git:
  since: 2023-01-01
analysis:
  max_files: 1000
output:
  bullets_count: 5
";

    fn parse(yaml: &str) -> Result<Config, ConfigError> {
        Config::from_yaml_str(yaml, Path::new("config.yaml"))
    }

    #[test]
    fn test_valid_config() {
        let config = parse(VALID).unwrap();
        assert_eq!(config.you.full_name, "Test User");
        assert_eq!(config.you.role, "Software Engineer");
        assert_eq!(config.output.bullets_count, 5);
        assert_eq!(config.output.style, "senior_technical_lead");
        assert_eq!(config.analysis.max_files, 1000);
        assert_eq!(config.analysis.hot_file_top_n, 50);
        assert_eq!(config.analysis.window_days, 7);
        assert_eq!(config.llm.provider, LlmProvider::Auto);
        assert_eq!(config.output.evidence_format, EvidenceFormat::Json);
        assert_eq!(
            config.git.since,
            parse_date_bound("2023-01-01T00:00:00Z", false)
        );
        assert!(config.git.until.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, VALID).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.source, path);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        let err = Config::load(dir.path().join("nope.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_missing_emails_names_field() {
        let err = parse(
            r"
you:
  full_name: Test User
git: {}
analysis: {}
output:
  bullets_count: 3
",
        )
        .unwrap_err();
        assert_eq!(err.field(), Some("you.emails"));
        assert_eq!(err.to_string(), "'you.emails' must be a non-empty list");
    }

    #[test]
    fn test_missing_section() {
        let err = parse("you:\n  full_name: A\n  emails: [a@b.c]\n").unwrap_err();
        assert!(matches!(err, ConfigError::MissingSection("git")));
    }

    #[test]
    fn test_empty_document_reports_first_section() {
        let err = parse("").unwrap_err();
        assert!(matches!(err, ConfigError::MissingSection("you")));
    }

    #[test]
    fn test_missing_full_name() {
        let err = parse(
            "you:\n  emails: [a@b.c]\ngit: {}\nanalysis: {}\noutput:\n  bullets_count: 1\n",
        )
        .unwrap_err();
        assert_eq!(err.field(), Some("you.full_name"));
    }

    #[test]
    fn test_non_positive_bullet_count() {
        let err = parse(&VALID.replace("bullets_count: 5", "bullets_count: 0")).unwrap_err();
        assert_eq!(err.field(), Some("output.bullets_count"));
    }

    #[test]
    fn test_bad_date() {
        let err = parse(&VALID.replace("2023-01-01", "last tuesday")).unwrap_err();
        assert_eq!(err.field(), Some("git.since"));
    }

    #[test]
    fn test_since_after_until() {
        let yaml = VALID.replace("since: 2023-01-01", "since: 2024-01-01\n  until: 2023-01-01");
        let err = parse(&yaml).unwrap_err();
        assert_eq!(err.field(), Some("git.since"));
    }

    #[test]
    fn test_bad_glob() {
        let yaml = VALID.replace("max_files: 1000", "exclude_paths: ['vendor/[']");
        let err = parse(&yaml).unwrap_err();
        assert_eq!(err.field(), Some("analysis.exclude_paths"));
    }

    #[test]
    fn test_zero_max_files_rejected() {
        let yaml = VALID.replace("max_files: 1000", "max_files: 0");
        let err = parse(&yaml).unwrap_err();
        assert_eq!(err.field(), Some("analysis.max_files"));
    }

    #[test]
    fn test_word_bounds_inverted() {
        let yaml = VALID.replace("bullets_count: 5", "bullets_count: 5\n  min_words: 90");
        let err = parse(&yaml).unwrap_err();
        assert_eq!(err.field(), Some("output.min_words"));
    }

    #[test]
    fn test_custom_themes_and_provider() {
        let yaml = VALID.replace(
            "max_files: 1000",
            "themes:\n    caching: [cache, memo]\n  window_days: 2",
        ) + "llm:\n  provider: offline\n";
        let config = parse(&yaml).unwrap();
        assert_eq!(config.analysis.window_days, 2);
        assert_eq!(
            config.analysis.themes.unwrap().get("caching").unwrap(),
            &vec!["cache".to_string(), "memo".to_string()]
        );
        assert_eq!(config.llm.provider, LlmProvider::Offline);
    }

    #[test]
    fn test_identity_matching() {
        let config = parse(VALID).unwrap();
        assert!(config.you.matches("Test User", "other@example.com"));
        assert!(config.you.matches("tuser", "other@example.com"));
        assert!(config.you.matches("Someone", "TEST@example.com"));
        assert!(!config.you.matches("Someone", "someone@example.com"));
        assert!(config.you.matches_login("TUser"));
    }

    #[test]
    fn test_parse_date_bound() {
        let start = parse_date_bound("2024-03-05", false).unwrap();
        let end = parse_date_bound("2024-03-05", true).unwrap();
        assert_eq!(start.to_rfc3339(), "2024-03-05T00:00:00+00:00");
        assert_eq!(end.to_rfc3339(), "2024-03-05T23:59:59+00:00");
        assert!(parse_date_bound("2024-03-05T10:00:00+02:00", false).is_some());
        assert!(parse_date_bound("05/03/2024", false).is_none());
    }
}
