//! CLI interface for repo-cv.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use crate::analysis::themes::default_theme_map;
use crate::config::{Config, DEFAULT_CONFIG_PATH};
use crate::pipeline::{self, RunOptions};
use crate::utils::{get_env_var, ProgressTracker};

/// repo-cv: turns your git contributions into evidence-backed CV bullet points.
#[derive(Parser, Debug)]
#[command(name = "repo-cv")]
#[command(
    about = "Turns your git contributions into evidence-backed CV bullet points",
    long_about = None
)]
#[command(version)]
pub struct Cli {
    /// Path to the YAML configuration file.
    #[arg(long, short = 'c', value_name = "PATH", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Validates the configuration and exits.
    #[arg(long)]
    pub validate_only: bool,

    /// Suppresses progress output.
    #[arg(long, short = 'q')]
    pub quiet: bool,

    /// Repository to analyse (defaults to $REPO_PATH, then the current directory).
    #[arg(long, value_name = "PATH")]
    pub repo: Option<PathBuf>,

    /// Directory for signals and bullet files (overrides output.directory).
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Drafts sections from local signals without calling a language model.
    #[arg(long)]
    pub offline: bool,
}

impl Cli {
    /// Executes the command.
    pub async fn execute(self) -> Result<()> {
        let config = Config::load(&self.config)?;

        if self.validate_only {
            print_config_summary(&config);
            return Ok(());
        }

        let options = RunOptions {
            repo_path: self.repo_path(),
            output_dir: self.output_dir.clone(),
            offline: self.offline,
        };

        let mut progress = ProgressTracker::stdout(!self.quiet);
        let report = pipeline::run(&config, &options, &mut progress).await?;

        if !self.quiet {
            println!();
            println!("📄 {}", report.bullets_path.display());
            println!("📊 {}", report.evidence_path.display());
            if report.offline {
                println!("ℹ️  Sections were drafted offline");
            }
        }
        Ok(())
    }

    fn repo_path(&self) -> PathBuf {
        self.repo
            .clone()
            .or_else(|| get_env_var("REPO_PATH").ok().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

fn print_config_summary(config: &Config) {
    println!("✓ Configuration valid: {}", config.source.display());
    println!("   👤 {} ({})", config.you.full_name, config.you.role);
    println!("   📧 {}", config.you.emails.join(", "));
    if !config.you.aliases.is_empty() {
        println!("   🏷️  aliases: {}", config.you.aliases.join(", "));
    }

    let since = config
        .git
        .since
        .map_or_else(|| "beginning".to_string(), |d| d.to_rfc3339());
    let until = config
        .git
        .until
        .map_or_else(|| "now".to_string(), |d| d.to_rfc3339());
    println!(
        "   📅 history: {since} .. {until} (merges {})",
        if config.git.include_merge_commits {
            "included"
        } else {
            "skipped"
        }
    );
    println!(
        "   🔎 window {} days, min {} commits per initiative",
        config.analysis.window_days, config.analysis.min_initiative_commits
    );
    let themes = config
        .analysis
        .themes
        .clone()
        .unwrap_or_else(default_theme_map);
    println!(
        "   🏷️  themes: {}",
        themes.keys().cloned().collect::<Vec<_>>().join(", ")
    );
    if !config.analysis.exclude_patterns.is_empty() {
        println!(
            "   🚫 excluded: {}",
            config.analysis.exclude_patterns.join(", ")
        );
    }
    println!(
        "   📝 {} bullets, style '{}', into {}",
        config.output.bullets_count,
        config.output.style,
        config.output.directory.display()
    );
    println!("   🤖 provider: {:?}", config.llm.provider);
}
