use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Parser;
use git2::{Oid, Repository, Signature, Time};
use repo_cv::config::{Config, GitOptions};
use repo_cv::git::{partition_by_author, GitRepository};
use repo_cv::narrative::OFFLINE_NOTE;
use repo_cv::pipeline::{self, RunOptions};
use repo_cv::utils::ProgressTracker;
use repo_cv::Cli;
use tempfile::TempDir;

/// 2024-05-01T00:00:00Z
const MAY_FIRST: i64 = 1_714_521_600;
const HOUR: i64 = 3600;
const DAY: i64 = 24 * HOUR;

const JANE: (&str, &str) = ("Jane Doe", "jane@example.com");
const BOB: (&str, &str) = ("Bob Smith", "bob@example.com");

/// Temporary repository with commits at fixed times and authors.
struct TestRepo {
    _temp_dir: TempDir,
    repo_path: PathBuf,
    repo: Repository,
}

impl TestRepo {
    fn new() -> Result<Self> {
        let temp_dir = tempfile::tempdir()?;
        let repo_path = temp_dir.path().join("shop");
        fs::create_dir(&repo_path)?;
        let repo = Repository::init(&repo_path)?;

        Ok(Self {
            _temp_dir: temp_dir,
            repo_path,
            repo,
        })
    }

    fn signature(author: (&str, &str), secs: i64) -> Result<Signature<'static>> {
        Ok(Signature::new(author.0, author.1, &Time::new(secs, 0))?)
    }

    fn write_files(&self, files: &[(&str, &str)]) -> Result<Oid> {
        let mut index = self.repo.index()?;
        for (path, content) in files {
            let full = self.repo_path.join(path);
            if let Some(parent) = full.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&full, content)?;
            index.add_path(Path::new(path))?;
        }
        index.write()?;
        Ok(index.write_tree()?)
    }

    fn head(&self) -> Option<git2::Commit<'_>> {
        self.repo.head().ok().and_then(|h| h.peel_to_commit().ok())
    }

    /// Commits `files` on HEAD as `author` at `secs`.
    fn commit(
        &self,
        author: (&str, &str),
        secs: i64,
        message: &str,
        files: &[(&str, &str)],
    ) -> Result<Oid> {
        let tree = self.repo.find_tree(self.write_files(files)?)?;
        let signature = Self::signature(author, secs)?;
        let parent = self.head();
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();
        Ok(self.repo.commit(
            Some("HEAD"),
            &signature,
            &signature,
            message,
            &tree,
            &parents,
        )?)
    }

    /// Creates a side commit off HEAD and merges it back.
    fn merge_side_branch(&self, author: (&str, &str), secs: i64) -> Result<Oid> {
        let base = self.head().ok_or_else(|| anyhow::anyhow!("no HEAD"))?;
        let tree = self
            .repo
            .find_tree(self.write_files(&[("side.txt", "side\n")])?)?;
        let signature = Self::signature(author, secs)?;

        let side_oid = self.repo.commit(
            None,
            &signature,
            &signature,
            "Side work",
            &tree,
            &[&base],
        )?;
        let side = self.repo.find_commit(side_oid)?;

        let merge_sig = Self::signature(author, secs + HOUR)?;
        Ok(self.repo.commit(
            Some("HEAD"),
            &merge_sig,
            &merge_sig,
            "Merge side branch",
            &tree,
            &[&base, &side],
        )?)
    }
}

fn cache_history(repo: &TestRepo) -> Result<()> {
    repo.commit(
        JANE,
        MAY_FIRST + 9 * HOUR,
        "Optimize session cache",
        &[("src/cache.rs", "fn get() {}\nfn put() {}\n")],
    )?;
    repo.commit(
        BOB,
        MAY_FIRST + 12 * HOUR,
        "Update readme",
        &[("README.md", "# Shop\n")],
    )?;
    repo.commit(
        JANE,
        MAY_FIRST + DAY + 9 * HOUR,
        "Tune cache eviction",
        &[("src/cache.rs", "fn get() {}\nfn put() {}\nfn evict() {}\n")],
    )?;
    repo.commit(
        JANE,
        MAY_FIRST + 2 * DAY + 9 * HOUR,
        "Cache warmup on boot",
        &[
            ("src/cache.rs", "fn get() {}\nfn put() {}\nfn evict() {}\nfn warm() {}\n"),
            ("src/boot.rs", "fn boot() {}\n"),
        ],
    )?;
    Ok(())
}

fn write_config(dir: &Path, extra_git: &str, out: &Path) -> Result<PathBuf> {
    let path = dir.join("config.yaml");
    fs::write(
        &path,
        format!(
            "you:\n  full_name: Jane Doe\n  role: Backend Engineer\n  emails: [jane@example.com]\n\
             git: {{{extra_git}}}\n\
             analysis:\n  window_days: 3\n\
             output:\n  bullets_count: 2\n  title: shop\n  directory: {}\n",
            out.display()
        ),
    )?;
    Ok(path)
}

#[test]
fn test_history_reader_filters_and_attributes() -> Result<()> {
    let repo = TestRepo::new()?;
    cache_history(&repo)?;
    let dir = tempfile::tempdir()?;

    let config = Config::load(write_config(dir.path(), "since: 2024-05-02", dir.path())?)?;
    let history = GitRepository::open_at(&repo.repo_path)?.load_history(&config.git)?;

    let subjects: Vec<&str> = history.iter().map(|c| c.subject()).collect();
    assert_eq!(subjects, vec!["Tune cache eviction", "Cache warmup on boot"]);
    assert_eq!(history[1].files.len(), 2);
    assert_eq!(history[1].insertions(), 2);

    let all = GitRepository::open_at(&repo.repo_path)?.load_history(&GitOptions::default())?;
    let (mine, others) = partition_by_author(all, &config.you);
    assert_eq!(mine.len(), 3);
    assert_eq!(others.len(), 1);
    assert_eq!(others[0].author_name, "Bob Smith");
    Ok(())
}

#[test]
fn test_merge_commits_follow_option() -> Result<()> {
    let repo = TestRepo::new()?;
    repo.commit(JANE, MAY_FIRST, "Initial import", &[("a.txt", "a\n")])?;
    repo.merge_side_branch(JANE, MAY_FIRST + DAY)?;

    let reader = GitRepository::open_at(&repo.repo_path)?;
    let default = reader.load_history(&GitOptions::default())?;
    assert!(default.iter().all(|c| c.subject() != "Merge side branch"));
    assert_eq!(default.len(), 2);

    let with_merges = reader.load_history(&GitOptions {
        include_merge_commits: true,
        ..GitOptions::default()
    })?;
    assert_eq!(with_merges.len(), 3);
    Ok(())
}

#[tokio::test]
async fn test_offline_run_writes_evidence_and_bullets() -> Result<()> {
    let repo = TestRepo::new()?;
    cache_history(&repo)?;
    let dir = tempfile::tempdir()?;
    let out = dir.path().join("out");
    let config = Config::load(write_config(dir.path(), "", &out)?)?;

    let options = RunOptions {
        repo_path: repo.repo_path.clone(),
        output_dir: None,
        offline: true,
    };
    let mut progress = ProgressTracker::new(Vec::new(), true);
    let report = pipeline::run(&config, &options, &mut progress).await?;

    assert!(report.offline);
    assert_eq!(report.evidence_path, out.join("signals.json"));
    assert!(report
        .skipped_sources
        .iter()
        .any(|s| s.starts_with("GitHub: ")));

    let evidence: serde_json::Value = serde_json::from_str(&fs::read_to_string(&report.evidence_path)?)?;
    assert_eq!(evidence["metadata"]["person_name"], "Jane Doe");
    let commits = evidence["commits"].as_array().unwrap();
    assert_eq!(commits.len(), 3);

    let initiative = &evidence["initiatives"][0];
    assert_eq!(initiative["commit_count"], 3);
    assert!(initiative["themes"]
        .as_array()
        .unwrap()
        .iter()
        .any(|t| t == "performance"));
    for sha in initiative["commits"].as_array().unwrap() {
        assert!(commits.iter().any(|c| &c["sha"] == sha), "unknown commit {sha}");
    }
    for hint in evidence["impact_hints"].as_array().unwrap() {
        let confidence = hint["confidence"].as_f64().unwrap();
        assert!((0.0..1.0).contains(&confidence));
    }

    let bullets = fs::read_to_string(&report.bullets_path)?;
    assert!(bullets.starts_with("# shop\n"));
    assert!(bullets.contains(OFFLINE_NOTE));
    assert!(bullets.contains("## Optimized cache performance"));
    assert!(bullets.contains("## Sustained codebase contributions"));
    assert_eq!(report.drafts.len(), 2);
    assert_eq!(report.validation.section_count, 2);

    let printed = String::from_utf8(progress.into_inner())?;
    assert!(printed.contains("3 of 4 commits authored by Jane Doe"));
    Ok(())
}

#[tokio::test]
async fn test_validate_only_does_not_touch_outputs() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let out = dir.path().join("never");
    let config_path = write_config(dir.path(), "", &out)?;

    let cli = Cli::try_parse_from([
        "repo-cv",
        "--config",
        config_path.to_str().unwrap(),
        "--validate-only",
    ])?;
    cli.execute().await?;
    assert!(!out.exists());
    Ok(())
}

#[tokio::test]
async fn test_invalid_config_names_field() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("config.yaml");
    fs::write(
        &path,
        "you:\n  full_name: Jane\n  emails: [j@example.com]\ngit: {}\nanalysis: {}\noutput:\n  bullets_count: 0\n",
    )?;

    let cli = Cli::try_parse_from(["repo-cv", "--config", path.to_str().unwrap()])?;
    let err = cli.execute().await.unwrap_err();
    assert!(err.to_string().contains("output.bullets_count"));
    assert!(err.downcast_ref::<repo_cv::ConfigError>().is_some());
    Ok(())
}
