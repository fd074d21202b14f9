//! Git repository operations.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use git2::{Repository, Sort};
use tracing::debug;

use crate::config::GitOptions;
use crate::git::CommitInfo;

/// Git repository wrapper.
pub struct GitRepository {
    repo: Repository,
    path: PathBuf,
}

impl GitRepository {
    /// Opens the repository at the specified path.
    pub fn open_at<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let repo = Repository::open(path)
            .with_context(|| format!("Failed to open git repository at {}", path.display()))?;

        Ok(Self {
            repo,
            path: path.to_path_buf(),
        })
    }

    /// Returns the working directory, if the repository is not bare.
    pub fn workdir(&self) -> Option<&Path> {
        self.repo.workdir()
    }

    /// Returns the underlying `git2::Repository`.
    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    /// Reads every commit reachable from HEAD that passes the date and merge
    /// filters, oldest first.
    ///
    /// A repository without any commit yields an empty list.
    pub fn load_history(&self, options: &GitOptions) -> Result<Vec<CommitInfo>> {
        if self
            .repo
            .is_empty()
            .context("Failed to inspect repository HEAD")?
        {
            debug!(path = %self.path.display(), "Repository has no commits");
            return Ok(Vec::new());
        }

        let mut walker = self.repo.revwalk().context("Failed to create revwalk")?;
        walker.push_head().context("Failed to push HEAD")?;
        walker
            .set_sorting(Sort::TIME)
            .context("Failed to set revwalk sorting")?;

        let since = options.since.map(|d| d.timestamp());
        let until = options.until.map(|d| d.timestamp());

        let mut commits = Vec::new();
        let mut skipped_merges = 0usize;

        for oid in walker {
            let oid = oid.context("Failed to get commit OID from walker")?;
            let commit = self
                .repo
                .find_commit(oid)
                .context("Failed to find commit")?;

            if !options.include_merge_commits && commit.parent_count() > 1 {
                skipped_merges += 1;
                continue;
            }

            let authored = commit.author().when().seconds();
            if since.is_some_and(|s| authored < s) || until.is_some_and(|u| authored > u) {
                continue;
            }

            commits.push(CommitInfo::from_git_commit(&self.repo, &commit)?);
        }

        commits.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.hash.cmp(&b.hash)));

        debug!(
            path = %self.path.display(),
            commits = commits.len(),
            skipped_merges,
            "Loaded git history"
        );

        Ok(commits)
    }
}
