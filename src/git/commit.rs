//! Commit metadata extraction.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset};
use git2::{Commit, DiffOptions, Patch, Repository};
use serde::{Deserialize, Serialize};

use super::abbreviate_hash;

/// Line counts for one file in one commit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStat {
    /// Lines added.
    pub insertions: usize,
    /// Lines removed.
    pub deletions: usize,
}

impl FileStat {
    /// Lines added plus lines removed.
    pub fn total(&self) -> usize {
        self.insertions + self.deletions
    }
}

/// A commit as read from the repository. Never modified after reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    /// Full SHA-1 hash of the commit.
    pub hash: String,
    /// Author name.
    pub author_name: String,
    /// Author email address.
    pub author_email: String,
    /// Authored timestamp with the author's offset.
    pub date: DateTime<FixedOffset>,
    /// Commit message, trimmed.
    pub message: String,
    /// Per-file line counts keyed by repository-relative path.
    pub files: BTreeMap<String, FileStat>,
}

impl CommitInfo {
    /// Creates a `CommitInfo` from a `git2::Commit`, diffing against its first parent.
    pub fn from_git_commit(repo: &Repository, commit: &Commit) -> Result<Self> {
        let hash = commit.id().to_string();
        let author = commit.author();

        let when = author.when();
        let offset = FixedOffset::east_opt(when.offset_minutes() * 60)
            .or_else(|| FixedOffset::east_opt(0))
            .context("Invalid commit timezone offset")?;
        let date = DateTime::from_timestamp(when.seconds(), 0)
            .context("Invalid commit timestamp")?
            .with_timezone(&offset);

        let files = Self::file_stats(repo, commit)
            .with_context(|| format!("Failed to compute diff stats for {hash}"))?;

        Ok(Self {
            hash,
            author_name: author.name().unwrap_or("Unknown").to_string(),
            author_email: author.email().unwrap_or("").to_string(),
            date,
            message: commit.message().unwrap_or("").trim().to_string(),
            files,
        })
    }

    /// Computes insertions and deletions per file.
    fn file_stats(repo: &Repository, commit: &Commit) -> Result<BTreeMap<String, FileStat>> {
        let commit_tree = commit.tree().context("Failed to get commit tree")?;

        let parent_tree = if commit.parent_count() > 0 {
            Some(
                commit
                    .parent(0)
                    .context("Failed to get parent commit")?
                    .tree()
                    .context("Failed to get parent tree")?,
            )
        } else {
            None
        };

        let mut opts = DiffOptions::new();
        opts.context_lines(0);
        let diff = repo
            .diff_tree_to_tree(parent_tree.as_ref(), Some(&commit_tree), Some(&mut opts))
            .context("Failed to create diff")?;

        let mut files = BTreeMap::new();
        for idx in 0..diff.deltas().len() {
            let Some(delta) = diff.get_delta(idx) else {
                continue;
            };
            let Some(path) = delta
                .new_file()
                .path()
                .or_else(|| delta.old_file().path())
                .and_then(|p| p.to_str())
                .map(str::to_string)
            else {
                continue;
            };

            // Binary files have no patch; they still count as touched.
            let stat = match Patch::from_diff(&diff, idx).context("Failed to build patch")? {
                Some(patch) => {
                    let (_, insertions, deletions) =
                        patch.line_stats().context("Failed to count patch lines")?;
                    FileStat {
                        insertions,
                        deletions,
                    }
                }
                None => FileStat::default(),
            };

            files.insert(path, stat);
        }

        Ok(files)
    }

    /// Abbreviated hash.
    pub fn short_hash(&self) -> &str {
        abbreviate_hash(&self.hash)
    }

    /// First line of the message.
    pub fn subject(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }

    /// Total lines added across files.
    pub fn insertions(&self) -> usize {
        self.files.values().map(|f| f.insertions).sum()
    }

    /// Total lines removed across files.
    pub fn deletions(&self) -> usize {
        self.files.values().map(|f| f.deletions).sum()
    }

    /// Lines added plus lines removed.
    pub fn total_changes(&self) -> usize {
        self.files.values().map(FileStat::total).sum()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Builds a commit without a repository. `files` is `(path, insertions, deletions)`.
    pub(crate) fn commit(
        hash: &str,
        date: &str,
        message: &str,
        files: &[(&str, usize, usize)],
    ) -> CommitInfo {
        CommitInfo {
            hash: hash.to_string(),
            author_name: "Test User".to_string(),
            author_email: "test@example.com".to_string(),
            date: DateTime::parse_from_rfc3339(date).unwrap(),
            message: message.to_string(),
            files: files
                .iter()
                .map(|(path, insertions, deletions)| {
                    (
                        (*path).to_string(),
                        FileStat {
                            insertions: *insertions,
                            deletions: *deletions,
                        },
                    )
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::commit;

    #[test]
    fn test_totals() {
        let c = commit(
            "0123456789abcdef",
            "2024-01-01T10:00:00Z",
            "Add cache layer\n\nLonger body",
            &[("src/cache.rs", 40, 2), ("src/lib.rs", 3, 1)],
        );
        assert_eq!(c.insertions(), 43);
        assert_eq!(c.deletions(), 3);
        assert_eq!(c.total_changes(), 46);
        assert_eq!(c.subject(), "Add cache layer");
        assert_eq!(c.short_hash(), "0123456789");
    }

    #[test]
    fn test_short_hash_of_short_id() {
        let c = commit("abc", "2024-01-01T10:00:00Z", "x", &[]);
        assert_eq!(c.short_hash(), "abc");
    }
}
