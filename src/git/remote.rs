//! Git remote operations.

use anyhow::{Context, Result};
use git2::Repository;
use serde::{Deserialize, Serialize};
use url::Url;

/// Remote repository information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteInfo {
    /// Name of the remote (e.g., "origin", "upstream").
    pub name: String,
    /// URI of the remote repository.
    pub uri: String,
}

/// A GitHub `owner/repo` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitHubSlug {
    /// Account or organisation.
    pub owner: String,
    /// Repository name without `.git`.
    pub repo: String,
}

impl std::fmt::Display for GitHubSlug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

impl RemoteInfo {
    /// Returns all remotes for a repository.
    pub fn get_all_remotes(repo: &Repository) -> Result<Vec<Self>> {
        let mut remotes = Vec::new();
        let remote_names = repo.remotes().context("Failed to get remote names")?;

        for name in remote_names.iter().flatten() {
            if let Ok(remote) = repo.find_remote(name) {
                remotes.push(Self {
                    name: name.to_string(),
                    uri: remote.url().unwrap_or("").to_string(),
                });
            }
        }

        Ok(remotes)
    }

    /// Returns the GitHub slug of the first GitHub remote, preferring `origin`.
    pub fn detect_github_slug(repo: &Repository) -> Result<Option<GitHubSlug>> {
        let mut remotes = Self::get_all_remotes(repo)?;
        remotes.sort_by_key(|r| r.name != "origin");

        Ok(remotes
            .iter()
            .find_map(|r| extract_github_slug(&r.uri)))
    }
}

/// Extracts `owner/repo` from an SSH, scp-like or HTTPS GitHub URI.
pub fn extract_github_slug(uri: &str) -> Option<GitHubSlug> {
    let path = if let Some(rest) = uri.strip_prefix("git@github.com:") {
        rest.to_string()
    } else {
        let url = Url::parse(uri).ok()?;
        if url.host_str()? != "github.com" {
            return None;
        }
        url.path().trim_start_matches('/').to_string()
    };

    let path = path.trim_end_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);

    let mut parts = path.split('/');
    let (Some(owner), Some(repo), None) = (parts.next(), parts.next(), parts.next()) else {
        return None;
    };
    if owner.is_empty() || repo.is_empty() {
        return None;
    }

    Some(GitHubSlug {
        owner: owner.to_string(),
        repo: repo.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slug(owner: &str, repo: &str) -> Option<GitHubSlug> {
        Some(GitHubSlug {
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }

    #[test]
    fn test_extract_github_slug() {
        assert_eq!(
            extract_github_slug("git@github.com:acme/widgets.git"),
            slug("acme", "widgets")
        );
        assert_eq!(
            extract_github_slug("https://github.com/acme/widgets.git"),
            slug("acme", "widgets")
        );
        assert_eq!(
            extract_github_slug("https://github.com/acme/widgets"),
            slug("acme", "widgets")
        );
        assert_eq!(
            extract_github_slug("ssh://git@github.com/acme/widgets.git"),
            slug("acme", "widgets")
        );
    }

    #[test]
    fn test_non_github_uris() {
        assert_eq!(extract_github_slug("https://gitlab.com/acme/widgets.git"), None);
        assert_eq!(extract_github_slug("https://github.com/acme"), None);
        assert_eq!(extract_github_slug("/srv/git/widgets.git"), None);
        assert_eq!(extract_github_slug("https://github.com/a/b/c"), None);
    }

    #[test]
    fn test_detect_prefers_origin() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        repo.remote("upstream", "https://github.com/upstream/widgets.git")
            .unwrap();
        repo.remote("origin", "git@github.com:me/widgets.git").unwrap();

        let detected = RemoteInfo::detect_github_slug(&repo).unwrap().unwrap();
        assert_eq!(detected.to_string(), "me/widgets");
    }
}
