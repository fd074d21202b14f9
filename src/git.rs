//! Git history extraction.

pub mod commit;
pub mod remote;
pub mod repository;

pub use commit::{CommitInfo, FileStat};
pub use remote::{extract_github_slug, GitHubSlug, RemoteInfo};
pub use repository::GitRepository;

use crate::config::Identity;

/// Number of hex characters to show in abbreviated commit hashes.
pub const SHORT_HASH_LEN: usize = 10;

/// First [`SHORT_HASH_LEN`] characters of `hash`, or all of it when shorter.
pub fn abbreviate_hash(hash: &str) -> &str {
    hash.get(..SHORT_HASH_LEN).unwrap_or(hash)
}

/// Splits commits into those authored by `identity` and everyone else's,
/// keeping the original order in both.
pub fn partition_by_author(
    commits: Vec<CommitInfo>,
    identity: &Identity,
) -> (Vec<CommitInfo>, Vec<CommitInfo>) {
    commits
        .into_iter()
        .partition(|c| identity.matches(&c.author_name, &c.author_email))
}
