//! Data source errors.
//!
//! A data source failing is not fatal: the pipeline reports it, drops that
//! source, and keeps going with whatever evidence the other sources produced.

use std::path::PathBuf;

use thiserror::Error;

/// Failure of one evidence source.
#[derive(Error, Debug)]
pub enum DataSourceError {
    /// The repository could not be opened or walked.
    #[error("Repository at {} could not be read: {reason}", path.display())]
    Repository {
        /// Repository path as given.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },

    /// The GitHub API could not be reached or answered with an error.
    #[error("GitHub API request for {owner}/{repo} failed: {reason}")]
    GitHub {
        /// Repository owner.
        owner: String,
        /// Repository name.
        repo: String,
        /// What went wrong.
        reason: String,
    },

    /// The working tree could not be scanned.
    #[error("Codebase scan of {} failed: {reason}", path.display())]
    CodeScan {
        /// Scan root.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },
}

impl DataSourceError {
    /// Short name of the source, used in progress output.
    pub fn source_name(&self) -> &'static str {
        match self {
            Self::Repository { .. } => "git history",
            Self::GitHub { .. } => "GitHub",
            Self::CodeScan { .. } => "codebase scan",
        }
    }
}
