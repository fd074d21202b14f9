//! # repo-cv
//!
//! Turns a developer's contributions to a git repository into CV bullet
//! points backed by evidence.
//!
//! ## Pipeline
//!
//! - [`git`] reads commit history and attributes it to the configured person
//! - [`analysis`] groups commits into initiatives, ranks hot files, scans the
//!   working tree and estimates impact
//! - [`github`] optionally adds issues and pull requests
//! - [`data`] assembles and writes the evidence bundle
//! - [`narrative`] drafts sections through a language model, or offline
//! - [`scoring`] repairs, enhances, scores and renders the sections
//!
//! [`pipeline::run`] drives all of it; [`Cli`] is the command line entry.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod analysis;
pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod git;
pub mod github;
pub mod narrative;
pub mod pipeline;
pub mod scoring;
pub mod utils;

pub use crate::cli::Cli;
pub use crate::config::{Config, ConfigError};
pub use crate::error::DataSourceError;

/// The current version of repo-cv.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
