//! Language model error handling.

use thiserror::Error;

/// Failures talking to a language model. Never fatal: the run falls back to
/// offline drafting.
#[derive(Error, Debug)]
pub enum NarrativeError {
    /// The service answered with a non-success status.
    #[error("API request failed: {0}")]
    ApiRequestFailed(String),

    /// The response body did not have the expected shape.
    #[error("Invalid response format from API: {0}")]
    InvalidResponseFormat(String),

    /// The service could not be reached.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// A pipeline stage failed.
    #[error("Narrative stage '{stage}' failed: {reason}")]
    StageFailed {
        /// Stage name.
        stage: &'static str,
        /// Underlying error, with its causes.
        reason: String,
    },

    /// A stage returned only whitespace.
    #[error("Narrative stage '{0}' returned an empty response")]
    EmptyResponse(&'static str),

    /// The final text holds no `## ` sections, even after layout repair.
    #[error("Narrative pipeline returned no CV sections")]
    NoSections,
}
