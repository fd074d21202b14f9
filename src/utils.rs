//! Utility functions and helpers.

pub mod preflight;
pub mod progress;
pub mod settings;

pub use preflight::{check_ai_credentials, AiCredentialInfo, AiProvider};
pub use progress::ProgressTracker;
pub use settings::{get_env_var, Settings};
