//! Narrative generation through an external language model.

pub mod ai;
pub mod error;
pub mod offline;
pub mod prompts;
pub mod stages;
#[cfg(test)]
pub(crate) mod test_utils;

use anyhow::Result;
use tracing::debug;

pub use ai::{AiClient, AiClientMetadata};
pub use error::NarrativeError;
pub use offline::{draft_sections, OFFLINE_NOTE};
pub use stages::{NarrativeGenerator, NarrativeRequest, Stage};

use crate::utils::preflight::{AiCredentialInfo, AiProvider};

/// Builds the client for a resolved provider.
pub fn create_client(info: &AiCredentialInfo, max_tokens: u32) -> Result<Box<dyn AiClient>> {
    debug!(provider = %info.provider, model = %info.model, "Creating AI client");

    let client: Box<dyn AiClient> = match info.provider {
        AiProvider::Claude => Box::new(ai::claude::ClaudeAiClient::new(
            info.model.clone(),
            info.api_key.clone().unwrap_or_default(),
            info.base_url.clone(),
            max_tokens,
        )?),
        AiProvider::OpenAi => Box::new(ai::openai::OpenAiAiClient::new_openai(
            info.model.clone(),
            info.api_key.clone().unwrap_or_default(),
            info.base_url.clone(),
            max_tokens,
        )?),
        AiProvider::Ollama => Box::new(ai::openai::OpenAiAiClient::new_ollama(
            info.model.clone(),
            info.base_url.clone(),
            max_tokens,
        )?),
    };
    Ok(client)
}
