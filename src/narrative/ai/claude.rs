//! Anthropic Messages API client.

use std::future::Future;
use std::pin::Pin;

use anyhow::Result;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{build_http_client, check_error_response, log_response_success};
use super::{AiClient, AiClientMetadata};
use crate::narrative::error::NarrativeError;

/// Public Anthropic API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ClaudeRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(rename = "type")]
    content_type: String,
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct ClaudeResponse {
    content: Vec<Content>,
}

/// Claude API client implementation.
pub struct ClaudeAiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    max_tokens: u32,
}

impl ClaudeAiClient {
    /// Creates a client; `base_url` defaults to the public endpoint.
    pub fn new(
        model: String,
        api_key: String,
        base_url: Option<String>,
        max_tokens: u32,
    ) -> Result<Self> {
        Ok(Self {
            client: build_http_client()?,
            api_key,
            model,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            max_tokens,
        })
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.base_url.trim_end_matches('/'))
    }
}

impl AiClient for ClaudeAiClient {
    fn send_request<'a>(
        &'a self,
        system_prompt: &'a str,
        user_prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(async move {
            let url = self.messages_url();
            let request = ClaudeRequest {
                model: &self.model,
                max_tokens: self.max_tokens,
                system: system_prompt,
                messages: vec![Message {
                    role: "user",
                    content: user_prompt,
                }],
            };

            info!(
                url = %url,
                model = %self.model,
                max_tokens = self.max_tokens,
                user_prompt_len = user_prompt.len(),
                "Sending request to Claude API"
            );

            let response = self
                .client
                .post(&url)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(&request)
                .send()
                .await
                .map_err(|e| NarrativeError::NetworkError(e.to_string()))?;
            let response = check_error_response(response).await?;

            let claude_response: ClaudeResponse = response
                .json()
                .await
                .map_err(|e| NarrativeError::InvalidResponseFormat(e.to_string()))?;

            debug!(
                content_count = claude_response.content.len(),
                "Received Claude API response"
            );

            let result = claude_response
                .content
                .into_iter()
                .find(|c| c.content_type == "text")
                .map(|c| c.text)
                .ok_or_else(|| {
                    NarrativeError::InvalidResponseFormat("No text content in response".to_string())
                        .into()
                });

            log_response_success("Claude", &result);
            result
        })
    }

    fn get_metadata(&self) -> AiClientMetadata {
        AiClientMetadata {
            provider: "Anthropic".to_string(),
            model: self.model.clone(),
            max_response_length: self.max_tokens,
        }
    }
}
