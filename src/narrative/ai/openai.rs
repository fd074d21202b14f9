//! OpenAI-compatible chat completions client (OpenAI, Ollama).

use std::future::Future;
use std::pin::Pin;

use anyhow::Result;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{build_http_client, check_error_response, log_response_success};
use super::{AiClient, AiClientMetadata};
use crate::narrative::error::NarrativeError;

/// Public OpenAI endpoint.
pub const OPENAI_BASE_URL: &str = "https://api.openai.com";
/// Default local Ollama endpoint.
pub const OLLAMA_BASE_URL: &str = "http://localhost:11434";

#[derive(Serialize, Debug)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize, Debug)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Deserialize, Debug)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize, Debug)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize, Debug)]
struct OpenAiResponse {
    choices: Vec<Choice>,
}

/// OpenAI-compatible API client.
pub struct OpenAiAiClient {
    client: Client,
    /// Absent for Ollama.
    api_key: Option<String>,
    model: String,
    base_url: String,
    max_tokens: u32,
}

impl OpenAiAiClient {
    /// Creates a client for OpenAI; `base_url` defaults to the public endpoint.
    pub fn new_openai(
        model: String,
        api_key: String,
        base_url: Option<String>,
        max_tokens: u32,
    ) -> Result<Self> {
        Ok(Self {
            client: build_http_client()?,
            api_key: Some(api_key),
            model,
            base_url: base_url.unwrap_or_else(|| OPENAI_BASE_URL.to_string()),
            max_tokens,
        })
    }

    /// Creates a client for a local Ollama.
    pub fn new_ollama(model: String, base_url: Option<String>, max_tokens: u32) -> Result<Self> {
        Ok(Self {
            client: build_http_client()?,
            api_key: None,
            model,
            base_url: base_url.unwrap_or_else(|| OLLAMA_BASE_URL.to_string()),
            max_tokens,
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

impl AiClient for OpenAiAiClient {
    fn send_request<'a>(
        &'a self,
        system_prompt: &'a str,
        user_prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(async move {
            let mut messages = Vec::with_capacity(2);
            if !system_prompt.is_empty() {
                messages.push(Message {
                    role: "system",
                    content: system_prompt,
                });
            }
            messages.push(Message {
                role: "user",
                content: user_prompt,
            });

            let request = OpenAiRequest {
                model: &self.model,
                messages,
                max_tokens: self.max_tokens,
                temperature: 0.0,
                stream: false,
            };

            let url = self.completions_url();
            info!(url = %url, model = %self.model, "Sending request to OpenAI-compatible API");

            let mut builder = self.client.post(&url).json(&request);
            if let Some(api_key) = &self.api_key {
                builder = builder.bearer_auth(api_key);
            }

            let response = builder
                .send()
                .await
                .map_err(|e| NarrativeError::NetworkError(e.to_string()))?;
            let response = check_error_response(response).await?;

            let parsed: OpenAiResponse = response
                .json()
                .await
                .map_err(|e| NarrativeError::InvalidResponseFormat(e.to_string()))?;

            debug!(
                choice_count = parsed.choices.len(),
                "Received OpenAI-compatible API response"
            );

            let result = parsed
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content)
                .ok_or_else(|| {
                    NarrativeError::InvalidResponseFormat("No choices in response".to_string())
                        .into()
                });

            log_response_success("OpenAI-compatible", &result);
            result
        })
    }

    fn get_metadata(&self) -> AiClientMetadata {
        let provider = if self.api_key.is_none() {
            "Ollama"
        } else {
            "OpenAI"
        };
        AiClientMetadata {
            provider: provider.to_string(),
            model: self.model.clone(),
            max_response_length: self.max_tokens,
        }
    }
}
