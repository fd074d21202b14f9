//! Preflight checks run before any expensive work.
//!
//! Resolves which language-model provider a run will use from the `llm`
//! config section and the available credentials, without building a client.

use anyhow::{bail, Result};

use crate::config::{LlmOptions, LlmProvider};

/// Default Claude model.
pub const DEFAULT_CLAUDE_MODEL: &str = "claude-opus-4-1-20250805";
/// Default OpenAI model.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
/// Default Ollama model.
pub const DEFAULT_OLLAMA_MODEL: &str = "llama2";

const CLAUDE_KEYS: &[&str] = &["CLAUDE_API_KEY", "ANTHROPIC_API_KEY"];
const OPENAI_KEYS: &[&str] = &["OPENAI_API_KEY", "OPENAI_AUTH_TOKEN"];

/// A provider that can actually be called.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiProvider {
    /// Anthropic Claude API
    Claude,
    /// OpenAI API
    OpenAi,
    /// Local Ollama
    Ollama,
}

impl std::fmt::Display for AiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AiProvider::Claude => write!(f, "Claude API"),
            AiProvider::OpenAi => write!(f, "OpenAI API"),
            AiProvider::Ollama => write!(f, "Ollama"),
        }
    }
}

/// Everything needed to build a client for the chosen provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiCredentialInfo {
    /// The AI provider that will be used
    pub provider: AiProvider,
    /// The model that will be used
    pub model: String,
    /// API key, absent for Ollama
    pub api_key: Option<String>,
    /// Endpoint override
    pub base_url: Option<String>,
}

/// Resolves the provider using environment variables with settings fallback.
///
/// Returns `Ok(None)` when the run should stay offline: the provider is
/// `offline`, or it is `auto` and no credentials are found. An explicitly
/// requested provider without credentials is an error.
pub fn check_ai_credentials(options: &LlmOptions) -> Result<Option<AiCredentialInfo>> {
    check_ai_credentials_with(options, |key| crate::utils::settings::get_env_var(key).ok())
}

/// Same as [`check_ai_credentials`] with an explicit variable lookup.
pub fn check_ai_credentials_with<F>(
    options: &LlmOptions,
    lookup: F,
) -> Result<Option<AiCredentialInfo>>
where
    F: Fn(&str) -> Option<String>,
{
    let first = |keys: &[&str]| keys.iter().find_map(|k| lookup(*k));

    let model = |env_key: &str, default: &str| {
        options
            .model
            .clone()
            .or_else(|| lookup(env_key))
            .unwrap_or_else(|| default.to_string())
    };

    let claude = |api_key: String| AiCredentialInfo {
        provider: AiProvider::Claude,
        model: model("ANTHROPIC_MODEL", DEFAULT_CLAUDE_MODEL),
        api_key: Some(api_key),
        base_url: options.base_url.clone(),
    };
    let openai = |api_key: String| AiCredentialInfo {
        provider: AiProvider::OpenAi,
        model: model("OPENAI_MODEL", DEFAULT_OPENAI_MODEL),
        api_key: Some(api_key),
        base_url: options.base_url.clone(),
    };

    match options.provider {
        LlmProvider::Offline => Ok(None),
        LlmProvider::Auto => Ok(first(CLAUDE_KEYS)
            .map(claude)
            .or_else(|| first(OPENAI_KEYS).map(openai))),
        LlmProvider::Claude => match first(CLAUDE_KEYS) {
            Some(key) => Ok(Some(claude(key))),
            None => bail!(
                "Claude API key not found.\n\
                 Set one of these environment variables:\n\
                 - CLAUDE_API_KEY\n\
                 - ANTHROPIC_API_KEY"
            ),
        },
        LlmProvider::OpenAi => match first(OPENAI_KEYS) {
            Some(key) => Ok(Some(openai(key))),
            None => bail!(
                "OpenAI API key not found.\n\
                 Set one of these environment variables:\n\
                 - OPENAI_API_KEY\n\
                 - OPENAI_AUTH_TOKEN"
            ),
        },
        LlmProvider::Ollama => Ok(Some(AiCredentialInfo {
            provider: AiProvider::Ollama,
            model: model("OLLAMA_MODEL", DEFAULT_OLLAMA_MODEL),
            api_key: None,
            base_url: options.base_url.clone().or_else(|| lookup("OLLAMA_BASE_URL")),
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    fn options(provider: LlmProvider) -> LlmOptions {
        LlmOptions {
            provider,
            ..LlmOptions::default()
        }
    }

    #[test]
    fn test_ai_provider_display() {
        assert_eq!(format!("{}", AiProvider::Claude), "Claude API");
        assert_eq!(format!("{}", AiProvider::OpenAi), "OpenAI API");
        assert_eq!(format!("{}", AiProvider::Ollama), "Ollama");
    }

    #[test]
    fn test_auto_prefers_claude() {
        let info = check_ai_credentials_with(
            &options(LlmProvider::Auto),
            lookup(&[("ANTHROPIC_API_KEY", "sk-ant"), ("OPENAI_API_KEY", "sk-oai")]),
        )
        .unwrap()
        .unwrap();
        assert_eq!(info.provider, AiProvider::Claude);
        assert_eq!(info.api_key.as_deref(), Some("sk-ant"));
        assert_eq!(info.model, DEFAULT_CLAUDE_MODEL);
    }

    #[test]
    fn test_auto_falls_back_to_openai_then_offline() {
        let info = check_ai_credentials_with(
            &options(LlmProvider::Auto),
            lookup(&[("OPENAI_API_KEY", "sk-oai"), ("OPENAI_MODEL", "gpt-4o")]),
        )
        .unwrap()
        .unwrap();
        assert_eq!(info.provider, AiProvider::OpenAi);
        assert_eq!(info.model, "gpt-4o");

        let none = check_ai_credentials_with(&options(LlmProvider::Auto), lookup(&[])).unwrap();
        assert_eq!(none, None);
    }

    #[test]
    fn test_explicit_provider_requires_key() {
        let err = check_ai_credentials_with(&options(LlmProvider::Claude), lookup(&[]))
            .unwrap_err();
        assert!(err.to_string().contains("Claude API key not found"));
        assert!(
            check_ai_credentials_with(&options(LlmProvider::OpenAi), lookup(&[])).is_err()
        );
    }

    #[test]
    fn test_offline_and_ollama() {
        assert_eq!(
            check_ai_credentials_with(
                &options(LlmProvider::Offline),
                lookup(&[("CLAUDE_API_KEY", "x")])
            )
            .unwrap(),
            None
        );

        let mut opts = options(LlmProvider::Ollama);
        opts.model = Some("mistral".to_string());
        let info = check_ai_credentials_with(&opts, lookup(&[])).unwrap().unwrap();
        assert_eq!(info.provider, AiProvider::Ollama);
        assert_eq!(info.model, "mistral");
        assert_eq!(info.api_key, None);
    }
}
