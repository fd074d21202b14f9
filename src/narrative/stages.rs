//! The sequential four-stage narrative pipeline.

use tracing::{debug, info};

use super::ai::{AiClient, AiClientMetadata};
use super::error::NarrativeError;
use super::prompts;
use crate::scoring::{extract_sections, validate_and_autofix_sections};

/// One step of the pipeline. Each consumes the previous step's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Finds achievements in the evidence.
    Research,
    /// Validates and ranks them by authorship.
    Attribution,
    /// Writes CV sections.
    Synthesis,
    /// Polishes the sections.
    Editing,
}

impl Stage {
    /// All stages in execution order.
    pub const ALL: [Stage; 4] = [
        Stage::Research,
        Stage::Attribution,
        Stage::Synthesis,
        Stage::Editing,
    ];

    /// Lower-case stage name.
    pub fn name(self) -> &'static str {
        match self {
            Stage::Research => "research",
            Stage::Attribution => "attribution",
            Stage::Synthesis => "synthesis",
            Stage::Editing => "editing",
        }
    }

    fn system_prompt(self) -> &'static str {
        match self {
            Stage::Research => prompts::RESEARCH_SYSTEM_PROMPT,
            Stage::Attribution => prompts::ATTRIBUTION_SYSTEM_PROMPT,
            Stage::Synthesis => prompts::SYNTHESIS_SYSTEM_PROMPT,
            Stage::Editing => prompts::EDITING_SYSTEM_PROMPT,
        }
    }
}

/// What the pipeline writes about.
#[derive(Debug, Clone, Copy)]
pub struct NarrativeRequest<'a> {
    /// Person's full name.
    pub person: &'a str,
    /// Person's role.
    pub role: &'a str,
    /// Editing style key.
    pub style: &'a str,
    /// Sections to produce.
    pub bullets_count: usize,
    /// Serialized evidence bundle.
    pub evidence: &'a str,
}

impl NarrativeRequest<'_> {
    fn user_prompt(&self, stage: Stage, previous: &str) -> String {
        match stage {
            Stage::Research => prompts::generate_research_prompt(self.person, self.evidence),
            Stage::Attribution => {
                prompts::generate_attribution_prompt(self.person, self.bullets_count, previous)
            }
            Stage::Synthesis => prompts::generate_synthesis_prompt(self.bullets_count, previous),
            Stage::Editing => prompts::generate_editing_prompt(self.style, self.role, previous),
        }
    }
}

/// Drives the stages through one [`AiClient`].
pub struct NarrativeGenerator {
    client: Box<dyn AiClient>,
}

impl NarrativeGenerator {
    /// Creates a generator over `client`.
    pub fn new(client: Box<dyn AiClient>) -> Self {
        Self { client }
    }

    /// Metadata of the underlying client.
    pub fn metadata(&self) -> AiClientMetadata {
        self.client.get_metadata()
    }

    /// Runs every stage in order and returns the editing stage's text.
    ///
    /// `on_stage` is called before each stage starts. The first failing stage
    /// aborts the run; nothing is retried. A final text without any section
    /// is an error too.
    pub async fn generate<F>(
        &self,
        request: &NarrativeRequest<'_>,
        mut on_stage: F,
    ) -> Result<String, NarrativeError>
    where
        F: FnMut(Stage),
    {
        let metadata = self.client.get_metadata();
        info!(provider = %metadata.provider, model = %metadata.model, "Starting narrative pipeline");

        let mut previous = String::new();
        for stage in Stage::ALL {
            on_stage(stage);
            let user_prompt = request.user_prompt(stage, &previous);
            let output = self
                .client
                .send_request(stage.system_prompt(), &user_prompt)
                .await
                .map_err(|e| NarrativeError::StageFailed {
                    stage: stage.name(),
                    reason: format!("{e:#}"),
                })?;

            let output = output.trim();
            if output.is_empty() {
                return Err(NarrativeError::EmptyResponse(stage.name()));
            }
            debug!(stage = stage.name(), output_len = output.len(), "Stage completed");
            previous = output.to_string();
        }

        if extract_sections(&validate_and_autofix_sections(&previous)).is_empty() {
            return Err(NarrativeError::NoSections);
        }
        Ok(previous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::narrative::test_utils::ConfigurableMockAiClient;

    fn request() -> NarrativeRequest<'static> {
        NarrativeRequest {
            person: "Jane Doe",
            role: "Staff Engineer",
            style: "simple",
            bullets_count: 2,
            evidence: "{\"commits\": []}",
        }
    }

    #[tokio::test]
    async fn test_stages_run_in_order_and_chain_outputs() {
        let mock = ConfigurableMockAiClient::new(vec![
            Ok("research-out".to_string()),
            Ok("attribution-out".to_string()),
            Ok("synthesis-out".to_string()),
            Ok("## Final\n".to_string()),
        ]);
        let handle = mock.prompt_handle();
        let generator = NarrativeGenerator::new(Box::new(mock));

        let mut seen = Vec::new();
        let text = generator
            .generate(&request(), |stage| seen.push(stage))
            .await
            .unwrap();

        assert_eq!(text, "## Final");
        assert_eq!(seen, Stage::ALL.to_vec());

        let recorded = handle.prompts();
        assert_eq!(recorded.len(), 4);
        assert_eq!(recorded[0].0, prompts::RESEARCH_SYSTEM_PROMPT);
        assert!(recorded[0].1.contains("{\"commits\": []}"));
        assert!(recorded[1].1.ends_with("research-out"));
        assert!(recorded[2].1.ends_with("attribution-out"));
        assert!(recorded[3].1.ends_with("synthesis-out"));
        assert!(recorded[3].1.contains("Polish these CV sections for a Staff Engineer."));
    }

    #[tokio::test]
    async fn test_failure_stops_pipeline() {
        let mock = ConfigurableMockAiClient::new(vec![
            Ok("research-out".to_string()),
            Err(anyhow::anyhow!("rate limited")),
        ]);
        let handle = mock.prompt_handle();
        let generator = NarrativeGenerator::new(Box::new(mock));

        let err = generator.generate(&request(), |_| {}).await.unwrap_err();
        assert!(matches!(
            err,
            NarrativeError::StageFailed {
                stage: "attribution",
                ..
            }
        ));
        assert!(err.to_string().contains("rate limited"));
        assert_eq!(handle.request_count(), 2);
    }

    #[tokio::test]
    async fn test_final_text_without_sections_is_error() {
        let mock = ConfigurableMockAiClient::new(vec![
            Ok("research-out".to_string()),
            Ok("attribution-out".to_string()),
            Ok("synthesis-out".to_string()),
            Ok("- did stuff\n- more stuff".to_string()),
        ]);
        let generator = NarrativeGenerator::new(Box::new(mock));
        let err = generator.generate(&request(), |_| {}).await.unwrap_err();
        assert!(matches!(err, NarrativeError::NoSections));
    }

    #[tokio::test]
    async fn test_empty_output_is_error() {
        let mock = ConfigurableMockAiClient::new(vec![Ok("   \n".to_string())]);
        let generator = NarrativeGenerator::new(Box::new(mock));
        let err = generator.generate(&request(), |_| {}).await.unwrap_err();
        assert!(matches!(err, NarrativeError::EmptyResponse("research")));
    }
}
