use std::sync::Arc;

use async_trait::async_trait;
use outreach_core::diagnostics::StageName;
use outreach_core::domain::email::EmailContent;
use outreach_core::errors::StageError;
use tracing::{info, warn};

use crate::extraction::extract;
use crate::heuristics::email_from_text;
use crate::llm::LlmClient;
use crate::prompts::PromptRenderer;
use crate::stages::Stage;
use crate::state::PipelineState;

pub struct EmailWriterStage {
    llm: Arc<dyn LlmClient>,
    prompts: Arc<PromptRenderer>,
    signature: String,
}

impl EmailWriterStage {
    pub fn new(llm: Arc<dyn LlmClient>, prompts: Arc<PromptRenderer>, signature: impl Into<String>) -> Self {
        Self { llm, prompts, signature: signature.into() }
    }
}

#[async_trait]
impl Stage for EmailWriterStage {
    fn name(&self) -> StageName {
        StageName::EmailWriter
    }

    async fn run(&self, state: PipelineState) -> PipelineState {
        let client_id = state.client().client_id.to_string();
        let Some(analysis) = state.analysis().cloned() else {
            warn!(
                event_name = "pipeline.stage.email_writer.skipped",
                client_id = %client_id,
                "no opportunity analysis, email not written"
            );
            return state.record_failure(
                self.name(),
                StageError::MissingUpstreamResult("no opportunity analysis available".to_string()),
            );
        };

        let response = match self.prompts.email_prompt(state.client(), &analysis, &self.signature) {
            Ok(prompt) => self
                .llm
                .generate(&prompt)
                .await
                .map_err(|error| StageError::ModelInvocationFailure(format!("{error:#}"))),
            Err(error) => {
                Err(StageError::ModelInvocationFailure(format!("prompt rendering: {error}")))
            }
        };

        let response = match response {
            Ok(response) => response,
            Err(error) => {
                warn!(
                    event_name = "pipeline.stage.email_writer.fallback",
                    client_id = %client_id,
                    error_kind = error.kind(),
                    error = %error,
                    "email generation failed, using templated email"
                );
                let email = EmailContent::templated(state.client(), &analysis, &self.signature);
                return state.record_failure(self.name(), error).with_email(email);
            }
        };

        let email = match extract::<EmailContent>(&response) {
            Ok(extracted) => {
                info!(
                    event_name = "pipeline.stage.email_writer.completed",
                    client_id = %client_id,
                    strategy = extracted.strategy.as_str(),
                    "email extracted from model output"
                );
                extracted.value
            }
            Err(failure) => {
                info!(
                    event_name = "pipeline.stage.email_writer.text_extraction",
                    client_id = %client_id,
                    reason = %failure,
                    "structured email not found, recovering from text"
                );
                email_from_text(&response, state.client(), &analysis, &self.signature)
            }
        };

        state.with_email(email)
    }
}
