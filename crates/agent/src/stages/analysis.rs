use std::sync::Arc;

use async_trait::async_trait;
use outreach_core::diagnostics::StageName;
use outreach_core::domain::analysis::OpportunityAnalysis;
use outreach_core::errors::StageError;
use tracing::{info, warn};

use crate::extraction::{extract, AnalysisPayload};
use crate::llm::LlmClient;
use crate::prompts::PromptRenderer;
use crate::stages::Stage;
use crate::state::PipelineState;

pub struct AnalysisStage {
    llm: Arc<dyn LlmClient>,
    prompts: Arc<PromptRenderer>,
}

impl AnalysisStage {
    pub fn new(llm: Arc<dyn LlmClient>, prompts: Arc<PromptRenderer>) -> Self {
        Self { llm, prompts }
    }

    async fn analyze(&self, state: &PipelineState) -> Result<OpportunityAnalysis, StageError> {
        let prompt = self
            .prompts
            .analysis_prompt(state.client(), state.context())
            .map_err(|error| StageError::ModelInvocationFailure(format!("prompt rendering: {error}")))?;

        let response = self
            .llm
            .generate(&prompt)
            .await
            .map_err(|error| StageError::ModelInvocationFailure(format!("{error:#}")))?;

        let extracted = extract::<AnalysisPayload>(&response)
            .map_err(|error| StageError::ExtractionFailure(error.to_string()))?;

        tracing::debug!(
            event_name = "pipeline.stage.analysis.extracted",
            client_id = %state.client().client_id,
            strategy = extracted.strategy.as_str(),
            "analysis extracted from model output"
        );
        Ok(extracted.value.into_analysis(state.client()))
    }
}

#[async_trait]
impl Stage for AnalysisStage {
    fn name(&self) -> StageName {
        StageName::Analysis
    }

    async fn run(&self, state: PipelineState) -> PipelineState {
        match self.analyze(&state).await {
            Ok(analysis) => {
                info!(
                    event_name = "pipeline.stage.analysis.completed",
                    client_id = %state.client().client_id,
                    opportunity_type = %analysis.opportunity_type,
                    priority_score = analysis.priority_score.value(),
                    "analysis stage identified opportunity"
                );
                state.with_analysis(analysis)
            }
            Err(error) => {
                let fallback = OpportunityAnalysis::fallback_for(state.client());
                warn!(
                    event_name = "pipeline.stage.analysis.fallback",
                    client_id = %state.client().client_id,
                    error_kind = error.kind(),
                    error = %error,
                    priority_score = fallback.priority_score.value(),
                    "analysis failed, using profile-based fallback"
                );
                state.record_failure(self.name(), error).with_analysis(fallback)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use outreach_core::diagnostics::StageName;
    use outreach_core::domain::client::ClientRecord;

    use crate::prompts::PromptRenderer;
    use crate::stages::Stage;
    use crate::state::PipelineState;
    use crate::testing::{FailingLlm, ScriptedLlm};

    use super::AnalysisStage;

    fn client() -> ClientRecord {
        serde_json::from_str(
            r#"{
                "client_id": "client_1101",
                "name": "Sarah Chen",
                "company": "Chen Robotics",
                "key_insights": ["Series B closed", "Hiring 40 engineers", "New plant", "Board change"],
                "pain_points": ["R&D credits", "payroll"],
                "engagement_score": 72
            }"#,
        )
        .expect("client should parse")
    }

    fn stage(llm: Arc<dyn crate::llm::LlmClient>) -> AnalysisStage {
        AnalysisStage::new(llm, Arc::new(PromptRenderer::new().expect("templates should compile")))
    }

    #[tokio::test]
    async fn model_identity_is_replaced_by_client_record() {
        let llm = Arc::new(ScriptedLlm::new(vec![r#"Sure! ```json
{"client_id": "wrong", "client_name": "Someone Else", "opportunity_type": "R&D Tax Credits",
 "priority_score": 9, "timing_reason": "Year end", "approach_angle": "Credit study",
 "estimated_value": "$150K", "key_insights": ["Series B closed"]}
```"#
            .to_string()]));

        let state = stage(llm.clone()).run(PipelineState::new(client())).await;

        let analysis = state.analysis().expect("analysis should be set");
        assert_eq!(analysis.client_id.0, "client_1101");
        assert_eq!(analysis.client_name, "Sarah Chen");
        assert_eq!(analysis.priority_score.value(), 9);
        assert!(state.diagnostics().is_empty());
        assert!(llm.prompts()[0].contains("Name: Sarah Chen"));
    }

    #[tokio::test]
    async fn unparsable_output_records_extraction_failure_and_falls_back() {
        let llm = Arc::new(ScriptedLlm::new(vec!["I think cash flow matters most.".to_string()]));

        let state = stage(llm).run(PipelineState::new(client())).await;

        let analysis = state.analysis().expect("fallback analysis should be set");
        assert_eq!(analysis.opportunity_type, "R&D credits");
        assert_eq!(analysis.priority_score.value(), 7);
        assert_eq!(analysis.timing_reason, "Regular check-in based on client profile");
        assert_eq!(analysis.key_insights.len(), 3);
        assert_eq!(state.diagnostics().stages(), vec![StageName::Analysis]);
        assert_eq!(state.diagnostics().entries()[0].error.kind(), "extraction_failure");
    }

    #[tokio::test]
    async fn model_failure_records_invocation_failure_and_falls_back() {
        let state = stage(Arc::new(FailingLlm::new("503 from upstream")))
            .run(PipelineState::new(client()))
            .await;

        assert!(state.analysis().is_some());
        assert_eq!(state.diagnostics().entries()[0].error.kind(), "model_invocation_failure");
    }
}
