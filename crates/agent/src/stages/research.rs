use std::sync::Arc;

use async_trait::async_trait;
use outreach_core::diagnostics::StageName;
use outreach_core::domain::context::RetrievalContext;
use outreach_core::errors::StageError;
use tracing::{info, warn};

use crate::retrieval::Retriever;
use crate::stages::Stage;
use crate::state::PipelineState;

pub struct ResearchStage {
    retriever: Arc<dyn Retriever>,
    result_limit: usize,
    context_char_limit: usize,
}

impl ResearchStage {
    pub fn new(retriever: Arc<dyn Retriever>, result_limit: usize, context_char_limit: usize) -> Self {
        Self { retriever, result_limit, context_char_limit }
    }
}

#[async_trait]
impl Stage for ResearchStage {
    fn name(&self) -> StageName {
        StageName::Research
    }

    async fn run(&self, state: PipelineState) -> PipelineState {
        let query = state.client().retrieval_query();
        let client_id = state.client().client_id.to_string();

        match self.retriever.search(&query, self.result_limit).await {
            Ok(passages) => {
                let context = RetrievalContext::from_passages(&passages, self.context_char_limit);
                info!(
                    event_name = "pipeline.stage.research.completed",
                    client_id = %client_id,
                    passages = passages.len(),
                    "research stage gathered context"
                );
                state.with_context(context)
            }
            Err(error) => {
                warn!(
                    event_name = "pipeline.stage.research.failed",
                    client_id = %client_id,
                    error = %format!("{error:#}"),
                    "retrieval failed, continuing without context"
                );
                state
                    .record_failure(self.name(), StageError::RetrievalFailure(format!("{error:#}")))
                    .with_context(RetrievalContext::Unavailable)
            }
        }
    }
}
