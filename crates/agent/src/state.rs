use outreach_core::diagnostics::{Diagnostic, Diagnostics, StageName};
use outreach_core::domain::analysis::OpportunityAnalysis;
use outreach_core::domain::client::ClientRecord;
use outreach_core::domain::context::RetrievalContext;
use outreach_core::domain::email::EmailContent;
use outreach_core::errors::StageError;

/// Per-client working state, moved from stage to stage.
///
/// Every transition consumes the state and returns a new one. Diagnostics can
/// only grow.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineState {
    client: ClientRecord,
    context: RetrievalContext,
    analysis: Option<OpportunityAnalysis>,
    email: Option<EmailContent>,
    diagnostics: Diagnostics,
}

impl PipelineState {
    pub fn new(client: ClientRecord) -> Self {
        Self {
            client,
            context: RetrievalContext::Pending,
            analysis: None,
            email: None,
            diagnostics: Diagnostics::default(),
        }
    }

    pub fn client(&self) -> &ClientRecord {
        &self.client
    }

    pub fn context(&self) -> &RetrievalContext {
        &self.context
    }

    pub fn analysis(&self) -> Option<&OpportunityAnalysis> {
        self.analysis.as_ref()
    }

    pub fn email(&self) -> Option<&EmailContent> {
        self.email.as_ref()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn with_context(self, context: RetrievalContext) -> Self {
        Self { context, ..self }
    }

    pub fn with_analysis(self, analysis: OpportunityAnalysis) -> Self {
        Self { analysis: Some(analysis), ..self }
    }

    pub fn with_email(self, email: EmailContent) -> Self {
        Self { email: Some(email), ..self }
    }

    pub fn record_failure(self, stage: StageName, error: StageError) -> Self {
        let diagnostics = self.diagnostics.append(Diagnostic::new(stage, error));
        Self { diagnostics, ..self }
    }

    pub fn into_parts(
        self,
    ) -> (ClientRecord, Option<OpportunityAnalysis>, Option<EmailContent>, Diagnostics) {
        (self.client, self.analysis, self.email, self.diagnostics)
    }
}
