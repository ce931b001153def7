use async_trait::async_trait;
use outreach_core::diagnostics::StageName;

use crate::state::PipelineState;

pub mod analysis;
pub mod email_writer;
pub mod research;

pub use analysis::AnalysisStage;
pub use email_writer::EmailWriterStage;
pub use research::ResearchStage;

/// One step of the per-client chain.
///
/// A stage never fails outright: collaborator and extraction failures are
/// recorded on the state and masked by a fallback value.
#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> StageName;
    async fn run(&self, state: PipelineState) -> PipelineState;
}
