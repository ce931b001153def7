//! Per-client stage chain plus the cross-client rank/truncate barrier.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use outreach_core::diagnostics::{ClientDiagnostics, StageName};
use outreach_core::domain::client::ClientRecord;
use outreach_core::domain::outreach::{OutreachRecord, AGENT_WORKFLOW};
use outreach_core::ranking::{rank_and_truncate, DEFAULT_TOP_N};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use crate::llm::LlmClient;
use crate::prompts::PromptRenderer;
use crate::retrieval::Retriever;
use crate::stages::{AnalysisStage, EmailWriterStage, ResearchStage, Stage};
use crate::state::PipelineState;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineSettings {
    pub top_n: usize,
    pub concurrency: usize,
    pub result_limit: usize,
    pub context_char_limit: usize,
    pub signature: String,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
            concurrency: 1,
            result_limit: 5,
            context_char_limit: outreach_core::domain::context::DEFAULT_CONTEXT_CHAR_LIMIT,
            signature: "Your Financial Advisor".to_string(),
        }
    }
}

/// Result of running one client through every stage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientOutcome {
    pub record: Option<OutreachRecord>,
    pub diagnostics: ClientDiagnostics,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopOpportunity {
    pub client: String,
    pub opportunity: String,
    pub priority: u8,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total_clients_analyzed: usize,
    pub emails_generated: usize,
    pub workflow: String,
    pub stages: Vec<StageName>,
    pub top_opportunities: Vec<TopOpportunity>,
    pub diagnostics: Vec<ClientDiagnostics>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineRun {
    /// Ranked highest priority first and truncated to `top_n`.
    pub records: Vec<OutreachRecord>,
    pub report: RunReport,
}

pub struct Pipeline {
    research: ResearchStage,
    analysis: AnalysisStage,
    email_writer: EmailWriterStage,
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        retriever: Arc<dyn Retriever>,
        settings: PipelineSettings,
    ) -> Result<Self, tera::Error> {
        let prompts = Arc::new(PromptRenderer::new()?);
        Ok(Self {
            research: ResearchStage::new(retriever, settings.result_limit, settings.context_char_limit),
            analysis: AnalysisStage::new(llm.clone(), prompts.clone()),
            email_writer: EmailWriterStage::new(llm, prompts, settings.signature.clone()),
            settings,
        })
    }

    fn stages(&self) -> [&dyn Stage; 3] {
        [&self.research, &self.analysis, &self.email_writer]
    }

    pub async fn process_client(&self, client: ClientRecord) -> ClientOutcome {
        let mut state = PipelineState::new(client);
        for stage in self.stages() {
            state = stage.run(state).await;
        }

        let (client, analysis, email, entries) = state.into_parts();
        let record = match (analysis, email) {
            (Some(analysis), Some(email)) => {
                Some(OutreachRecord::compose(&client, &analysis, &email, Utc::now()))
            }
            _ => {
                error!(
                    event_name = "pipeline.client.incomplete",
                    client_id = %client.client_id,
                    "client finished without an analysis or email"
                );
                None
            }
        };

        ClientOutcome {
            record,
            diagnostics: ClientDiagnostics {
                client_id: client.client_id,
                client_name: client.name,
                entries,
            },
        }
    }

    /// Processes every client, then ranks once all of them have finished.
    pub async fn run(&self, clients: Vec<ClientRecord>) -> PipelineRun {
        let run_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();
        let total_clients_analyzed = clients.len();
        let concurrency = self.settings.concurrency.max(1);

        info!(
            event_name = "pipeline.run.start",
            run_id = %run_id,
            clients = total_clients_analyzed,
            concurrency,
            top_n = self.settings.top_n,
            "pipeline run started"
        );

        // `buffered` yields in input order, so ties rank in processing order.
        let outcomes: Vec<ClientOutcome> = stream::iter(clients)
            .map(|client| self.process_client(client))
            .buffered(concurrency)
            .collect()
            .await;

        let mut records = Vec::with_capacity(outcomes.len());
        let mut diagnostics = Vec::new();
        for outcome in outcomes {
            records.extend(outcome.record);
            if !outcome.diagnostics.entries.is_empty() {
                diagnostics.push(outcome.diagnostics);
            }
        }

        let records = rank_and_truncate(records, self.settings.top_n);
        let top_opportunities = records
            .iter()
            .map(|record| TopOpportunity {
                client: record.client_name.clone(),
                opportunity: record.opportunity_type.clone(),
                priority: record.priority_score.value(),
            })
            .collect();

        let report = RunReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            total_clients_analyzed,
            emails_generated: records.len(),
            workflow: AGENT_WORKFLOW.to_string(),
            stages: self.stages().iter().map(|stage| stage.name()).collect(),
            top_opportunities,
            diagnostics,
        };

        info!(
            event_name = "pipeline.run.completed",
            run_id = %report.run_id,
            emails_generated = report.emails_generated,
            clients_with_diagnostics = report.diagnostics.len(),
            "pipeline run completed"
        );

        PipelineRun { records, report }
    }
}
