use std::sync::Arc;

use outreach_core::config::{AppConfig, StorageConfig};
use outreach_core::store::{self, StoreError};
use thiserror::Error;
use tracing::info;

use crate::llm::{HttpLlmClient, LlmClient};
use crate::pipeline::{Pipeline, PipelineRun, PipelineSettings};
use crate::resilience::{RetryPolicy, RetryingLlm, RetryingRetriever};
use crate::retrieval::{HttpRetriever, NoopRetriever, Retriever};

/// Whole-run failures. Per-client failures never surface here.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("could not load clients: {0}")]
    LoadClients(#[source] StoreError),
    #[error("could not compile prompt templates: {0}")]
    Prompts(#[from] tera::Error),
    #[error("could not persist run output: {0}")]
    Persist(#[source] StoreError),
}

impl RunError {
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::LoadClients(_) => "client_load",
            Self::Prompts(_) => "prompts",
            Self::Persist(_) => "persistence",
        }
    }
}

pub fn pipeline_settings(config: &AppConfig) -> PipelineSettings {
    PipelineSettings {
        top_n: config.pipeline.top_n,
        concurrency: config.pipeline.concurrency,
        result_limit: config.retrieval.result_limit,
        context_char_limit: config.retrieval.context_char_limit,
        signature: config.pipeline.signature.clone(),
    }
}

/// HTTP model client wrapped in the configured timeout and retry policy.
pub fn llm_from_config(config: &AppConfig) -> Arc<dyn LlmClient> {
    Arc::new(RetryingLlm::new(
        HttpLlmClient::from_config(&config.llm),
        RetryPolicy::for_llm(&config.llm),
    ))
}

/// HTTP retriever when retrieval is enabled, otherwise one that finds nothing.
pub fn retriever_from_config(config: &AppConfig) -> Arc<dyn Retriever> {
    let policy = RetryPolicy::for_retrieval(&config.retrieval);
    match config.retrieval.base_url.as_deref().filter(|_| config.retrieval.enabled) {
        Some(base_url) => Arc::new(RetryingRetriever::new(HttpRetriever::new(base_url), policy)),
        None => Arc::new(NoopRetriever),
    }
}

pub struct OutreachRuntime {
    pipeline: Pipeline,
    storage: StorageConfig,
}

impl OutreachRuntime {
    pub fn from_config(config: &AppConfig) -> Result<Self, RunError> {
        Self::with_collaborators(config, llm_from_config(config), retriever_from_config(config))
    }

    pub fn with_collaborators(
        config: &AppConfig,
        llm: Arc<dyn LlmClient>,
        retriever: Arc<dyn Retriever>,
    ) -> Result<Self, RunError> {
        let pipeline = Pipeline::new(llm, retriever, pipeline_settings(config))?;
        Ok(Self { pipeline, storage: config.storage.clone() })
    }

    /// Loads clients, runs the pipeline, and writes the ranked output.
    pub async fn run(&self) -> Result<PipelineRun, RunError> {
        let clients = store::load_clients(&self.storage.clients_path).map_err(RunError::LoadClients)?;
        info!(
            event_name = "runtime.clients.loaded",
            path = %self.storage.clients_path.display(),
            clients = clients.len(),
            "client list loaded"
        );

        let run = self.pipeline.run(clients).await;

        store::write_outreach(&self.storage.output_path, &run.records).map_err(RunError::Persist)?;
        info!(
            event_name = "runtime.output.written",
            run_id = %run.report.run_id,
            path = %self.storage.output_path.display(),
            records = run.records.len(),
            "outreach records written"
        );

        if let Some(report_path) = &self.storage.report_path {
            store::write_json(report_path, &run.report).map_err(RunError::Persist)?;
            info!(
                event_name = "runtime.report.written",
                run_id = %run.report.run_id,
                path = %report_path.display(),
                "run report written"
            );
        }

        Ok(run)
    }
}
