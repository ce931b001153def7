//! Outreach agent runtime.
//!
//! Each client record runs through three stages in order:
//! 1. **Research** (`stages::research`) gathers document context from the retriever
//! 2. **Analysis** (`stages::analysis`) asks the model for the top opportunity
//! 3. **EmailWriter** (`stages::email_writer`) drafts the outreach email
//!
//! Model output is free-form text. `extraction` recovers structured records from
//! it and `heuristics` recovers an email when no structure survives. Every
//! failure is recorded in the client's diagnostics and replaced by a
//! deterministic fallback, so a run always yields one record per client.
//!
//! The model never decides client identity: identifiers always come from the
//! input record.

pub mod extraction;
pub mod heuristics;
pub mod llm;
pub mod pipeline;
pub mod prompts;
pub mod resilience;
pub mod retrieval;
pub mod runtime;
pub mod stages;
pub mod state;
pub mod testing;

pub use pipeline::{ClientOutcome, Pipeline, PipelineRun, PipelineSettings, RunReport};
pub use runtime::{OutreachRuntime, RunError};
