pub mod config;
pub mod diagnostics;
pub mod domain;
pub mod errors;
pub mod ranking;
pub mod store;

pub use diagnostics::{ClientDiagnostics, Diagnostic, Diagnostics, StageName};
pub use domain::analysis::{OpportunityAnalysis, PriorityScore};
pub use domain::client::{ClientId, ClientRecord};
pub use domain::context::{Passage, RetrievalContext};
pub use domain::email::{EmailContent, Tone};
pub use domain::outreach::{OutreachRecord, OutreachStatus};
pub use errors::{DomainError, StageError};
pub use ranking::rank_and_truncate;
pub use store::StoreError;
