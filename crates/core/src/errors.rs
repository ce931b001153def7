use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("priority score {0} is outside the range 1..=10")]
    PriorityOutOfRange(i64),
    #[error("priority score is not a whole number")]
    InvalidPriority,
}

/// Failure kinds caught at a stage boundary. None of them abort a client.
#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum StageError {
    #[error("retrieval failure: {0}")]
    RetrievalFailure(String),
    #[error("model invocation failure: {0}")]
    ModelInvocationFailure(String),
    #[error("extraction failure: {0}")]
    ExtractionFailure(String),
    #[error("missing upstream result: {0}")]
    MissingUpstreamResult(String),
}

impl StageError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RetrievalFailure(_) => "retrieval_failure",
            Self::ModelInvocationFailure(_) => "model_invocation_failure",
            Self::ExtractionFailure(_) => "extraction_failure",
            Self::MissingUpstreamResult(_) => "missing_upstream_result",
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::{DomainError, StageError};

    #[test]
    fn stage_error_display_names_the_kind() {
        let error = StageError::RetrievalFailure("connection refused".to_owned());

        assert_eq!(error.to_string(), "retrieval failure: connection refused");
        assert_eq!(error.kind(), "retrieval_failure");
    }

    #[test]
    fn stage_error_serializes_tagged() {
        let value = serde_json::to_value(StageError::ExtractionFailure("no json".to_owned()))
            .expect("stage error should serialize");

        assert_eq!(value["kind"], "extraction_failure");
        assert_eq!(value["message"], "no json");
    }

    #[test]
    fn domain_error_reports_offending_priority() {
        assert_eq!(
            DomainError::PriorityOutOfRange(12).to_string(),
            "priority score 12 is outside the range 1..=10"
        );
    }
}
