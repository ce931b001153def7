use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::client::ClientId;
use crate::errors::StageError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageName {
    Research,
    Analysis,
    EmailWriter,
}

impl StageName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Research => "research",
            Self::Analysis => "analysis",
            Self::EmailWriter => "email_writer",
        }
    }
}

impl std::fmt::Display for StageName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub stage: StageName,
    pub error: StageError,
    pub occurred_at: DateTime<Utc>,
}

impl Diagnostic {
    pub fn new(stage: StageName, error: StageError) -> Self {
        Self { stage, error, occurred_at: Utc::now() }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} stage: {}", self.stage, self.error)
    }
}

/// Append-only log of stage failures for one client.
///
/// There is no way to remove or replace an entry: a later stage can only add
/// to what an earlier stage recorded.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn append(mut self, entry: Diagnostic) -> Self {
        self.entries.push(entry);
        self
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stages(&self) -> Vec<StageName> {
        self.entries.iter().map(|entry| entry.stage).collect()
    }
}

/// Diagnostics of one client as surfaced in a run report.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientDiagnostics {
    pub client_id: ClientId,
    pub client_name: String,
    pub entries: Diagnostics,
}
