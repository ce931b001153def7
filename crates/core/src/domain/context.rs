use serde::{Deserialize, Serialize};

pub const DEFAULT_CONTEXT_CHAR_LIMIT: usize = 2000;

const NO_MATCHES_TEXT: &str = "No additional context available.";
const UNAVAILABLE_TEXT: &str = "No context available.";

/// One ranked passage returned by the retrieval collaborator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    pub content: String,
    #[serde(alias = "source", default = "unknown_source")]
    pub source_label: String,
    #[serde(default)]
    pub distance: Option<f32>,
}

fn unknown_source() -> String {
    "Unknown".to_string()
}

/// Document context gathered for one client. Every variant renders to prompt text.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum RetrievalContext {
    /// Research has not run yet.
    #[default]
    Pending,
    Passages(String),
    /// Retrieval succeeded but returned nothing.
    NoMatches,
    /// Retrieval failed; the failure is in the client's diagnostics.
    Unavailable,
}

impl RetrievalContext {
    /// Joins passages as `Document: <source>\n<content>` blocks, capped at `char_limit`.
    pub fn from_passages(passages: &[Passage], char_limit: usize) -> Self {
        if passages.is_empty() {
            return Self::NoMatches;
        }

        let joined = passages
            .iter()
            .map(|passage| format!("Document: {}\n{}", passage.source_label, passage.content))
            .collect::<Vec<_>>()
            .join("\n\n");

        Self::Passages(truncate_chars(&joined, char_limit))
    }

    pub fn as_prompt_text(&self) -> &str {
        match self {
            Self::Passages(text) => text,
            Self::Pending | Self::NoMatches => NO_MATCHES_TEXT,
            Self::Unavailable => UNAVAILABLE_TEXT,
        }
    }
}

pub(crate) fn truncate_chars(value: &str, limit: usize) -> String {
    match value.char_indices().nth(limit) {
        Some((byte_index, _)) => value[..byte_index].to_string(),
        None => value.to_string(),
    }
}
