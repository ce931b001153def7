use serde::{Deserialize, Serialize};

use crate::domain::analysis::OpportunityAnalysis;
use crate::domain::client::ClientRecord;

/// Bodies shorter than this are not accepted from any extraction path.
pub const MIN_BODY_CHARS: usize = 50;

pub const TAG_CLIENT_NAME: &str = "client name";
pub const TAG_COMPANY_NAME: &str = "company name";
pub const TAG_OPPORTUNITY_TYPE: &str = "opportunity type";
pub const TAG_SPECIFIC_INSIGHTS: &str = "specific insights";
pub const TAG_BASIC: &str = "basic personalization";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Tone {
    #[default]
    Professional,
    Friendly,
    Consultative,
}

impl Tone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Professional => "professional",
            Self::Friendly => "friendly",
            Self::Consultative => "consultative",
        }
    }
}

// Models describe tone loosely ("Friendly but professional"); map onto the closed set.
impl From<String> for Tone {
    fn from(value: String) -> Self {
        let normalized = value.trim().to_ascii_lowercase();
        if normalized.starts_with("consult") {
            Self::Consultative
        } else if normalized.starts_with("friend") {
            Self::Friendly
        } else {
            Self::Professional
        }
    }
}

impl std::fmt::Display for Tone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailContent {
    pub subject: String,
    pub body: String,
    pub tone: Tone,
    pub personalization_elements: Vec<String>,
}

impl EmailContent {
    /// Fully templated email used when the model call itself failed.
    pub fn templated(client: &ClientRecord, analysis: &OpportunityAnalysis, signature: &str) -> Self {
        Self {
            subject: fallback_subject(analysis),
            body: templated_body(client, analysis, signature),
            tone: Tone::Professional,
            personalization_elements: vec![
                TAG_CLIENT_NAME.to_string(),
                TAG_OPPORTUNITY_TYPE.to_string(),
            ],
        }
    }
}

pub fn body_meets_length_floor(body: &str) -> bool {
    body.trim().chars().count() >= MIN_BODY_CHARS
}

pub fn fallback_subject(analysis: &OpportunityAnalysis) -> String {
    format!("Quick check-in - {}", analysis.opportunity_type)
}

pub fn templated_body(client: &ClientRecord, analysis: &OpportunityAnalysis, signature: &str) -> String {
    format!(
        "Hi {name},\n\n\
         I wanted to reach out regarding {opportunity}. {approach}\n\n\
         {timing}\n\n\
         Would you have time for a brief call this week to discuss how we can help?\n\n\
         Best regards,\n\
         {signature}",
        name = client.name,
        opportunity = analysis.opportunity_type,
        approach = analysis.approach_angle,
        timing = analysis.timing_reason,
    )
}
