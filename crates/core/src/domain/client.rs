use serde::{Deserialize, Serialize};

/// Engagement score assumed for client records that do not carry one.
pub const DEFAULT_ENGAGEMENT_SCORE: i64 = 50;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(pub String);

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Input profile for one client. Read-only to the pipeline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRecord {
    pub client_id: ClientId,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub industry: String,
    #[serde(default)]
    pub revenue_range: String,
    #[serde(default)]
    pub company_size: String,
    #[serde(default)]
    pub key_insights: Vec<String>,
    #[serde(default)]
    pub pain_points: Vec<String>,
    #[serde(default = "default_engagement_score")]
    pub engagement_score: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_interaction: Option<String>,
}

fn default_engagement_score() -> i64 {
    DEFAULT_ENGAGEMENT_SCORE
}

impl ClientRecord {
    /// Query sent to the retrieval collaborator: name, company, then pain points.
    pub fn retrieval_query(&self) -> String {
        let mut parts = vec![self.name.as_str(), self.company.as_str()];
        parts.extend(self.pain_points.iter().map(String::as_str));
        parts.into_iter().filter(|part| !part.trim().is_empty()).collect::<Vec<_>>().join(" ")
    }
}
