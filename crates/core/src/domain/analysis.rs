use serde::{de, Deserialize, Deserializer, Serialize};

use crate::domain::client::{ClientId, ClientRecord};
use crate::errors::DomainError;

pub const MIN_PRIORITY: i64 = 1;
pub const MAX_PRIORITY: i64 = 10;

const FALLBACK_OPPORTUNITY: &str = "General Advisory";
const FALLBACK_TIMING: &str = "Regular check-in based on client profile";
const FALLBACK_APPROACH: &str = "Proactive advisory support";
const FALLBACK_VALUE: &str = "Ongoing relationship value";
const FALLBACK_INSIGHT_COUNT: usize = 3;

/// Priority on the closed range `1..=10`. Out-of-range values never construct.
///
/// Deserializes from an integer, a whole-number float, or a numeric string.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(into = "i64")]
pub struct PriorityScore(u8);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPriority {
    Integer(i64),
    Float(f64),
    Text(String),
}

fn whole_number(value: f64) -> Option<i64> {
    (value.is_finite() && value.fract() == 0.0).then_some(value as i64)
}

impl PriorityScore {
    pub fn new(value: i64) -> Result<Self, DomainError> {
        if (MIN_PRIORITY..=MAX_PRIORITY).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(DomainError::PriorityOutOfRange(value))
        }
    }

    pub fn clamped(value: i64) -> Self {
        Self(value.clamp(MIN_PRIORITY, MAX_PRIORITY) as u8)
    }

    /// Engagement score integer-divided by ten, clamped into range.
    pub fn from_engagement(engagement_score: i64) -> Self {
        Self::clamped(engagement_score.div_euclid(10))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl<'de> Deserialize<'de> for PriorityScore {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = match RawPriority::deserialize(deserializer)? {
            RawPriority::Integer(value) => Some(value),
            RawPriority::Float(value) => whole_number(value),
            RawPriority::Text(text) => {
                let trimmed = text.trim();
                trimmed
                    .parse::<i64>()
                    .ok()
                    .or_else(|| trimmed.parse::<f64>().ok().and_then(whole_number))
            }
        };

        value
            .ok_or(DomainError::InvalidPriority)
            .and_then(Self::new)
            .map_err(de::Error::custom)
    }
}

impl From<PriorityScore> for i64 {
    fn from(value: PriorityScore) -> Self {
        i64::from(value.0)
    }
}

impl std::fmt::Display for PriorityScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpportunityAnalysis {
    pub client_id: ClientId,
    pub client_name: String,
    pub opportunity_type: String,
    pub priority_score: PriorityScore,
    pub timing_reason: String,
    pub approach_angle: String,
    pub estimated_value: String,
    pub key_insights: Vec<String>,
}

impl OpportunityAnalysis {
    /// Deterministic analysis used when the model path produced nothing usable.
    pub fn fallback_for(client: &ClientRecord) -> Self {
        let opportunity_type = client
            .pain_points
            .first()
            .filter(|pain_point| !pain_point.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| FALLBACK_OPPORTUNITY.to_string());

        Self {
            client_id: client.client_id.clone(),
            client_name: client.name.clone(),
            opportunity_type,
            priority_score: PriorityScore::from_engagement(client.engagement_score),
            timing_reason: FALLBACK_TIMING.to_string(),
            approach_angle: FALLBACK_APPROACH.to_string(),
            estimated_value: FALLBACK_VALUE.to_string(),
            key_insights: client.key_insights.iter().take(FALLBACK_INSIGHT_COUNT).cloned().collect(),
        }
    }
}
