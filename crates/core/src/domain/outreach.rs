use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::analysis::{OpportunityAnalysis, PriorityScore};
use crate::domain::client::{ClientId, ClientRecord};
use crate::domain::context::truncate_chars;
use crate::domain::email::{EmailContent, Tone};

pub const PREVIEW_CHARS: usize = 150;
pub const AGENT_WORKFLOW: &str = "research → analysis → email_writer";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutreachStatus {
    #[default]
    Sent,
}

/// Final artifact for one processed client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutreachRecord {
    pub id: String,
    pub client_id: ClientId,
    pub client_name: String,
    pub client_email: String,
    pub subject: String,
    pub body: String,
    pub preview: String,
    pub full_content: String,
    pub sent_date: DateTime<Utc>,
    pub status: OutreachStatus,
    pub opportunity_type: String,
    pub priority_score: PriorityScore,
    pub tone: Tone,
    pub personalization_elements: Vec<String>,
    pub agent_workflow: String,
}

impl OutreachRecord {
    pub fn compose(
        client: &ClientRecord,
        analysis: &OpportunityAnalysis,
        email: &EmailContent,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: format!("email_{}_{}", now.format("%Y%m%d_%H%M%S"), client.client_id),
            client_id: client.client_id.clone(),
            client_name: client.name.clone(),
            client_email: client.email.clone(),
            subject: email.subject.clone(),
            body: email.body.clone(),
            preview: preview_of(&email.body),
            full_content: email.body.clone(),
            sent_date: now,
            status: OutreachStatus::Sent,
            opportunity_type: analysis.opportunity_type.clone(),
            priority_score: analysis.priority_score,
            tone: email.tone,
            personalization_elements: email.personalization_elements.clone(),
            agent_workflow: AGENT_WORKFLOW.to_string(),
        }
    }
}

pub fn preview_of(body: &str) -> String {
    format!("{}...", truncate_chars(body, PREVIEW_CHARS))
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use crate::domain::analysis::OpportunityAnalysis;
    use crate::domain::client::{ClientId, ClientRecord};
    use crate::domain::email::EmailContent;

    use super::{OutreachRecord, OutreachStatus, PREVIEW_CHARS};

    #[test]
    fn compose_denormalizes_client_and_builds_identifier() {
        let client = ClientRecord {
            client_id: ClientId("client_4001".to_string()),
            name: "Priya Raman".to_string(),
            email: "priya@ramanlabs.example".to_string(),
            company: "Raman Labs".to_string(),
            industry: "Biotech".to_string(),
            revenue_range: String::new(),
            company_size: String::new(),
            key_insights: Vec::new(),
            pain_points: vec!["R&D credits".to_string()],
            engagement_score: 82,
            last_interaction: None,
        };
        let analysis = OpportunityAnalysis::fallback_for(&client);
        let email = EmailContent::templated(&client, &analysis, "Your Financial Advisor");
        let now = Utc.with_ymd_and_hms(2026, 3, 14, 2, 5, 9).single().expect("valid timestamp");

        let record = OutreachRecord::compose(&client, &analysis, &email, now);

        assert_eq!(record.id, "email_20260314_020509_client_4001");
        assert_eq!(record.client_email, "priya@ramanlabs.example");
        assert_eq!(record.priority_score.value(), 8);
        assert_eq!(record.status, OutreachStatus::Sent);
        assert_eq!(record.full_content, record.body);
        assert!(record.preview.ends_with("..."));
        assert_eq!(record.preview.chars().count(), PREVIEW_CHARS + 3);
    }

    #[test]
    fn record_serializes_with_snake_case_fields() {
        let json = serde_json::json!({
            "id": "email_20260101_000000_c1",
            "client_id": "c1",
            "client_name": "A",
            "client_email": "",
            "subject": "s",
            "body": "b",
            "preview": "b...",
            "full_content": "b",
            "sent_date": "2026-01-01T00:00:00Z",
            "status": "sent",
            "opportunity_type": "tax",
            "priority_score": 4,
            "tone": "friendly",
            "personalization_elements": ["client name"],
            "agent_workflow": "research → analysis → email_writer"
        });

        let record: OutreachRecord = serde_json::from_value(json.clone()).expect("record should parse");
        let round = serde_json::to_value(&record).expect("record should serialize");

        assert_eq!(round["status"], "sent");
        assert_eq!(round["priority_score"], 4);
        assert_eq!(round["tone"], "friendly");
    }
}
