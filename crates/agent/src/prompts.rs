use outreach_core::domain::analysis::OpportunityAnalysis;
use outreach_core::domain::client::ClientRecord;
use outreach_core::domain::context::RetrievalContext;
use tera::{Context, Tera};

const ANALYSIS_TEMPLATE: &str = "analysis_prompt.txt";
const EMAIL_TEMPLATE: &str = "email_prompt.txt";
const UNKNOWN: &str = "Unknown";
const EMAIL_INSIGHT_LIMIT: usize = 3;

/// Renders the two model prompts from templates compiled into the binary.
#[derive(Debug)]
pub struct PromptRenderer {
    templates: Tera,
}

impl PromptRenderer {
    pub fn new() -> Result<Self, tera::Error> {
        let mut templates = Tera::default();
        templates.add_raw_templates(vec![
            (ANALYSIS_TEMPLATE, include_str!("../templates/analysis_prompt.txt")),
            (EMAIL_TEMPLATE, include_str!("../templates/email_prompt.txt")),
        ])?;
        Ok(Self { templates })
    }

    pub fn analysis_prompt(
        &self,
        client: &ClientRecord,
        context: &RetrievalContext,
    ) -> Result<String, tera::Error> {
        let mut values = profile_context(client);
        values.insert("revenue", or_unknown(&client.revenue_range));
        values.insert("size", or_unknown(&client.company_size));
        values.insert("insights", &client.key_insights);
        values.insert("pain_points", &client.pain_points);
        values.insert("context", context.as_prompt_text());

        self.templates.render(ANALYSIS_TEMPLATE, &values)
    }

    pub fn email_prompt(
        &self,
        client: &ClientRecord,
        analysis: &OpportunityAnalysis,
        signature: &str,
    ) -> Result<String, tera::Error> {
        let insights: Vec<&String> = analysis.key_insights.iter().take(EMAIL_INSIGHT_LIMIT).collect();

        let mut values = profile_context(client);
        values.insert("opportunity_type", &analysis.opportunity_type);
        values.insert("timing_reason", &analysis.timing_reason);
        values.insert("approach_angle", &analysis.approach_angle);
        values.insert("estimated_value", &analysis.estimated_value);
        values.insert("insights", &insights);
        values.insert("signature", signature);

        self.templates.render(EMAIL_TEMPLATE, &values)
    }
}

fn profile_context(client: &ClientRecord) -> Context {
    let mut values = Context::new();
    values.insert("name", &client.name);
    values.insert("company", or_unknown(&client.company));
    values.insert("industry", or_unknown(&client.industry));
    values
}

fn or_unknown(value: &str) -> &str {
    if value.trim().is_empty() {
        UNKNOWN
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use outreach_core::domain::analysis::OpportunityAnalysis;
    use outreach_core::domain::client::{ClientId, ClientRecord};
    use outreach_core::domain::context::RetrievalContext;

    use super::PromptRenderer;

    fn client() -> ClientRecord {
        ClientRecord {
            client_id: ClientId("client_7001".to_string()),
            name: "Marcus Webb".to_string(),
            email: String::new(),
            company: "Webb Foods".to_string(),
            industry: String::new(),
            revenue_range: "$10M - $50M".to_string(),
            company_size: String::new(),
            key_insights: vec![
                "Opened second warehouse".to_string(),
                "Fleet electrification".to_string(),
                "CFO departed".to_string(),
                "Exploring acquisition".to_string(),
            ],
            pain_points: vec!["cash flow".to_string()],
            engagement_score: 70,
            last_interaction: None,
        }
    }

    #[test]
    fn analysis_prompt_lists_profile_and_context() {
        let renderer = PromptRenderer::new().expect("templates should compile");

        let prompt = renderer
            .analysis_prompt(&client(), &RetrievalContext::NoMatches)
            .expect("analysis prompt should render");

        assert!(prompt.contains("Name: Marcus Webb"));
        assert!(prompt.contains("Industry: Unknown"));
        assert!(prompt.contains("Revenue: $10M - $50M"));
        assert!(prompt.contains("- Opened second warehouse\n"));
        assert!(prompt.contains("PAIN POINTS:\n- cash flow\n"));
        assert!(prompt.contains("No additional context available."));
        assert!(prompt.contains("\"priority_score\""));
    }

    #[test]
    fn email_prompt_caps_insights_and_names_signature() {
        let renderer = PromptRenderer::new().expect("templates should compile");
        let client = client();
        let analysis = OpportunityAnalysis::fallback_for(&client);

        let prompt = renderer
            .email_prompt(&client, &analysis, "Jordan at Harbor Advisory")
            .expect("email prompt should render");

        assert!(prompt.contains("OPPORTUNITY: cash flow"));
        assert!(prompt.contains("- CFO departed\n"));
        assert!(!prompt.contains("Exploring acquisition"));
        assert!(prompt.contains("Sign off as: Jordan at Harbor Advisory"));
        assert!(prompt.contains("ONLY a valid JSON object"));
    }
}
