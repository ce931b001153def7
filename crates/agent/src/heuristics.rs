//! Best-effort email recovery from model text that has no usable structure.
//!
//! [`email_from_text`] cannot fail. The worst case is a fully templated
//! email built from the analysis.

use std::sync::LazyLock;

use outreach_core::domain::analysis::OpportunityAnalysis;
use outreach_core::domain::client::ClientRecord;
use outreach_core::domain::email::{
    body_meets_length_floor, fallback_subject, templated_body, EmailContent, Tone, TAG_BASIC,
    TAG_CLIENT_NAME, TAG_COMPANY_NAME, TAG_OPPORTUNITY_TYPE, TAG_SPECIFIC_INSIGHTS,
};
use regex::Regex;

const INSIGHT_PREFIX_CHARS: usize = 20;

static SUBJECT_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)subject[:\s]+([^\n]+)").expect("subject pattern is valid"));
static SUBJECT_QUOTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)"subject"[:\s]+"([^"]+)""#).expect("quoted subject pattern is valid")
});
static SUBJECT_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)subject[:\s]+[^\n]+").expect("subject line pattern is valid"));
static BODY_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)body[:\s]+(.+)").expect("body pattern is valid"));
// Stops at the first unescaped quote, or runs to the end of a reply cut off mid-string.
static BODY_QUOTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)"body"[:\s]+"((?:[^"\\]|\\.)*)(?:"|\z)"#)
        .expect("quoted body pattern is valid")
});
static FENCE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```[a-z]*\n?").expect("fence pattern is valid"));
static BRACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{[^}]*\}").expect("brace pattern is valid"));
static FRIENDLY_REGISTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:hi|hey)\b|hope you|looking forward").expect("friendly pattern is valid")
});
static CONSULTATIVE_REGISTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"strategic|analysis|recommend").expect("consultative pattern is valid")
});

pub fn email_from_text(
    text: &str,
    client: &ClientRecord,
    analysis: &OpportunityAnalysis,
    signature: &str,
) -> EmailContent {
    let subject = subject_from(text).unwrap_or_else(|| fallback_subject(analysis));

    let without_subject = SUBJECT_LINE.replace_all(text, "");
    let body = body_from(&without_subject)
        .filter(|body| body_meets_length_floor(body))
        .unwrap_or_else(|| templated_body(client, analysis, signature));

    let tone = classify_tone(&body);
    let personalization_elements = personalization_tags(&body, client, analysis);

    EmailContent { subject, body, tone, personalization_elements }
}

fn subject_from(text: &str) -> Option<String> {
    [&SUBJECT_LABEL, &SUBJECT_QUOTED]
        .into_iter()
        .find_map(|pattern| pattern.captures(text))
        .and_then(|captures| captures.get(1))
        .map(|subject| subject.as_str().trim().to_string())
        .filter(|subject| !subject.is_empty())
}

fn body_from(text: &str) -> Option<String> {
    let labelled = [&BODY_LABEL, &BODY_QUOTED]
        .into_iter()
        .find_map(|pattern| pattern.captures(text))
        .and_then(|captures| captures.get(1))
        .map(|body| unescape(body.as_str().trim()))
        .filter(|body| !body.is_empty());

    labelled.or_else(|| {
        let stripped = FENCE_MARKER.replace_all(text, "");
        let stripped = BRACE_RUN.replace_all(&stripped, "");
        Some(stripped.trim().to_string()).filter(|body| !body.is_empty())
    })
}

fn unescape(value: &str) -> String {
    value.replace("\\\"", "\"").replace("\\n", "\n")
}

/// Later registers overwrite earlier ones, so consultative beats friendly.
pub fn classify_tone(body: &str) -> Tone {
    let lowered = body.to_lowercase();
    let mut tone = Tone::Professional;
    if FRIENDLY_REGISTER.is_match(&lowered) {
        tone = Tone::Friendly;
    }
    if CONSULTATIVE_REGISTER.is_match(&lowered) {
        tone = Tone::Consultative;
    }
    tone
}

pub fn personalization_tags(
    body: &str,
    client: &ClientRecord,
    analysis: &OpportunityAnalysis,
) -> Vec<String> {
    let lowered = body.to_lowercase();
    let mut tags = Vec::new();

    if !client.name.is_empty() && body.contains(&client.name) {
        tags.push(TAG_CLIENT_NAME.to_string());
    }
    if !client.company.is_empty() && body.contains(&client.company) {
        tags.push(TAG_COMPANY_NAME.to_string());
    }
    if !analysis.opportunity_type.is_empty()
        && lowered.contains(&analysis.opportunity_type.to_lowercase())
    {
        tags.push(TAG_OPPORTUNITY_TYPE.to_string());
    }
    let mentions_insight = analysis.key_insights.iter().any(|insight| {
        let prefix: String = insight.chars().take(INSIGHT_PREFIX_CHARS).collect();
        !prefix.is_empty() && lowered.contains(&prefix.to_lowercase())
    });
    if mentions_insight {
        tags.push(TAG_SPECIFIC_INSIGHTS.to_string());
    }

    if tags.is_empty() {
        tags.push(TAG_BASIC.to_string());
    }
    tags
}
