//! Structured extraction of model output.
//!
//! Model text arrives in many shapes: a clean object, an object inside a
//! fenced block, an object wrapped in prose. Each [`Strategy`] is a pure
//! attempt over the raw text; [`extract`] runs them in a fixed order and the
//! first candidate that parses, carries every required field, and passes
//! [`Extractable::validate`] wins.

use std::fmt;
use std::sync::LazyLock;

use outreach_core::domain::analysis::{OpportunityAnalysis, PriorityScore};
use outreach_core::domain::client::ClientRecord;
use outreach_core::domain::email::{body_meets_length_floor, EmailContent, MIN_BODY_CHARS};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

const TAGGED_FENCE: &str = "```json";
const FENCE: &str = "```";

// Objects nested at most one level deep, matched without recursion.
static BRACE_GROUP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{[^{}]*(?:\{[^{}]*\}[^{}]*)*\}").expect("brace pattern is valid")
});

/// A record shape that can be recovered from model output.
pub trait Extractable: DeserializeOwned {
    const SCHEMA: &'static str;
    const REQUIRED_FIELDS: &'static [&'static str];

    /// Field-level constraints beyond what deserialization enforces.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    TaggedFence,
    AnyFence,
    BraceScan,
    WholeText,
}

impl Strategy {
    pub const ORDER: [Strategy; 4] =
        [Strategy::TaggedFence, Strategy::AnyFence, Strategy::BraceScan, Strategy::WholeText];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TaggedFence => "tagged_fence",
            Self::AnyFence => "any_fence",
            Self::BraceScan => "brace_scan",
            Self::WholeText => "whole_text",
        }
    }

    pub fn attempt<T: Extractable>(&self, text: &str) -> Result<T, String> {
        match self {
            Self::TaggedFence => tagged_fence(text),
            Self::AnyFence => any_fence(text),
            Self::BraceScan => brace_scan(text),
            Self::WholeText => whole_text(text),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StrategyMiss {
    pub strategy: Strategy,
    pub reason: String,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("could not extract {schema} from model output ({})", summarize(.misses))]
pub struct ExtractionFailed {
    pub schema: &'static str,
    pub misses: Vec<StrategyMiss>,
}

fn summarize(misses: &[StrategyMiss]) -> String {
    misses
        .iter()
        .map(|miss| format!("{}: {}", miss.strategy, miss.reason))
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Clone, Debug, PartialEq)]
pub struct Extracted<T> {
    pub value: T,
    pub strategy: Strategy,
}

pub fn extract<T: Extractable>(text: &str) -> Result<Extracted<T>, ExtractionFailed> {
    first_success(text, &Strategy::ORDER)
}

/// Tries `strategies` in order and returns the first success.
pub fn first_success<T: Extractable>(
    text: &str,
    strategies: &[Strategy],
) -> Result<Extracted<T>, ExtractionFailed> {
    let mut misses = Vec::with_capacity(strategies.len());

    for strategy in strategies {
        match strategy.attempt::<T>(text) {
            Ok(value) => return Ok(Extracted { value, strategy: *strategy }),
            Err(reason) => {
                tracing::debug!(
                    event_name = "extraction.strategy.miss",
                    schema = T::SCHEMA,
                    strategy = strategy.as_str(),
                    reason = %reason,
                    "extraction strategy did not produce a record"
                );
                misses.push(StrategyMiss { strategy: *strategy, reason });
            }
        }
    }

    Err(ExtractionFailed { schema: T::SCHEMA, misses })
}

fn tagged_fence<T: Extractable>(text: &str) -> Result<T, String> {
    let (_, after) = text.split_once(TAGGED_FENCE).ok_or("no ```json block")?;
    let block = after.split(FENCE).next().unwrap_or_default();
    parse_candidate(block.trim())
}

fn any_fence<T: Extractable>(text: &str) -> Result<T, String> {
    let block = text.split(FENCE).nth(1).ok_or("no fenced block")?.trim();
    let body = match block.split_once('\n') {
        Some((first, rest)) if matches!(first.trim(), "json" | "JSON") => rest,
        None if matches!(block, "json" | "JSON") => "",
        _ => block,
    };
    parse_candidate(body)
}

fn brace_scan<T: Extractable>(text: &str) -> Result<T, String> {
    let mut last_reason = None;

    for candidate in BRACE_GROUP.find_iter(text) {
        match parse_candidate(candidate.as_str()) {
            Ok(value) => return Ok(value),
            Err(reason) => last_reason = Some(reason),
        }
    }

    Err(last_reason.unwrap_or_else(|| "no brace-delimited object".to_string()))
}

fn whole_text<T: Extractable>(text: &str) -> Result<T, String> {
    parse_candidate(text.trim())
}

/// Parses one candidate and checks it against `T`'s schema.
pub fn parse_candidate<T: Extractable>(candidate: &str) -> Result<T, String> {
    let value: Value =
        serde_json::from_str(candidate).map_err(|error| format!("invalid JSON: {error}"))?;
    let object = value.as_object().ok_or("JSON value is not an object")?;

    let missing: Vec<&str> = T::REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|field| object.get(*field).map_or(true, Value::is_null))
        .collect();
    if !missing.is_empty() {
        return Err(format!("missing required field(s): {}", missing.join(", ")));
    }

    let record: T =
        serde_json::from_value(value).map_err(|error| format!("schema mismatch: {error}"))?;
    record.validate()?;
    Ok(record)
}

/// Wire shape of an opportunity analysis. Identity is filled from the client record.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct AnalysisPayload {
    pub opportunity_type: String,
    pub priority_score: PriorityScore,
    pub timing_reason: String,
    pub approach_angle: String,
    pub estimated_value: String,
    pub key_insights: Vec<String>,
}

impl AnalysisPayload {
    pub fn into_analysis(self, client: &ClientRecord) -> OpportunityAnalysis {
        OpportunityAnalysis {
            client_id: client.client_id.clone(),
            client_name: client.name.clone(),
            opportunity_type: self.opportunity_type,
            priority_score: self.priority_score,
            timing_reason: self.timing_reason,
            approach_angle: self.approach_angle,
            estimated_value: self.estimated_value,
            key_insights: self.key_insights,
        }
    }
}

impl Extractable for AnalysisPayload {
    const SCHEMA: &'static str = "opportunity analysis";
    const REQUIRED_FIELDS: &'static [&'static str] = &[
        "opportunity_type",
        "priority_score",
        "timing_reason",
        "approach_angle",
        "estimated_value",
        "key_insights",
    ];

    fn validate(&self) -> Result<(), String> {
        if self.opportunity_type.trim().is_empty() {
            return Err("opportunity_type is empty".to_string());
        }
        Ok(())
    }
}

impl Extractable for EmailContent {
    const SCHEMA: &'static str = "email content";
    const REQUIRED_FIELDS: &'static [&'static str] =
        &["subject", "body", "tone", "personalization_elements"];

    fn validate(&self) -> Result<(), String> {
        if self.subject.trim().is_empty() {
            return Err("subject is empty".to_string());
        }
        if !body_meets_length_floor(&self.body) {
            return Err(format!("body is shorter than {MIN_BODY_CHARS} characters"));
        }
        Ok(())
    }
}
