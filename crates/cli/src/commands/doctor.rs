use std::path::PathBuf;

use outreach_core::config::{AppConfig, LoadOptions};
use outreach_core::store::load_clients;
use serde::Serialize;

use crate::commands::{escape_json, CommandResult};

const EXIT_CHECKS_FAILED: u8 = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

impl DoctorCheck {
    fn pass(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Pass, details: details.into() }
    }

    fn fail(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Fail, details: details.into() }
    }

    fn skipped(name: &'static str) -> Self {
        Self {
            name,
            status: CheckStatus::Skipped,
            details: "skipped because configuration did not load".to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(config_path: Option<PathBuf>, json_output: bool) -> CommandResult {
    let report = build_report(config_path);
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { EXIT_CHECKS_FAILED };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report(config_path: Option<PathBuf>) -> DoctorReport {
    let options =
        LoadOptions { require_file: config_path.is_some(), config_path, ..LoadOptions::default() };

    let checks = match AppConfig::load(options) {
        Ok(config) => vec![
            DoctorCheck::pass("config_validation", "configuration loaded and validated"),
            check_client_file(&config),
            check_llm_settings(&config),
            check_retrieval_settings(&config),
        ],
        Err(error) => vec![
            DoctorCheck::fail("config_validation", error.to_string()),
            DoctorCheck::skipped("client_file"),
            DoctorCheck::skipped("llm_settings"),
            DoctorCheck::skipped("retrieval_settings"),
        ],
    };

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_client_file(config: &AppConfig) -> DoctorCheck {
    let path = &config.storage.clients_path;
    match load_clients(path) {
        Ok(clients) if clients.is_empty() => {
            DoctorCheck::fail("client_file", format!("`{}` contains no clients", path.display()))
        }
        Ok(clients) => DoctorCheck::pass(
            "client_file",
            format!("`{}` readable with {} client(s)", path.display(), clients.len()),
        ),
        Err(error) => DoctorCheck::fail("client_file", error.to_string()),
    }
}

fn check_llm_settings(config: &AppConfig) -> DoctorCheck {
    let llm = &config.llm;
    let credentials = match (&llm.api_key, llm.provider.requires_api_key()) {
        (Some(_), _) => "api key set",
        (None, false) => "no api key needed",
        (None, true) => return DoctorCheck::fail("llm_settings", "api key missing"),
    };

    DoctorCheck::pass(
        "llm_settings",
        format!(
            "{} model `{}` at {} ({credentials}, timeout {}s, {} retries)",
            llm.provider.as_str(),
            llm.model,
            llm.effective_base_url(),
            llm.timeout_secs,
            llm.max_retries
        ),
    )
}

fn check_retrieval_settings(config: &AppConfig) -> DoctorCheck {
    let retrieval = &config.retrieval;
    if !retrieval.enabled {
        return DoctorCheck::pass(
            "retrieval_settings",
            "retrieval disabled; research runs without document context",
        );
    }

    match &retrieval.base_url {
        Some(base_url) => DoctorCheck::pass(
            "retrieval_settings",
            format!(
                "searching {base_url} for up to {} passages ({} chars of context)",
                retrieval.result_limit, retrieval.context_char_limit
            ),
        ),
        None => DoctorCheck::fail("retrieval_settings", "retrieval enabled without a base_url"),
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = vec![report.summary.clone()];

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}
