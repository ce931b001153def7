use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use outreach_cli::commands::run::RunArgs;
use outreach_cli::commands::{config, doctor, run};
use serde_json::Value;
use tempfile::TempDir;

// Nothing listens here, so every model call fails fast and the pipeline falls back.
const UNREACHABLE_MODEL: &str = "http://127.0.0.1:9";

fn write_clients(dir: &Path) -> PathBuf {
    let path = dir.join("client_context.json");
    let clients = serde_json::json!([
        {"client_id": "c1", "name": "Ana Ruiz", "company": "Ruiz Dental", "pain_points": ["tax planning"], "engagement_score": 40},
        {"client_id": "c2", "name": "Ben Ortiz", "company": "Ortiz Freight", "pain_points": ["cash flow"], "engagement_score": 90}
    ]);
    fs::write(&path, clients.to_string()).expect("write client fixture");
    path
}

fn offline_model_env() -> [(&'static str, &'static str); 3] {
    [
        ("OUTREACH_LLM_BASE_URL", UNREACHABLE_MODEL),
        ("OUTREACH_LLM_MAX_RETRIES", "0"),
        ("OUTREACH_LLM_TIMEOUT_SECS", "2"),
    ]
}

#[test]
fn run_falls_back_and_prints_the_report() {
    let dir = TempDir::new().expect("temp dir");
    let clients = write_clients(dir.path());
    let output = dir.path().join("emails_sent.json");

    with_env(&offline_model_env(), || {
        let result = run::run(
            None,
            RunArgs {
                clients: Some(clients.clone()),
                output: Some(output.clone()),
                ..RunArgs::default()
            },
        );
        assert_eq!(result.exit_code, 0, "expected a successful run: {}", result.output);

        let report = parse_payload(&result.output);
        assert_eq!(report["total_clients_analyzed"], 2);
        assert_eq!(report["emails_generated"], 2);
        assert_eq!(report["top_opportunities"][0]["client"], "Ben Ortiz");
        assert_eq!(report["diagnostics"][0]["entries"][0]["stage"], "analysis");

        let written: Value =
            serde_json::from_str(&fs::read_to_string(&output).expect("output should exist"))
                .expect("output should be JSON");
        assert_eq!(written[0]["client_id"], "c2");
        assert_eq!(written[0]["subject"], "Quick check-in - cash flow");
    });
}

#[test]
fn run_reports_config_failure() {
    with_env(&[("OUTREACH_LLM_PROVIDER", "openai")], || {
        let result = run::run(None, RunArgs::default());
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "run");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
        assert!(payload["message"].as_str().unwrap_or_default().contains("llm.api_key"));
    });
}

#[test]
fn run_reports_missing_client_file() {
    let dir = TempDir::new().expect("temp dir");
    let missing = dir.path().join("nope.json");

    with_env(&offline_model_env(), || {
        let result = run::run(
            None,
            RunArgs {
                clients: Some(missing.clone()),
                output: Some(dir.path().join("emails_sent.json")),
                ..RunArgs::default()
            },
        );
        assert_eq!(result.exit_code, 3, "expected client load failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "client_load");
        assert!(payload["message"].as_str().unwrap_or_default().contains("nope.json"));
    });
}

#[test]
fn doctor_passes_with_readable_clients() {
    let dir = TempDir::new().expect("temp dir");
    let clients = write_clients(dir.path());
    let clients = clients.to_str().expect("utf-8 temp path");

    with_env(&[("OUTREACH_STORAGE_CLIENTS_PATH", clients)], || {
        let result = doctor::run(None, true);
        assert_eq!(result.exit_code, 0, "expected passing doctor: {}", result.output);

        let report = parse_payload(&result.output);
        assert_eq!(report["overall_status"], "pass");
        assert_eq!(report["checks"][1]["name"], "client_file");
        assert!(report["checks"][1]["details"].as_str().unwrap_or_default().contains("2 client(s)"));
    });
}

#[test]
fn doctor_flags_missing_client_file() {
    let dir = TempDir::new().expect("temp dir");
    let missing = dir.path().join("missing.json");
    let missing = missing.to_str().expect("utf-8 temp path");

    with_env(&[("OUTREACH_STORAGE_CLIENTS_PATH", missing)], || {
        let result = doctor::run(None, true);
        assert_eq!(result.exit_code, 1);

        let report = parse_payload(&result.output);
        assert_eq!(report["overall_status"], "fail");
        assert_eq!(report["checks"][1]["status"], "fail");
        assert_eq!(report["checks"][2]["status"], "pass");
    });
}

#[test]
fn doctor_skips_checks_when_config_is_invalid() {
    with_env(&[("OUTREACH_PIPELINE_CONCURRENCY", "0")], || {
        let result = doctor::run(None, false);
        assert_eq!(result.exit_code, 1);
        assert!(result.output.starts_with("doctor: one or more readiness checks failed"));
        assert!(result.output.contains("- [fail] config_validation"));
        assert!(result.output.contains("- [skip] client_file"));
    });
}

#[test]
fn config_attributes_sources_and_redacts_keys() {
    with_env(
        &[
            ("OUTREACH_PIPELINE_TOP_N", "3"),
            ("OUTREACH_LLM_PROVIDER", "anthropic"),
            ("OUTREACH_LLM_API_KEY", "sk-ant-very-secret"),
            ("OUTREACH_LOG_LEVEL", "debug"),
        ],
        || {
            let output = config::run(None);

            assert!(output.contains("- pipeline.top_n = 3 (source: env (OUTREACH_PIPELINE_TOP_N))"));
            assert!(output.contains("- llm.api_key = <redacted> (source: env (OUTREACH_LLM_API_KEY))"));
            assert!(output.contains("- llm.base_url = https://api.anthropic.com (source: default)"));
            assert!(output.contains("- logging.level = debug (source: env (OUTREACH_LOG_LEVEL))"));
            assert!(!output.contains("very-secret"));
        },
    );
}

#[test]
fn config_attributes_values_from_an_explicit_file() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("outreach.toml");
    fs::write(&path, "[pipeline]\ntop_n = 6\nsignature = \"Dana, Ortiz Wealth\"\n")
        .expect("write config fixture");

    with_env(&[], || {
        let output = config::run(Some(path.as_path()));
        let file_source = format!("(source: file ({}))", path.display());

        assert!(output.contains(&format!("- pipeline.top_n = 6 {file_source}")));
        assert!(output.contains(&format!("- pipeline.signature = Dana, Ortiz Wealth {file_source}")));
        assert!(output.contains("- pipeline.concurrency = 1 (source: default)"));
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard = match ENV_LOCK.get_or_init(|| Mutex::new(())).lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };

    let previous_values: Vec<(String, String)> =
        env::vars().filter(|(key, _)| key.starts_with("OUTREACH_")).collect();

    for (key, _) in &previous_values {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, _) in vars {
        env::remove_var(key);
    }
    for (key, value) in previous_values {
        env::set_var(key, value);
    }
}
