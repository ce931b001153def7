use std::env;
use std::fs;
use std::path::Path;

use outreach_core::config::{resolve_config_path, AppConfig, LoadOptions};
use toml::Value;

/// One row of the effective-config listing.
struct Field {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

impl Field {
    fn new(key: &'static str, value: impl Into<String>, env_keys: &'static [&'static str]) -> Self {
        Self { key, value: value.into(), env_keys }
    }
}

pub fn run(config_path: Option<&Path>) -> String {
    let options = LoadOptions {
        config_path: config_path.map(Path::to_path_buf),
        require_file: config_path.is_some(),
        ..LoadOptions::default()
    };
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let file_path = resolve_config_path(config_path);
    let file_doc = file_path.as_deref().and_then(load_config_file_doc);
    let file_label = file_path.as_deref().map(|path| path.display().to_string());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in fields(&config) {
        let source = field_source(&field, file_doc.as_ref(), file_label.as_deref());
        lines.push(format!("- {} = {} (source: {source})", field.key, field.value));
    }

    lines.join("\n")
}

fn fields(config: &AppConfig) -> Vec<Field> {
    let llm_api_key = if config.llm.api_key.is_some() { "<redacted>" } else { "<unset>" };

    vec![
        Field::new("llm.provider", config.llm.provider.as_str(), &["OUTREACH_LLM_PROVIDER"]),
        Field::new("llm.model", config.llm.model.as_str(), &["OUTREACH_LLM_MODEL"]),
        Field::new(
            "llm.base_url",
            config.llm.effective_base_url(),
            &["OUTREACH_LLM_BASE_URL"],
        ),
        Field::new("llm.api_key", llm_api_key, &["OUTREACH_LLM_API_KEY"]),
        Field::new(
            "llm.temperature",
            config.llm.temperature.to_string(),
            &["OUTREACH_LLM_TEMPERATURE"],
        ),
        Field::new(
            "llm.timeout_secs",
            config.llm.timeout_secs.to_string(),
            &["OUTREACH_LLM_TIMEOUT_SECS"],
        ),
        Field::new(
            "llm.max_retries",
            config.llm.max_retries.to_string(),
            &["OUTREACH_LLM_MAX_RETRIES"],
        ),
        Field::new(
            "retrieval.enabled",
            config.retrieval.enabled.to_string(),
            &["OUTREACH_RETRIEVAL_ENABLED"],
        ),
        Field::new(
            "retrieval.base_url",
            config.retrieval.base_url.as_deref().unwrap_or("<unset>"),
            &["OUTREACH_RETRIEVAL_BASE_URL"],
        ),
        Field::new(
            "retrieval.result_limit",
            config.retrieval.result_limit.to_string(),
            &["OUTREACH_RETRIEVAL_RESULT_LIMIT"],
        ),
        Field::new(
            "retrieval.context_char_limit",
            config.retrieval.context_char_limit.to_string(),
            &["OUTREACH_RETRIEVAL_CONTEXT_CHAR_LIMIT"],
        ),
        Field::new(
            "pipeline.top_n",
            config.pipeline.top_n.to_string(),
            &["OUTREACH_PIPELINE_TOP_N"],
        ),
        Field::new(
            "pipeline.concurrency",
            config.pipeline.concurrency.to_string(),
            &["OUTREACH_PIPELINE_CONCURRENCY"],
        ),
        Field::new(
            "pipeline.signature",
            config.pipeline.signature.as_str(),
            &["OUTREACH_PIPELINE_SIGNATURE"],
        ),
        Field::new(
            "storage.clients_path",
            config.storage.clients_path.display().to_string(),
            &["OUTREACH_STORAGE_CLIENTS_PATH"],
        ),
        Field::new(
            "storage.output_path",
            config.storage.output_path.display().to_string(),
            &["OUTREACH_STORAGE_OUTPUT_PATH"],
        ),
        Field::new(
            "storage.report_path",
            config
                .storage
                .report_path
                .as_deref()
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "<unset>".to_string()),
            &["OUTREACH_STORAGE_REPORT_PATH"],
        ),
        Field::new(
            "logging.level",
            config.logging.level.as_str(),
            &["OUTREACH_LOGGING_LEVEL", "OUTREACH_LOG_LEVEL"],
        ),
        Field::new(
            "logging.format",
            config.logging.format.as_str(),
            &["OUTREACH_LOGGING_FORMAT", "OUTREACH_LOG_FORMAT"],
        ),
    ]
}

fn load_config_file_doc(path: &Path) -> Option<Value> {
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(field: &Field, file_doc: Option<&Value>, file_label: Option<&str>) -> String {
    if let Some(env_key) = field.env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if file_doc.is_some_and(|doc| contains_path(doc, field.key)) {
        return format!("file ({})", file_label.unwrap_or("config file"));
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}
