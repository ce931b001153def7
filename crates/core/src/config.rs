use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::context::DEFAULT_CONTEXT_CHAR_LIMIT;
use crate::ranking::DEFAULT_TOP_N;

pub const CONFIG_FILE_CANDIDATES: [&str; 2] = ["outreach.toml", "config/outreach.toml"];

const MAX_CONCURRENCY: usize = 64;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub retrieval: RetrievalConfig,
    pub pipeline: PipelineConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
}

#[derive(Clone, Debug)]
pub struct RetrievalConfig {
    pub enabled: bool,
    pub base_url: Option<String>,
    pub result_limit: usize,
    pub context_char_limit: usize,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub top_n: usize,
    pub concurrency: usize,
    pub signature: String,
}

#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub clients_path: PathBuf,
    pub output_path: PathBuf,
    pub report_path: Option<PathBuf>,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    OpenAi,
    Anthropic,
    Ollama,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub clients_path: Option<PathBuf>,
    pub output_path: Option<PathBuf>,
    pub report_path: Option<PathBuf>,
    pub top_n: Option<usize>,
    pub concurrency: Option<usize>,
    pub log_level: Option<String>,
    pub llm_provider: Option<LlmProvider>,
    pub llm_model: Option<String>,
    pub llm_base_url: Option<String>,
    pub llm_api_key: Option<String>,
    pub llm_max_retries: Option<u32>,
    pub llm_timeout_secs: Option<u64>,
    pub retrieval_enabled: Option<bool>,
    pub retrieval_base_url: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig {
                provider: LlmProvider::Ollama,
                api_key: None,
                base_url: None,
                model: "llama3.1".to_string(),
                temperature: 0.7,
                timeout_secs: 30,
                max_retries: 2,
                retry_base_delay_ms: 500,
            },
            retrieval: RetrievalConfig {
                enabled: false,
                base_url: None,
                result_limit: 5,
                context_char_limit: DEFAULT_CONTEXT_CHAR_LIMIT,
                timeout_secs: 10,
                max_retries: 1,
            },
            pipeline: PipelineConfig {
                top_n: DEFAULT_TOP_N,
                concurrency: 1,
                signature: "Your Financial Advisor".to_string(),
            },
            storage: StorageConfig {
                clients_path: PathBuf::from("data/client_context.json"),
                output_path: PathBuf::from("data/emails_sent.json"),
                report_path: None,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Ollama => "ollama",
        }
    }

    pub fn requires_api_key(&self) -> bool {
        matches!(self, Self::OpenAi | Self::Anthropic)
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::OpenAi => "https://api.openai.com/v1",
            Self::Anthropic => "https://api.anthropic.com",
            Self::Ollama => "http://localhost:11434",
        }
    }
}

impl LlmConfig {
    /// Configured base URL, or the provider's public endpoint when unset.
    pub fn effective_base_url(&self) -> String {
        self.base_url
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| self.provider.default_base_url())
            .trim_end_matches('/')
            .to_string()
    }
}

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Compact => "compact",
            Self::Pretty => "pretty",
            Self::Json => "json",
        }
    }
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" | "open_ai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected openai|anthropic|ollama)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(CONFIG_FILE_CANDIDATES[0]));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(llm) = patch.llm {
            if let Some(provider) = llm.provider {
                self.llm.provider = provider;
            }
            if let Some(llm_api_key_value) = llm.api_key {
                self.llm.api_key = Some(secret_value(llm_api_key_value));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = Some(base_url);
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(temperature) = llm.temperature {
                self.llm.temperature = temperature;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
            if let Some(max_retries) = llm.max_retries {
                self.llm.max_retries = max_retries;
            }
            if let Some(retry_base_delay_ms) = llm.retry_base_delay_ms {
                self.llm.retry_base_delay_ms = retry_base_delay_ms;
            }
        }

        if let Some(retrieval) = patch.retrieval {
            if let Some(enabled) = retrieval.enabled {
                self.retrieval.enabled = enabled;
            }
            if let Some(base_url) = retrieval.base_url {
                self.retrieval.base_url = Some(base_url);
            }
            if let Some(result_limit) = retrieval.result_limit {
                self.retrieval.result_limit = result_limit;
            }
            if let Some(context_char_limit) = retrieval.context_char_limit {
                self.retrieval.context_char_limit = context_char_limit;
            }
            if let Some(timeout_secs) = retrieval.timeout_secs {
                self.retrieval.timeout_secs = timeout_secs;
            }
            if let Some(max_retries) = retrieval.max_retries {
                self.retrieval.max_retries = max_retries;
            }
        }

        if let Some(pipeline) = patch.pipeline {
            if let Some(top_n) = pipeline.top_n {
                self.pipeline.top_n = top_n;
            }
            if let Some(concurrency) = pipeline.concurrency {
                self.pipeline.concurrency = concurrency;
            }
            if let Some(signature) = pipeline.signature {
                self.pipeline.signature = signature;
            }
        }

        if let Some(storage) = patch.storage {
            if let Some(clients_path) = storage.clients_path {
                self.storage.clients_path = clients_path;
            }
            if let Some(output_path) = storage.output_path {
                self.storage.output_path = output_path;
            }
            if let Some(report_path) = storage.report_path {
                self.storage.report_path = Some(report_path);
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("OUTREACH_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        if let Some(value) = read_env("OUTREACH_LLM_API_KEY") {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("OUTREACH_LLM_BASE_URL") {
            self.llm.base_url = Some(value);
        }
        if let Some(value) = read_env("OUTREACH_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("OUTREACH_LLM_TEMPERATURE") {
            self.llm.temperature = parse_f32("OUTREACH_LLM_TEMPERATURE", &value)?;
        }
        if let Some(value) = read_env("OUTREACH_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("OUTREACH_LLM_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("OUTREACH_LLM_MAX_RETRIES") {
            self.llm.max_retries = parse_u32("OUTREACH_LLM_MAX_RETRIES", &value)?;
        }
        if let Some(value) = read_env("OUTREACH_LLM_RETRY_BASE_DELAY_MS") {
            self.llm.retry_base_delay_ms = parse_u64("OUTREACH_LLM_RETRY_BASE_DELAY_MS", &value)?;
        }

        if let Some(value) = read_env("OUTREACH_RETRIEVAL_ENABLED") {
            self.retrieval.enabled = parse_bool("OUTREACH_RETRIEVAL_ENABLED", &value)?;
        }
        if let Some(value) = read_env("OUTREACH_RETRIEVAL_BASE_URL") {
            self.retrieval.base_url = Some(value);
        }
        if let Some(value) = read_env("OUTREACH_RETRIEVAL_RESULT_LIMIT") {
            self.retrieval.result_limit = parse_usize("OUTREACH_RETRIEVAL_RESULT_LIMIT", &value)?;
        }
        if let Some(value) = read_env("OUTREACH_RETRIEVAL_CONTEXT_CHAR_LIMIT") {
            self.retrieval.context_char_limit =
                parse_usize("OUTREACH_RETRIEVAL_CONTEXT_CHAR_LIMIT", &value)?;
        }
        if let Some(value) = read_env("OUTREACH_RETRIEVAL_TIMEOUT_SECS") {
            self.retrieval.timeout_secs = parse_u64("OUTREACH_RETRIEVAL_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("OUTREACH_RETRIEVAL_MAX_RETRIES") {
            self.retrieval.max_retries = parse_u32("OUTREACH_RETRIEVAL_MAX_RETRIES", &value)?;
        }

        if let Some(value) = read_env("OUTREACH_PIPELINE_TOP_N") {
            self.pipeline.top_n = parse_usize("OUTREACH_PIPELINE_TOP_N", &value)?;
        }
        if let Some(value) = read_env("OUTREACH_PIPELINE_CONCURRENCY") {
            self.pipeline.concurrency = parse_usize("OUTREACH_PIPELINE_CONCURRENCY", &value)?;
        }
        if let Some(value) = read_env("OUTREACH_PIPELINE_SIGNATURE") {
            self.pipeline.signature = value;
        }

        if let Some(value) = read_env("OUTREACH_STORAGE_CLIENTS_PATH") {
            self.storage.clients_path = PathBuf::from(value);
        }
        if let Some(value) = read_env("OUTREACH_STORAGE_OUTPUT_PATH") {
            self.storage.output_path = PathBuf::from(value);
        }
        if let Some(value) = read_env("OUTREACH_STORAGE_REPORT_PATH") {
            self.storage.report_path = Some(PathBuf::from(value));
        }

        let log_level =
            read_env("OUTREACH_LOGGING_LEVEL").or_else(|| read_env("OUTREACH_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("OUTREACH_LOGGING_FORMAT").or_else(|| read_env("OUTREACH_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(clients_path) = overrides.clients_path {
            self.storage.clients_path = clients_path;
        }
        if let Some(output_path) = overrides.output_path {
            self.storage.output_path = output_path;
        }
        if let Some(report_path) = overrides.report_path {
            self.storage.report_path = Some(report_path);
        }
        if let Some(top_n) = overrides.top_n {
            self.pipeline.top_n = top_n;
        }
        if let Some(concurrency) = overrides.concurrency {
            self.pipeline.concurrency = concurrency;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(llm_provider) = overrides.llm_provider {
            self.llm.provider = llm_provider;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(llm_base_url) = overrides.llm_base_url {
            self.llm.base_url = Some(llm_base_url);
        }
        if let Some(llm_api_key) = overrides.llm_api_key {
            self.llm.api_key = Some(secret_value(llm_api_key));
        }
        if let Some(llm_max_retries) = overrides.llm_max_retries {
            self.llm.max_retries = llm_max_retries;
        }
        if let Some(llm_timeout_secs) = overrides.llm_timeout_secs {
            self.llm.timeout_secs = llm_timeout_secs;
        }
        if let Some(enabled) = overrides.retrieval_enabled {
            self.retrieval.enabled = enabled;
        }
        if let Some(base_url) = overrides.retrieval_base_url {
            self.retrieval.base_url = Some(base_url);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_llm(&self.llm)?;
        validate_retrieval(&self.retrieval)?;
        validate_pipeline(&self.pipeline)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    CONFIG_FILE_CANDIDATES.into_iter().map(PathBuf::from).find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if !(0.0..=2.0).contains(&llm.temperature) {
        return Err(ConfigError::Validation(
            "llm.temperature must be in range 0.0..=2.0".to_string(),
        ));
    }

    if llm.model.trim().is_empty() {
        return Err(ConfigError::Validation("llm.model must not be empty".to_string()));
    }

    if llm.provider.requires_api_key() {
        let missing = llm
            .api_key
            .as_ref()
            .map(|value| value.expose_secret().trim().is_empty())
            .unwrap_or(true);
        if missing {
            return Err(ConfigError::Validation(
                "llm.api_key is required for openai/anthropic providers (set OUTREACH_LLM_API_KEY)"
                    .to_string(),
            ));
        }
    }

    if let Some(base_url) = &llm.base_url {
        if !is_http_url(base_url) {
            return Err(ConfigError::Validation(
                "llm.base_url must start with http:// or https://".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_retrieval(retrieval: &RetrievalConfig) -> Result<(), ConfigError> {
    if retrieval.result_limit == 0 {
        return Err(ConfigError::Validation(
            "retrieval.result_limit must be greater than zero".to_string(),
        ));
    }

    if retrieval.context_char_limit == 0 {
        return Err(ConfigError::Validation(
            "retrieval.context_char_limit must be greater than zero".to_string(),
        ));
    }

    if retrieval.timeout_secs == 0 || retrieval.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "retrieval.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if retrieval.enabled {
        let base_url = retrieval.base_url.as_deref().unwrap_or_default();
        if !is_http_url(base_url) {
            return Err(ConfigError::Validation(
                "retrieval.enabled is true but retrieval.base_url is not an http:// or https:// URL"
                    .to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_pipeline(pipeline: &PipelineConfig) -> Result<(), ConfigError> {
    if pipeline.top_n == 0 {
        return Err(ConfigError::Validation(
            "pipeline.top_n must be greater than zero".to_string(),
        ));
    }

    if pipeline.concurrency == 0 || pipeline.concurrency > MAX_CONCURRENCY {
        return Err(ConfigError::Validation(format!(
            "pipeline.concurrency must be in range 1..={MAX_CONCURRENCY}"
        )));
    }

    if pipeline.signature.trim().is_empty() {
        return Err(ConfigError::Validation(
            "pipeline.signature must not be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn is_http_url(value: &str) -> bool {
    let value = value.trim();
    value.starts_with("http://") || value.starts_with("https://")
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.trim().parse::<u32>().map_err(|_| invalid_override(key, value))
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse::<u64>().map_err(|_| invalid_override(key, value))
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.trim().parse::<usize>().map_err(|_| invalid_override(key, value))
}

fn parse_f32(key: &str, value: &str) -> Result<f32, ConfigError> {
    value.trim().parse::<f32>().map_err(|_| invalid_override(key, value))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.trim().parse::<bool>().map_err(|_| invalid_override(key, value))
}

fn invalid_override(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    llm: Option<LlmPatch>,
    retrieval: Option<RetrievalPatch>,
    pipeline: Option<PipelinePatch>,
    storage: Option<StoragePatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    temperature: Option<f32>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
    retry_base_delay_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct RetrievalPatch {
    enabled: Option<bool>,
    base_url: Option<String>,
    result_limit: Option<usize>,
    context_char_limit: Option<usize>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct PipelinePatch {
    top_n: Option<usize>,
    concurrency: Option<usize>,
    signature: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StoragePatch {
    clients_path: Option<PathBuf>,
    output_path: Option<PathBuf>,
    report_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LlmProvider, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_validate_without_any_file_or_env() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;

        ensure(config.llm.provider == LlmProvider::Ollama, "default provider should be ollama")?;
        ensure(
            config.llm.effective_base_url() == "http://localhost:11434",
            "ollama should default to the local endpoint",
        )?;
        ensure(config.pipeline.top_n == 8, "default top_n should be 8")?;
        ensure(config.pipeline.concurrency == 1, "default processing should be serial")?;
        ensure(config.retrieval.result_limit == 5, "default retrieval limit should be 5")?;
        ensure(config.retrieval.context_char_limit == 2000, "default context cap should be 2000")?;
        ensure(!config.retrieval.enabled, "retrieval should be disabled by default")
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_OUTREACH_LLM_KEY", "sk-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("outreach.toml");
            fs::write(
                &path,
                r#"
[llm]
provider = "open_ai"
api_key = "${TEST_OUTREACH_LLM_KEY}"
base_url = "https://api.openai.com/v1"
model = "gpt-4o-mini"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.llm.provider == LlmProvider::OpenAi, "provider should come from file")?;
            ensure(
                config.llm.api_key.as_ref().map(|key| key.expose_secret() == "sk-from-env")
                    == Some(true),
                "api key should be interpolated from environment",
            )
        })();

        clear_vars(&["TEST_OUTREACH_LLM_KEY"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("OUTREACH_LOG_LEVEL", "warn");
        env::set_var("OUTREACH_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )
        })();

        clear_vars(&["OUTREACH_LOG_LEVEL", "OUTREACH_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("OUTREACH_PIPELINE_TOP_N", "5");
        env::set_var("OUTREACH_STORAGE_OUTPUT_PATH", "from-env/emails.json");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("outreach.toml");
            fs::write(
                &path,
                r#"
[pipeline]
top_n = 3
concurrency = 4

[storage]
clients_path = "from-file/clients.json"
output_path = "from-file/emails.json"

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    clients_path: Some(PathBuf::from("from-override/clients.json")),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.storage.clients_path == PathBuf::from("from-override/clients.json"),
                "override clients path should win",
            )?;
            ensure(
                config.storage.output_path == PathBuf::from("from-env/emails.json"),
                "env output path should win over file",
            )?;
            ensure(config.pipeline.top_n == 5, "env top_n should win over file")?;
            ensure(config.pipeline.concurrency == 4, "file concurrency should win over default")?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")
        })();

        clear_vars(&["OUTREACH_PIPELINE_TOP_N", "OUTREACH_STORAGE_OUTPUT_PATH"]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("OUTREACH_LLM_PROVIDER", "anthropic");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("llm.api_key")
            );
            ensure(has_message, "validation failure should mention llm.api_key")
        })();

        clear_vars(&["OUTREACH_LLM_PROVIDER"]);
        result
    }

    #[test]
    fn enabled_retrieval_requires_base_url() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let result = AppConfig::load(LoadOptions {
            overrides: ConfigOverrides { retrieval_enabled: Some(true), ..ConfigOverrides::default() },
            ..LoadOptions::default()
        });

        ensure(
            matches!(result, Err(ConfigError::Validation(ref message)) if message.contains("retrieval.base_url")),
            "enabling retrieval without a base url should fail validation",
        )
    }

    #[test]
    fn invalid_numeric_env_override_is_reported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("OUTREACH_PIPELINE_CONCURRENCY", "many");

        let result = (|| -> Result<(), String> {
            let outcome = AppConfig::load(LoadOptions::default());
            ensure(
                matches!(
                    outcome,
                    Err(ConfigError::InvalidEnvOverride { ref key, .. })
                        if key == "OUTREACH_PIPELINE_CONCURRENCY"
                ),
                "non-numeric concurrency should be rejected with its key",
            )
        })();

        clear_vars(&["OUTREACH_PIPELINE_CONCURRENCY"]);
        result
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("OUTREACH_LLM_PROVIDER", "openai");
        env::set_var("OUTREACH_LLM_API_KEY", "sk-secret-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(!debug.contains("sk-secret-value"), "debug output should not contain api key")?;
            ensure(
                matches!(config.logging.format, LogFormat::Compact),
                "default logging format should be compact",
            )
        })();

        clear_vars(&["OUTREACH_LLM_PROVIDER", "OUTREACH_LLM_API_KEY"]);
        result
    }
}
