use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use outreach_core::config::{LlmConfig, LlmProvider};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::resilience::StatusError;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const ANTHROPIC_MAX_TOKENS: u32 = 1024;

/// Generative-model collaborator: one prompt in, one free-form response out.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// reqwest-backed client speaking the chat dialect of the configured provider.
#[derive(Clone)]
pub struct HttpLlmClient {
    client: Client,
    provider: LlmProvider,
    base_url: String,
    api_key: Option<SecretString>,
    model: String,
    temperature: f32,
}

impl HttpLlmClient {
    pub fn from_config(config: &LlmConfig) -> Self {
        Self {
            client: Client::new(),
            provider: config.provider,
            base_url: config.effective_base_url(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
        }
    }

    pub fn provider(&self) -> LlmProvider {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_ref()
            .map(|key| key.expose_secret())
            .ok_or_else(|| anyhow!("{} provider requires an api key", self.provider.as_str()))
    }

    async fn openai_chat(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage { role: "user", content: prompt }],
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.api_key()?)
            .json(&request)
            .send()
            .await
            .context("openai request failed")?;
        let response = ensure_success(response, "openai").await?;

        let chat: ChatResponse = response.json().await.context("openai response was not JSON")?;
        chat.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| anyhow!("openai returned no choices"))
    }

    async fn anthropic_messages(&self, prompt: &str) -> Result<String> {
        let request = json!({
            "model": self.model,
            "max_tokens": ANTHROPIC_MAX_TOKENS,
            "temperature": self.temperature,
            "messages": [{ "role": "user", "content": prompt }],
        });

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", self.api_key()?)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .context("anthropic request failed")?;
        let response = ensure_success(response, "anthropic").await?;

        let messages: MessagesResponse =
            response.json().await.context("anthropic response was not JSON")?;
        let text = messages
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");

        if text.is_empty() {
            return Err(anyhow!("anthropic returned no text content"));
        }
        Ok(text)
    }

    async fn ollama_generate(&self, prompt: &str) -> Result<String> {
        let request = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "options": { "temperature": self.temperature },
        });

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&request)
            .send()
            .await
            .context("ollama request failed")?;
        let response = ensure_success(response, "ollama").await?;

        let generated: OllamaResponse =
            response.json().await.context("ollama response was not JSON")?;
        Ok(generated.response)
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        match self.provider {
            LlmProvider::OpenAi => self.openai_chat(prompt).await,
            LlmProvider::Anthropic => self.anthropic_messages(prompt).await,
            LlmProvider::Ollama => self.ollama_generate(prompt).await,
        }
    }
}

pub(crate) async fn ensure_success(
    response: reqwest::Response,
    service: &'static str,
) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(StatusError { service, status, body: body.trim().to_string() }.into())
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct OllamaResponse {
    response: String,
}
