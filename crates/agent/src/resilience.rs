//! Timeout and retry wrappers for the two network collaborators.
//!
//! Only transport failures reach this layer. A model answer that cannot be
//! parsed is a successful call here and is handled by the stage fallbacks.
//! Status errors the server will repeat on every attempt fail immediately.

use std::future::Future;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use outreach_core::config::{LlmConfig, RetrievalConfig};
use outreach_core::domain::context::Passage;
use reqwest::StatusCode;
use thiserror::Error;
use tracing::warn;

use crate::llm::LlmClient;
use crate::retrieval::Retriever;

/// A collaborator answered with a non-success HTTP status.
#[derive(Debug, Error)]
#[error("{service} returned HTTP {status}: {body}")]
pub struct StatusError {
    pub service: &'static str,
    pub status: StatusCode,
    pub body: String,
}

impl StatusError {
    /// Server errors, throttling and request timeouts can clear up on their own.
    pub fn is_retryable(&self) -> bool {
        self.status.is_server_error()
            || self.status == StatusCode::TOO_MANY_REQUESTS
            || self.status == StatusCode::REQUEST_TIMEOUT
    }
}

fn is_retryable(error: &anyhow::Error) -> bool {
    error.downcast_ref::<StatusError>().map_or(true, StatusError::is_retryable)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub attempt_timeout: Duration,
}

impl RetryPolicy {
    pub fn for_llm(config: &LlmConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
            attempt_timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    pub fn for_retrieval(config: &RetrievalConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(250),
            attempt_timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Runs `attempt` until it succeeds or `max_retries` extra attempts are spent.
    pub async fn run<T, F, Fut>(&self, operation: &'static str, mut attempt: F) -> Result<T>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T>> + Send,
        T: Send,
    {
        let mut delay = self.base_delay;
        let mut attempts = 0_u32;

        loop {
            attempts += 1;
            let outcome = match tokio::time::timeout(self.attempt_timeout, attempt()).await {
                Ok(result) => result,
                Err(_) => Err(anyhow!("{operation} timed out after {:?}", self.attempt_timeout)),
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(error) if !is_retryable(&error) => {
                    warn!(
                        event_name = "collaborator.rejected",
                        operation,
                        attempt = attempts,
                        error = %error,
                        "collaborator rejected the call, not retrying"
                    );
                    let message = format!("{operation} failed after {attempts} attempt(s)");
                    return Err(error.context(message));
                }
                Err(error) if attempts <= self.max_retries => {
                    warn!(
                        event_name = "collaborator.retry",
                        operation,
                        attempt = attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "collaborator call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    delay = delay.saturating_mul(2);
                }
                Err(error) => {
                    return Err(error.context(format!("{operation} failed after {attempts} attempt(s)")))
                }
            }
        }
    }
}

pub struct RetryingLlm<L> {
    inner: L,
    policy: RetryPolicy,
}

impl<L> RetryingLlm<L> {
    pub fn new(inner: L, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl<L: LlmClient> LlmClient for RetryingLlm<L> {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.policy.run("llm.generate", || self.inner.generate(prompt)).await
    }
}

pub struct RetryingRetriever<R> {
    inner: R,
    policy: RetryPolicy,
}

impl<R> RetryingRetriever<R> {
    pub fn new(inner: R, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl<R: Retriever> Retriever for RetryingRetriever<R> {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Passage>> {
        self.policy.run("retrieval.search", || self.inner.search(query, limit)).await
    }
}
