//! Fake collaborators for exercising stages and the pipeline without a network.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use outreach_core::domain::context::Passage;

use crate::llm::LlmClient;
use crate::retrieval::Retriever;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Answers prompts from a fixed script, in call order.
///
/// Once the script runs out the last response repeats; an empty script fails
/// every call.
#[derive(Debug, Default)]
pub struct ScriptedLlm {
    responses: Mutex<VecDeque<String>>,
    last: Mutex<Option<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            last: Mutex::new(None),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn repeating(response: impl Into<String>) -> Self {
        Self::new(vec![response.into()])
    }

    /// Every prompt received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn generate(&self, prompt: &str) -> Result<String> {
        lock(&self.prompts).push(prompt.to_string());

        let next = lock(&self.responses).pop_front();
        let mut last = lock(&self.last);
        match next {
            Some(response) => {
                *last = Some(response.clone());
                Ok(response)
            }
            None => last.clone().ok_or_else(|| anyhow!("scripted llm has no responses")),
        }
    }
}

#[derive(Debug)]
pub struct FailingLlm {
    message: String,
    calls: AtomicUsize,
}

impl FailingLlm {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), calls: AtomicUsize::new(0) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmClient for FailingLlm {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(anyhow!("{}", self.message))
    }
}

/// Returns the same passages for every query and records what was asked.
#[derive(Debug, Default)]
pub struct StaticRetriever {
    passages: Vec<Passage>,
    queries: Mutex<Vec<(String, usize)>>,
}

impl StaticRetriever {
    pub fn new(passages: Vec<Passage>) -> Self {
        Self { passages, queries: Mutex::new(Vec::new()) }
    }

    pub fn queries(&self) -> Vec<(String, usize)> {
        lock(&self.queries).clone()
    }
}

#[async_trait]
impl Retriever for StaticRetriever {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Passage>> {
        lock(&self.queries).push((query.to_string(), limit));
        Ok(self.passages.iter().take(limit).cloned().collect())
    }
}

#[derive(Debug)]
pub struct FailingRetriever {
    message: String,
}

impl FailingRetriever {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

#[async_trait]
impl Retriever for FailingRetriever {
    async fn search(&self, _query: &str, _limit: usize) -> Result<Vec<Passage>> {
        Err(anyhow!("{}", self.message))
    }
}

#[cfg(test)]
mod tests {
    use crate::llm::LlmClient;

    use super::ScriptedLlm;

    #[tokio::test]
    async fn scripted_llm_repeats_its_last_response() {
        let llm = ScriptedLlm::new(vec!["first".to_string(), "second".to_string()]);

        let answers = [
            llm.generate("a").await.ok(),
            llm.generate("b").await.ok(),
            llm.generate("c").await.ok(),
        ];

        assert_eq!(answers, [Some("first".to_string()), Some("second".to_string()), Some("second".to_string())]);
        assert_eq!(llm.prompts(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn empty_script_fails() {
        assert!(ScriptedLlm::default().generate("a").await.is_err());
    }
}
