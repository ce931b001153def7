use anyhow::{Context, Result};
use async_trait::async_trait;
use outreach_core::domain::context::Passage;
use reqwest::Client;
use serde::Serialize;

use crate::llm::ensure_success;

/// Retrieval collaborator: ranked passages for a free-text query.
///
/// An empty result is a normal answer, not an error.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Passage>>;
}

/// Stands in for a disabled document index.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopRetriever;

#[async_trait]
impl Retriever for NoopRetriever {
    async fn search(&self, _query: &str, _limit: usize) -> Result<Vec<Passage>> {
        Ok(Vec::new())
    }
}

/// Talks to a document-search service over `POST {base_url}/search`.
#[derive(Clone)]
pub struct HttpRetriever {
    client: Client,
    base_url: String,
}

impl HttpRetriever {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self { client: Client::new(), base_url: base_url.trim_end_matches('/').to_string() }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    limit: usize,
}

#[async_trait]
impl Retriever for HttpRetriever {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Passage>> {
        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .json(&SearchRequest { query, limit })
            .send()
            .await
            .context("retrieval request failed")?;

        let response = ensure_success(response, "retrieval service").await?;

        let mut passages: Vec<Passage> =
            response.json().await.context("retrieval response was not a passage list")?;
        passages.truncate(limit);
        Ok(passages)
    }
}
