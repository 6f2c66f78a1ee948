//! Retrieval with optional background reranking

use crate::llm::LanguageModel;
use crate::search::{HybridSearcher, SearchResult};
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Reorders search results by relevance to a query
#[async_trait]
pub trait Reranker: Send + Sync {
    async fn rerank(&self, query: &str, results: &[SearchResult]) -> Result<Vec<SearchResult>>;
}

/// [`Reranker`] that asks a language model for the order
pub struct LlmReranker {
    model: Arc<dyn LanguageModel>,
}

impl LlmReranker {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl Reranker for LlmReranker {
    async fn rerank(&self, query: &str, results: &[SearchResult]) -> Result<Vec<SearchResult>> {
        let texts: Vec<String> = results.iter().map(|r| r.text.clone()).collect();
        let order = self.model.rerank_order(query, &texts).await?;
        Ok(order.into_iter().map(|i| results[i].clone()).collect())
    }
}

/// Front door for queries from the CLI and the HTTP API
#[derive(Clone)]
pub struct Retriever {
    searcher: HybridSearcher,
    reranker: Option<Arc<dyn Reranker>>,
    rerank_timeout: Duration,
}

impl Retriever {
    pub fn new(searcher: HybridSearcher) -> Self {
        Self {
            searcher,
            reranker: None,
            rerank_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_reranker(mut self, reranker: Arc<dyn Reranker>, timeout: Duration) -> Self {
        self.reranker = Some(reranker);
        self.rerank_timeout = timeout;
        self
    }

    /// Returns at most `limit` results in fused order
    ///
    /// With a reranker configured, a detached task reranks the `2 * limit`
    /// candidates under its own timeout. Its outcome is logged only; the
    /// response never waits for it and is unaffected by its failure.
    pub async fn retrieve(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        let mut results = self.searcher.search(query, limit.saturating_mul(2)).await?;

        if let Some(reranker) = &self.reranker {
            if !results.is_empty() {
                spawn_rerank(
                    Arc::clone(reranker),
                    query.to_string(),
                    results.clone(),
                    self.rerank_timeout,
                );
            }
        }

        results.truncate(limit);
        Ok(results)
    }
}

fn spawn_rerank(
    reranker: Arc<dyn Reranker>,
    query: String,
    candidates: Vec<SearchResult>,
    timeout: Duration,
) {
    tokio::spawn(async move {
        match tokio::time::timeout(timeout, reranker.rerank(&query, &candidates)).await {
            Ok(Ok(reranked)) => {
                tracing::debug!("Reranked {} results for {:?}", reranked.len(), query);
            }
            Ok(Err(e)) => tracing::warn!("Reranking failed for {:?}: {}", query, e),
            Err(_) => tracing::warn!("Reranking timed out after {:?} for {:?}", timeout, query),
        }
    });
}
