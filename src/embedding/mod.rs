//! Embedding providers
//!
//! [`EmbeddingProvider`] turns text into dense vectors for the vector index.
//! [`OpenAiEmbedder`] talks to any OpenAI-compatible `/embeddings` endpoint.

use crate::config::EmbeddingConfig;
use crate::{Result, SeekError};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Capability to embed text
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embeds a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| SeekError::Embedding("provider returned no embedding".to_string()))
    }

    /// Embeds many texts, returning one vector per input in input order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Length of the vectors this provider produces
    fn dimensions(&self) -> usize;
}

/// Embeddings client for OpenAI-compatible endpoints
///
/// Inputs are sent in groups of `batch_size`.
#[derive(Debug, Clone)]
pub struct OpenAiEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    dimensions: usize,
    batch_size: usize,
}

impl OpenAiEmbedder {
    /// Builds a client from configuration and an API key
    pub fn new(config: &EmbeddingConfig, api_key: &str) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(SeekError::Embedding("missing embedding API key".to_string()));
        }

        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bearer {}", api_key.trim()))
            .map_err(|_| SeekError::Embedding("invalid embedding API key".to_string()))?;
        headers.insert(AUTHORIZATION, auth);

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            dimensions: config.dimensions,
            batch_size: config.batch_size.max(1),
        })
    }

    async fn request_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: inputs,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| SeekError::Http {
                url: self.endpoint.clone(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(SeekError::Embedding(format!(
                "embeddings request failed ({}): {}",
                status, body
            )));
        }

        let mut parsed: EmbeddingResponse = response.json().await?;
        parsed.data.sort_by_key(|entry| entry.index);

        if parsed.data.len() != inputs.len() {
            return Err(SeekError::Embedding(format!(
                "provider returned {} embeddings for {} inputs",
                parsed.data.len(),
                inputs.len()
            )));
        }

        Ok(parsed.data.into_iter().map(|entry| entry.embedding).collect())
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.batch_size) {
            vectors.extend(self.request_batch(batch).await?);
        }

        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}
