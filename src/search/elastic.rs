//! Elasticsearch lexical index

use crate::config::IndexConfig;
use crate::search::{metadata_str, LexicalIndex, SearchResult};
use crate::storage::{Chunk, Metadata};
use crate::{Result, SeekError};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tokio::sync::OnceCell;

const BACKEND: &str = "elasticsearch";

/// BM25 index backed by an Elasticsearch index named after the collection
///
/// Documents are keyed by chunk id, so re-indexing a chunk overwrites it.
#[derive(Debug)]
pub struct ElasticIndex {
    client: Client,
    index_url: String,
    ready: OnceCell<()>,
}

impl ElasticIndex {
    pub fn new(config: &IndexConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            index_url: format!(
                "{}/{}",
                config.elastic_url.trim_end_matches('/'),
                config.collection
            ),
            ready: OnceCell::new(),
        })
    }

    /// Creates the index with its mapping unless it already exists
    async fn ensure_index(&self) -> Result<()> {
        self.ready
            .get_or_try_init(|| async {
                let exists = self
                    .client
                    .head(&self.index_url)
                    .send()
                    .await
                    .map_err(|e| self.http_error(&self.index_url, e))?;
                if exists.status().is_success() {
                    return Ok(());
                }

                let mapping = json!({
                    "mappings": {
                        "properties": {
                            "document_id": {"type": "keyword"},
                            "chunk_id": {"type": "keyword"},
                            "text": {"type": "text", "analyzer": "standard"},
                            "title": {"type": "text", "analyzer": "standard"},
                            "url": {"type": "keyword"},
                            "metadata": {"type": "object"}
                        }
                    }
                });

                let response = self
                    .client
                    .put(&self.index_url)
                    .json(&mapping)
                    .send()
                    .await
                    .map_err(|e| self.http_error(&self.index_url, e))?;

                // A concurrent creator wins with 400 resource_already_exists
                if response.status() == StatusCode::BAD_REQUEST {
                    let body = response.text().await.unwrap_or_default();
                    if body.contains("resource_already_exists_exception") {
                        return Ok(());
                    }
                    return Err(index_error(format!("index creation rejected: {}", body)));
                }

                check_status(response).await?;
                tracing::info!("Created Elasticsearch index {}", self.index_url);
                Ok::<_, SeekError>(())
            })
            .await?;

        Ok(())
    }

    fn http_error(&self, url: &str, source: reqwest::Error) -> SeekError {
        SeekError::Http {
            url: url.to_string(),
            source,
        }
    }
}

#[async_trait]
impl LexicalIndex for ElasticIndex {
    async fn index(&self, chunks: &[Chunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }
        self.ensure_index().await?;

        for chunk in chunks {
            let url = format!("{}/_doc/{}", self.index_url, chunk.id);
            let doc = IndexedChunk {
                document_id: &chunk.document_id,
                chunk_id: &chunk.id,
                text: &chunk.text,
                title: metadata_str(&chunk.metadata, "title"),
                url: metadata_str(&chunk.metadata, "url"),
                metadata: &chunk.metadata,
            };

            let response = self
                .client
                .put(&url)
                .json(&doc)
                .send()
                .await
                .map_err(|e| self.http_error(&url, e))?;
            check_status(response).await?;
        }

        tracing::debug!("Indexed {} chunks in Elasticsearch", chunks.len());
        Ok(())
    }

    async fn query(&self, text: &str, top_k: usize) -> Result<Vec<SearchResult>> {
        let url = format!("{}/_search", self.index_url);
        let body = json!({
            "query": {
                "multi_match": {
                    "query": text,
                    "fields": ["text^2", "title^1.5"]
                }
            },
            "size": top_k
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.http_error(&url, e))?;

        // Nothing indexed yet
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }

        let response: SearchResponse = check_status(response).await?.json().await?;

        Ok(response
            .hits
            .hits
            .into_iter()
            .map(|hit| {
                let chunk_id = if hit.source.chunk_id.is_empty() {
                    hit.id
                } else {
                    hit.source.chunk_id
                };
                SearchResult {
                    document_id: hit.source.document_id,
                    chunk_id,
                    score: hit.score.unwrap_or(0.0) as f32,
                    text: hit.source.text,
                    metadata: hit.source.metadata,
                }
            })
            .collect())
    }
}

fn index_error(message: String) -> SeekError {
    SeekError::Index {
        backend: BACKEND,
        message,
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();
    Err(index_error(format!("{} returned {}: {}", url, status, body)))
}

#[derive(Serialize)]
struct IndexedChunk<'a> {
    document_id: &'a str,
    chunk_id: &'a str,
    text: &'a str,
    title: String,
    url: String,
    metadata: &'a Metadata,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: Hits,
}

#[derive(Debug, Deserialize)]
struct Hits {
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_score")]
    score: Option<f64>,
    #[serde(rename = "_source")]
    source: HitSource,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct HitSource {
    document_id: String,
    chunk_id: String,
    text: String,
    metadata: Metadata,
}
