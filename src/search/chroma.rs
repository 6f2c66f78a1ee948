//! Chroma vector index over its REST API

use crate::config::IndexConfig;
use crate::search::{metadata_str, SearchResult, VectorIndex};
use crate::storage::{Chunk, Metadata};
use crate::{Result, SeekError};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::OnceCell;

const BACKEND: &str = "chroma";

/// Vector index backed by a Chroma collection
///
/// The collection is created on first use. Record ids are chunk ids and
/// scores are `1 - distance`.
#[derive(Debug)]
pub struct ChromaIndex {
    client: Client,
    base_url: String,
    collection: String,
    collection_id: OnceCell<String>,
}

impl ChromaIndex {
    pub fn new(config: &IndexConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.chroma_url.trim_end_matches('/').to_string(),
            collection: config.collection.clone(),
            collection_id: OnceCell::new(),
        })
    }

    /// Resolves the collection id, creating the collection if needed
    async fn collection_id(&self) -> Result<&str> {
        let id = self
            .collection_id
            .get_or_try_init(|| async {
                let url = format!("{}/api/v1/collections", self.base_url);
                let body = json!({ "name": self.collection, "get_or_create": true });
                let collection: CollectionResponse = self.post(&url, &body).await?;
                tracing::info!("Chroma collection '{}' ready ({})", self.collection, collection.id);
                Ok::<_, SeekError>(collection.id)
            })
            .await?;

        Ok(id.as_str())
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| SeekError::Http {
                url: url.to_string(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(SeekError::Index {
                backend: BACKEND,
                message: format!("{} returned {}: {}", url, status, text),
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl VectorIndex for ChromaIndex {
    async fn add(&self, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<()> {
        if chunks.len() != embeddings.len() {
            return Err(SeekError::Index {
                backend: BACKEND,
                message: format!(
                    "{} chunks but {} embeddings",
                    chunks.len(),
                    embeddings.len()
                ),
            });
        }
        if chunks.is_empty() {
            return Ok(());
        }

        let id = self.collection_id().await?;
        let url = format!("{}/api/v1/collections/{}/add", self.base_url, id);

        let request = AddRequest {
            ids: chunks.iter().map(|c| c.id.as_str()).collect(),
            embeddings,
            documents: chunks.iter().map(|c| c.text.as_str()).collect(),
            metadatas: chunks.iter().map(record_metadata).collect(),
        };

        let _: Value = self.post(&url, &request).await?;
        tracing::debug!("Added {} chunks to Chroma", chunks.len());
        Ok(())
    }

    async fn query(&self, embedding: &[f32], top_k: usize) -> Result<Vec<SearchResult>> {
        let id = self.collection_id().await?;
        let url = format!("{}/api/v1/collections/{}/query", self.base_url, id);

        let body = json!({
            "query_embeddings": [embedding],
            "n_results": top_k,
            "include": ["documents", "metadatas", "distances"],
        });

        let response: QueryResponse = self.post(&url, &body).await?;
        Ok(response.into_results())
    }
}

/// Chunk metadata plus the join keys, flattened to Chroma's scalar values
fn record_metadata(chunk: &Chunk) -> Metadata {
    let mut metadata: Metadata = chunk
        .metadata
        .iter()
        .filter(|(_, v)| v.is_string() || v.is_number() || v.is_boolean())
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    metadata.insert("document_id".to_string(), json!(chunk.document_id));
    metadata.insert("chunk_id".to_string(), json!(chunk.id));
    metadata
}

#[derive(Serialize)]
struct AddRequest<'a> {
    ids: Vec<&'a str>,
    embeddings: &'a [Vec<f32>],
    documents: Vec<&'a str>,
    metadatas: Vec<Metadata>,
}

#[derive(Debug, Deserialize)]
struct CollectionResponse {
    id: String,
}

/// Column-oriented query response; the outer vectors have one entry per query
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct QueryResponse {
    ids: Vec<Vec<String>>,
    documents: Vec<Vec<Option<String>>>,
    metadatas: Vec<Vec<Option<Metadata>>>,
    distances: Vec<Vec<f32>>,
}

impl QueryResponse {
    fn into_results(self) -> Vec<SearchResult> {
        let ids = self.ids.into_iter().next().unwrap_or_default();
        let mut documents = self.documents.into_iter().next().unwrap_or_default().into_iter();
        let mut metadatas = self.metadatas.into_iter().next().unwrap_or_default().into_iter();
        let mut distances = self.distances.into_iter().next().unwrap_or_default().into_iter();

        ids.into_iter()
            .map(|chunk_id| {
                let text = documents.next().flatten().unwrap_or_default();
                let metadata = metadatas.next().flatten().unwrap_or_default();
                let distance = distances.next().unwrap_or(1.0);

                SearchResult {
                    document_id: metadata_str(&metadata, "document_id"),
                    chunk_id,
                    score: 1.0 - distance,
                    text,
                    metadata,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn index_for(server: &MockServer) -> ChromaIndex {
        ChromaIndex::new(&IndexConfig {
            chroma_url: server.uri(),
            collection: "docs".to_string(),
            ..IndexConfig::default()
        })
        .unwrap()
    }

    async fn mount_collection(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/api/v1/collections"))
            .and(body_partial_json(json!({"name": "docs", "get_or_create": true})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"id": "col-1", "name": "docs"})),
            )
            .expect(1)
            .mount(server)
            .await;
    }

    fn chunk(id: &str) -> Chunk {
        let mut metadata = Metadata::new();
        metadata.insert("title".to_string(), json!("Title"));
        metadata.insert("nested".to_string(), json!({"a": 1}));
        Chunk {
            id: id.to_string(),
            document_id: "doc-1".to_string(),
            chunk_index: 0,
            text: format!("text {}", id),
            metadata,
        }
    }

    #[test]
    fn test_record_metadata_keeps_scalars_and_join_keys() {
        let metadata = record_metadata(&chunk("c1"));
        assert_eq!(metadata.get("title"), Some(&json!("Title")));
        assert_eq!(metadata.get("chunk_id"), Some(&json!("c1")));
        assert_eq!(metadata.get("document_id"), Some(&json!("doc-1")));
        assert!(metadata.get("nested").is_none());
    }

    #[tokio::test]
    async fn test_add_creates_collection_once() {
        let server = MockServer::start().await;
        mount_collection(&server).await;
        Mock::given(method("POST"))
            .and(path("/api/v1/collections/col-1/add"))
            .and(body_partial_json(json!({"ids": ["c1"], "documents": ["text c1"]})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!(true)))
            .expect(2)
            .mount(&server)
            .await;

        let index = index_for(&server);
        index.add(&[chunk("c1")], &[vec![0.1, 0.2]]).await.unwrap();
        index.add(&[chunk("c1")], &[vec![0.1, 0.2]]).await.unwrap();
    }

    #[tokio::test]
    async fn test_add_rejects_mismatched_lengths() {
        let server = MockServer::start().await;
        let index = index_for(&server);
        let result = index.add(&[chunk("c1")], &[]).await;
        assert!(matches!(result, Err(SeekError::Index { backend: "chroma", .. })));
    }

    #[tokio::test]
    async fn test_query_converts_distance_to_similarity() {
        let server = MockServer::start().await;
        mount_collection(&server).await;
        Mock::given(method("POST"))
            .and(path("/api/v1/collections/col-1/query"))
            .and(body_partial_json(json!({"n_results": 4})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ids": [["c1", "c2"]],
                "documents": [["first", "second"]],
                "metadatas": [[{"document_id": "doc-1", "title": "T"}, null]],
                "distances": [[0.25, 0.5]]
            })))
            .mount(&server)
            .await;

        let index = index_for(&server);
        let results = index.query(&[0.1, 0.2], 4).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk_id, "c1");
        assert_eq!(results[0].document_id, "doc-1");
        assert_eq!(results[0].text, "first");
        assert!((results[0].score - 0.75).abs() < 1e-6);
        assert_eq!(results[1].document_id, "");
        assert!((results[1].score - 0.5).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_query_error_status() {
        let server = MockServer::start().await;
        mount_collection(&server).await;
        Mock::given(method("POST"))
            .and(path("/api/v1/collections/col-1/query"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let index = index_for(&server);
        assert!(index.query(&[0.1], 1).await.is_err());
    }
}
