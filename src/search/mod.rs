//! Hybrid search
//!
//! Chunks live in two backends: a vector index queried by embedding and a
//! lexical index queried by keywords. [`HybridSearcher`] queries both and
//! fuses the rankings by chunk id; [`Retriever`] adds optional LLM reranking
//! on top.

mod chroma;
mod elastic;
mod engine;
pub mod fusion;
mod retriever;

pub use chroma::ChromaIndex;
pub use elastic::ElasticIndex;
pub use engine::HybridSearcher;
pub use fusion::{fuse, FusionWeights};
pub use retriever::{LlmReranker, Reranker, Retriever};

use crate::storage::{Chunk, Metadata};
use crate::Result;
use async_trait::async_trait;
use serde::Serialize;

/// One ranked chunk
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub document_id: String,
    /// Join key between the two backends
    pub chunk_id: String,
    pub score: f32,
    pub text: String,
    pub metadata: Metadata,
}

/// Similarity search over chunk embeddings
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Stores chunks with their embeddings, one embedding per chunk
    async fn add(&self, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<()>;

    /// Returns up to `top_k` chunks, most similar first
    async fn query(&self, embedding: &[f32], top_k: usize) -> Result<Vec<SearchResult>>;
}

/// Keyword search over chunk text
#[async_trait]
pub trait LexicalIndex: Send + Sync {
    async fn index(&self, chunks: &[Chunk]) -> Result<()>;

    /// Returns up to `top_k` chunks, best match first
    async fn query(&self, text: &str, top_k: usize) -> Result<Vec<SearchResult>>;
}

/// Reads a string field out of chunk metadata
pub(crate) fn metadata_str(metadata: &Metadata, key: &str) -> String {
    metadata
        .get(key)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}
