//! Hybrid search engine

use crate::config::{FusionPolicy, SearchConfig};
use crate::embedding::EmbeddingProvider;
use crate::search::fusion::{fuse, FusionWeights};
use crate::search::{LexicalIndex, SearchResult, VectorIndex};
use crate::{Result, SeekError};
use std::sync::Arc;

/// Queries the vector and lexical indexes concurrently and fuses the results
#[derive(Clone)]
pub struct HybridSearcher {
    embedder: Arc<dyn EmbeddingProvider>,
    vector: Arc<dyn VectorIndex>,
    lexical: Arc<dyn LexicalIndex>,
    weights: FusionWeights,
    policy: FusionPolicy,
}

impl HybridSearcher {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        vector: Arc<dyn VectorIndex>,
        lexical: Arc<dyn LexicalIndex>,
        config: &SearchConfig,
    ) -> Self {
        Self {
            embedder,
            vector,
            lexical,
            weights: FusionWeights::from(config),
            policy: config.fusion,
        }
    }

    /// Returns at most `limit` fused results, best first
    ///
    /// Each backend is asked for `2 * limit` candidates. A failing backend is
    /// logged and contributes nothing; the search fails only when both do.
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let candidates = limit.saturating_mul(2);

        let vector = async {
            let embedding = self.embedder.embed(query).await?;
            self.vector.query(&embedding, candidates).await
        };
        let lexical = self.lexical.query(query, candidates);

        let (vector, lexical) = tokio::join!(vector, lexical);

        let (vector, lexical) = match (vector, lexical) {
            (Ok(v), Ok(l)) => (v, l),
            (Ok(v), Err(e)) => {
                tracing::warn!("Lexical search failed, using vector results only: {}", e);
                (v, Vec::new())
            }
            (Err(e), Ok(l)) => {
                tracing::warn!("Vector search failed, using lexical results only: {}", e);
                (Vec::new(), l)
            }
            (Err(vector_err), Err(lexical_err)) => {
                return Err(SeekError::Search(format!(
                    "both backends failed (vector: {}; lexical: {})",
                    vector_err, lexical_err
                )));
            }
        };

        tracing::debug!(
            "Query {:?}: {} vector and {} lexical candidates",
            query,
            vector.len(),
            lexical.len()
        );

        Ok(fuse(vector, lexical, self.weights, self.policy, limit))
    }
}
