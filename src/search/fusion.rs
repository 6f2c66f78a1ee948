//! Score fusion of vector and lexical rankings
//!
//! Results are joined on `chunk_id`. Two policies are available:
//!
//! - [`FusionPolicy::Sequential`] walks the vector list, then the lexical
//!   list. The first sighting of a chunk stores `score * own_weight`; every
//!   later sighting replaces it with
//!   `existing * other_weight + incoming * own_weight`. The blend is
//!   asymmetric: with the default weights a chunk found by both backends with
//!   scores 0.9 and 0.6 ends at `0.63 * 0.7 + 0.6 * 0.3 = 0.621`.
//! - [`FusionPolicy::Linear`] scores each chunk as
//!   `vector * vector_weight + lexical * lexical_weight`, a missing side
//!   contributing zero.

use crate::config::{FusionPolicy, SearchConfig};
use crate::search::SearchResult;
use std::collections::HashMap;

/// Per-backend weights
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionWeights {
    pub vector: f32,
    pub lexical: f32,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            vector: 0.7,
            lexical: 0.3,
        }
    }
}

impl From<&SearchConfig> for FusionWeights {
    fn from(config: &SearchConfig) -> Self {
        Self {
            vector: config.vector_weight,
            lexical: config.lexical_weight,
        }
    }
}

/// Merges both rankings into at most `limit` results, best first
///
/// Ties keep first-seen order, vector results before lexical ones.
pub fn fuse(
    vector: Vec<SearchResult>,
    lexical: Vec<SearchResult>,
    weights: FusionWeights,
    policy: FusionPolicy,
    limit: usize,
) -> Vec<SearchResult> {
    let mut merged = match policy {
        FusionPolicy::Sequential => sequential(vector, lexical, weights),
        FusionPolicy::Linear => linear(vector, lexical, weights),
    };

    merged.sort_by(|a, b| b.score.total_cmp(&a.score));
    merged.truncate(limit);
    merged
}

fn sequential(
    vector: Vec<SearchResult>,
    lexical: Vec<SearchResult>,
    weights: FusionWeights,
) -> Vec<SearchResult> {
    let mut merged: Vec<SearchResult> = Vec::with_capacity(vector.len() + lexical.len());
    let mut positions: HashMap<String, usize> = HashMap::new();

    let passes = [
        (vector, weights.vector, weights.lexical),
        (lexical, weights.lexical, weights.vector),
    ];

    for (results, own, other) in passes {
        for mut result in results {
            match positions.get(&result.chunk_id) {
                Some(&i) => {
                    let existing = &mut merged[i];
                    existing.score = existing.score * other + result.score * own;
                }
                None => {
                    result.score *= own;
                    positions.insert(result.chunk_id.clone(), merged.len());
                    merged.push(result);
                }
            }
        }
    }

    merged
}

fn linear(
    vector: Vec<SearchResult>,
    lexical: Vec<SearchResult>,
    weights: FusionWeights,
) -> Vec<SearchResult> {
    // (result, vector score, lexical score); the first sighting per side wins
    let mut merged: Vec<(SearchResult, Option<f32>, Option<f32>)> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for (results, is_vector) in [(vector, true), (lexical, false)] {
        for result in results {
            let score = result.score;
            let i = match positions.get(&result.chunk_id) {
                Some(&i) => i,
                None => {
                    positions.insert(result.chunk_id.clone(), merged.len());
                    merged.push((result, None, None));
                    merged.len() - 1
                }
            };

            let slot = if is_vector {
                &mut merged[i].1
            } else {
                &mut merged[i].2
            };
            slot.get_or_insert(score);
        }
    }

    merged
        .into_iter()
        .map(|(mut result, v, l)| {
            result.score = v.unwrap_or(0.0) * weights.vector + l.unwrap_or(0.0) * weights.lexical;
            result
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Metadata;

    fn result(chunk_id: &str, score: f32) -> SearchResult {
        SearchResult {
            document_id: format!("doc-{}", chunk_id),
            chunk_id: chunk_id.to_string(),
            score,
            text: format!("text of {}", chunk_id),
            metadata: Metadata::new(),
        }
    }

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_sequential_blend_of_shared_chunk() {
        let fused = fuse(
            vec![result("c1", 0.9)],
            vec![result("c1", 0.6)],
            FusionWeights::default(),
            FusionPolicy::Sequential,
            10,
        );

        assert_eq!(fused.len(), 1);
        assert!(close(fused[0].score, 0.621), "got {}", fused[0].score);
    }

    #[test]
    fn test_disjoint_results_keep_single_weighted_scores() {
        let fused = fuse(
            vec![result("v1", 0.8), result("v2", 0.4)],
            vec![result("l1", 1.0)],
            FusionWeights::default(),
            FusionPolicy::Sequential,
            10,
        );

        let ids: Vec<&str> = fused.iter().map(|r| r.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["v1", "l1", "v2"]);
        assert!(close(fused[0].score, 0.56));
        assert!(close(fused[1].score, 0.3));
        assert!(close(fused[2].score, 0.28));
    }

    #[test]
    fn test_linear_is_symmetric() {
        let weights = FusionWeights::default();
        let fused = fuse(
            vec![result("c1", 0.9), result("c2", 0.5)],
            vec![result("c1", 0.6)],
            weights,
            FusionPolicy::Linear,
            10,
        );

        assert!(close(fused[0].score, 0.9 * 0.7 + 0.6 * 0.3));
        assert!(close(fused[1].score, 0.5 * 0.7));
    }

    #[test]
    fn test_truncates_to_limit_sorted_descending() {
        let vector: Vec<SearchResult> = (0..10)
            .map(|i| result(&format!("c{}", i), i as f32 / 10.0))
            .collect();

        let fused = fuse(
            vector,
            Vec::new(),
            FusionWeights::default(),
            FusionPolicy::Sequential,
            3,
        );

        assert_eq!(fused.len(), 3);
        assert!(fused.windows(2).all(|w| w[0].score >= w[1].score));
        assert_eq!(fused[0].chunk_id, "c9");
    }

    #[test]
    fn test_empty_inputs() {
        let fused = fuse(
            Vec::new(),
            Vec::new(),
            FusionWeights::default(),
            FusionPolicy::Linear,
            5,
        );
        assert!(fused.is_empty());
    }

    #[test]
    fn test_weights_from_config() {
        let config = SearchConfig {
            vector_weight: 0.5,
            lexical_weight: 0.5,
            ..SearchConfig::default()
        };
        assert_eq!(
            FusionWeights::from(&config),
            FusionWeights {
                vector: 0.5,
                lexical: 0.5
            }
        );
    }
}
