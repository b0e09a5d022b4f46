//! Fusing dense and lexical rankings into one ordered result set.

use std::collections::HashMap;
use tracing::info;

use crate::error::Result;
use crate::index::{KeywordIndex, VectorIndex};
use crate::types::{Chunk, SearchResult};

/// Smoothing constant in the reciprocal-rank denominator.
pub const DEFAULT_RRF_K: f32 = 60.0;

/// How sub-search rankings are combined.
///
/// RRF is rank-based and robust to incomparable score scales; the weighted
/// sum preserves score magnitudes that RRF discards. Callers pick per
/// search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FusionMode {
    #[default]
    ReciprocalRank,
    WeightedScore,
}

/// Orchestrates both indexes and merges their ranked lists.
#[derive(Debug, Clone)]
pub struct HybridSearch {
    vector_weight: f32,
    keyword_weight: f32,
    vector_top_k: usize,
    keyword_top_k: usize,
    rrf_k: f32,
}

impl HybridSearch {
    /// Creates a fusion engine with the given per-source weights and
    /// candidate depths. Depths are typically larger than the final
    /// `top_k` so fusion has enough candidates to reorder.
    pub fn new(
        vector_weight: f32,
        keyword_weight: f32,
        vector_top_k: usize,
        keyword_top_k: usize,
    ) -> Self {
        Self {
            vector_weight,
            keyword_weight,
            vector_top_k,
            keyword_top_k,
            rrf_k: DEFAULT_RRF_K,
        }
    }

    #[must_use]
    pub fn with_rrf_k(mut self, rrf_k: f32) -> Self {
        self.rrf_k = rrf_k;
        self
    }

    /// Runs both sub-searches and fuses their rankings.
    ///
    /// A sub-search error propagates immediately; a legitimately empty
    /// sub-result is not an error and fuses with the other list alone.
    pub async fn search(
        &self,
        vector: &VectorIndex,
        keyword: &KeywordIndex,
        query: &str,
        top_k: usize,
        mode: FusionMode,
    ) -> Result<Vec<SearchResult>> {
        let vector_results = vector.search(query, self.vector_top_k).await?;
        let keyword_results = keyword.search(query, self.keyword_top_k);

        info!(
            vector_results = vector_results.len(),
            keyword_results = keyword_results.len(),
            ?mode,
            "fusing sub-search results"
        );

        let fused = match mode {
            FusionMode::ReciprocalRank => self.reciprocal_rank_fusion(&vector_results, &keyword_results),
            FusionMode::WeightedScore => self.weighted_fusion(&vector_results, &keyword_results),
        };
        Ok(truncate(fused, top_k))
    }

    /// Reciprocal Rank Fusion: each list contributes
    /// `weight / (rrf_k + rank)` per chunk at its 1-based rank, summed per
    /// chunk identity across both lists.
    pub fn reciprocal_rank_fusion(
        &self,
        vector_results: &[SearchResult],
        keyword_results: &[SearchResult],
    ) -> Vec<SearchResult> {
        let mut fused = FusedScores::default();
        for (rank, result) in vector_results.iter().enumerate() {
            fused.add(
                &result.chunk,
                self.vector_weight / (self.rrf_k + (rank + 1) as f32),
            );
        }
        for (rank, result) in keyword_results.iter().enumerate() {
            fused.add(
                &result.chunk,
                self.keyword_weight / (self.rrf_k + (rank + 1) as f32),
            );
        }
        fused.into_ranked()
    }

    /// Weighted score combination: raw sub-search scores scaled by the
    /// per-source weight and summed per chunk identity, without rank
    /// normalization.
    pub fn weighted_fusion(
        &self,
        vector_results: &[SearchResult],
        keyword_results: &[SearchResult],
    ) -> Vec<SearchResult> {
        let mut fused = FusedScores::default();
        for result in vector_results {
            fused.add(&result.chunk, self.vector_weight * result.score);
        }
        for result in keyword_results {
            fused.add(&result.chunk, self.keyword_weight * result.score);
        }
        fused.into_ranked()
    }
}

impl Default for HybridSearch {
    fn default() -> Self {
        Self::new(0.7, 0.3, 10, 10)
    }
}

/// Score accumulator deduplicating by chunk content.
///
/// Two chunks with identical text are one entity here, so near-duplicate
/// passages are never double-counted. The content itself is the identity,
/// stable across processes.
#[derive(Default)]
struct FusedScores {
    entries: Vec<(Chunk, f32)>,
    by_content: HashMap<String, usize>,
}

impl FusedScores {
    fn add(&mut self, chunk: &Chunk, contribution: f32) {
        match self.by_content.get(&chunk.content) {
            Some(&i) => self.entries[i].1 += contribution,
            None => {
                self.by_content
                    .insert(chunk.content.clone(), self.entries.len());
                self.entries.push((chunk.clone(), contribution));
            }
        }
    }

    /// Descending by fused score, first-seen order on ties; non-positive
    /// totals are dropped entirely (a zero-weight source must not smuggle
    /// its chunks into the output).
    fn into_ranked(self) -> Vec<SearchResult> {
        let mut entries = self.entries;
        entries.retain(|(_, score)| *score > 0.0);
        entries.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        entries
            .into_iter()
            .map(|(chunk, score)| SearchResult::new(chunk, score))
            .collect()
    }
}

fn truncate(mut results: Vec<SearchResult>, top_k: usize) -> Vec<SearchResult> {
    results.truncate(top_k);
    results
}
