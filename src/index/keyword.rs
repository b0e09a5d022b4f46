//! Sparse lexical index with BM25 (Okapi) ranking.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

use crate::types::{Chunk, SearchResult};

const K1: f32 = 1.5;
const B: f32 = 0.75;
/// Floor factor for negative IDF values: terms occurring in more than half
/// the corpus are clamped to `EPSILON * average_idf` instead of scoring
/// negatively.
const EPSILON: f32 = 0.25;

/// Punctuation stripped from token edges.
const TOKEN_TRIM: &[char] = &[
    '.', ',', '!', '?', ';', ':', '(', ')', '[', ']', '{', '}', '"', '\'', '-',
];

/// Lowercases, splits on whitespace, strips edge punctuation, and drops
/// empty tokens. Queries and documents must pass through the same path.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(|token| token.trim_matches(|c| TOKEN_TRIM.contains(&c)))
        .filter(|token| !token.is_empty())
        .map(|token| token.to_string())
        .collect()
}

/// BM25-Okapi statistics over a tokenized corpus.
struct Bm25 {
    doc_term_freqs: Vec<HashMap<String, usize>>,
    doc_lens: Vec<usize>,
    avgdl: f32,
    idf: HashMap<String, f32>,
}

impl Bm25 {
    fn fit(corpus: &[Vec<String>]) -> Self {
        let doc_lens: Vec<usize> = corpus.iter().map(|tokens| tokens.len()).collect();
        let total: usize = doc_lens.iter().sum();
        let avgdl = total as f32 / corpus.len() as f32;

        let mut doc_term_freqs = Vec::with_capacity(corpus.len());
        let mut doc_counts: HashMap<String, usize> = HashMap::new();
        for tokens in corpus {
            let mut freqs: HashMap<String, usize> = HashMap::new();
            for token in tokens {
                *freqs.entry(token.clone()).or_insert(0) += 1;
            }
            for term in freqs.keys() {
                *doc_counts.entry(term.clone()).or_insert(0) += 1;
            }
            doc_term_freqs.push(freqs);
        }

        // Standard Okapi IDF, with negative values floored to a small
        // positive epsilon of the average so very common terms still
        // contribute rather than subtracting relevance.
        let n = corpus.len() as f32;
        let mut idf: HashMap<String, f32> = HashMap::with_capacity(doc_counts.len());
        let mut idf_sum = 0.0f32;
        let mut negative: Vec<String> = Vec::new();
        for (term, df) in &doc_counts {
            let value = ((n - *df as f32 + 0.5) / (*df as f32 + 0.5)).ln();
            idf_sum += value;
            if value < 0.0 {
                negative.push(term.clone());
            }
            idf.insert(term.clone(), value);
        }
        let average_idf = idf_sum / idf.len().max(1) as f32;
        let floor = EPSILON * average_idf;
        for term in negative {
            idf.insert(term, floor);
        }

        Self {
            doc_term_freqs,
            doc_lens,
            avgdl,
            idf,
        }
    }

    /// BM25 score of every indexed document against the query tokens, in
    /// storage order.
    fn scores(&self, query_tokens: &[String]) -> Vec<f32> {
        (0..self.doc_term_freqs.len())
            .map(|i| {
                let freqs = &self.doc_term_freqs[i];
                let norm = 1.0 - B + B * self.doc_lens[i] as f32 / self.avgdl;
                query_tokens
                    .iter()
                    .map(|token| {
                        let tf = *freqs.get(token).unwrap_or(&0) as f32;
                        if tf == 0.0 {
                            return 0.0;
                        }
                        let idf = *self.idf.get(token).unwrap_or(&0.0);
                        idf * tf * (K1 + 1.0) / (tf + K1 * norm)
                    })
                    .sum()
            })
            .collect()
    }
}

/// Keyword-index statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordIndexStats {
    pub total_documents: usize,
    pub avg_tokens_per_doc: usize,
}

/// BM25-ranked lexical index over chunk text.
///
/// Holds its own chunk sequence, independent of the vector index's; the
/// two may legitimately differ when built from different calls.
#[derive(Default)]
pub struct KeywordIndex {
    chunks: Vec<Chunk>,
    tokenized_corpus: Vec<Vec<String>>,
    bm25: Option<Bm25>,
}

impl KeywordIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Tokenizes every chunk and replaces the corpus and ranking structure
    /// atomically. Zero chunks leave the ranking structure absent.
    pub fn build(&mut self, chunks: Vec<Chunk>) {
        info!(chunks = chunks.len(), "building keyword index");

        let tokenized_corpus: Vec<Vec<String>> = chunks
            .iter()
            .map(|chunk| tokenize(&chunk.content))
            .collect();
        let bm25 = if chunks.is_empty() {
            None
        } else {
            Some(Bm25::fit(&tokenized_corpus))
        };

        self.chunks = chunks;
        self.tokenized_corpus = tokenized_corpus;
        self.bm25 = bm25;
        info!(documents = self.chunks.len(), "keyword index built");
    }

    /// Scores every indexed chunk against the query and returns the
    /// `top_k` best, descending, with ties broken by storage order.
    /// Non-positive scores are not results. An unbuilt or empty index
    /// yields an empty result immediately.
    pub fn search(&self, query: &str, top_k: usize) -> Vec<SearchResult> {
        let Some(bm25) = &self.bm25 else {
            return Vec::new();
        };
        if top_k == 0 {
            return Vec::new();
        }

        let query_tokens = tokenize(query);
        let scores = bm25.scores(&query_tokens);

        let mut ranked: Vec<(usize, f32)> = scores.into_iter().enumerate().collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });

        ranked
            .into_iter()
            .filter(|(_, score)| *score > 0.0)
            .take(top_k)
            .map(|(i, score)| SearchResult::new(self.chunks[i].clone(), score))
            .collect()
    }

    pub fn stats(&self) -> KeywordIndexStats {
        let avg_tokens_per_doc = if self.tokenized_corpus.is_empty() {
            0
        } else {
            self.tokenized_corpus
                .iter()
                .map(|tokens| tokens.len())
                .sum::<usize>()
                / self.tokenized_corpus.len()
        };
        KeywordIndexStats {
            total_documents: self.chunks.len(),
            avg_tokens_per_doc,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChunkMetadata;
    use chrono::Utc;

    fn chunk(id: usize, content: &str) -> Chunk {
        Chunk {
            content: content.to_string(),
            metadata: ChunkMetadata {
                source: "corpus.txt".into(),
                file_name: "corpus.txt".into(),
                file_type: ".txt".into(),
                loaded_at: Utc::now(),
                chunk_id: id,
                total_chunks: 4,
                chunk_size: content.chars().count(),
            },
        }
    }

    fn built_index() -> KeywordIndex {
        let mut index = KeywordIndex::new();
        index.build(vec![
            chunk(0, "The quick brown fox jumps over the lazy dog"),
            chunk(1, "Paris is the capital of France"),
            chunk(2, "Rust guarantees memory safety without garbage collection"),
            chunk(3, "The dog sleeps all day long"),
        ]);
        index
    }

    #[test]
    fn tokenizer_lowercases_and_strips_edge_punctuation() {
        assert_eq!(
            tokenize("Hello, World! (really)"),
            vec!["hello", "world", "really"]
        );
        assert_eq!(tokenize("'quoted' -- dashes-"), vec!["quoted", "dashes"]);
        assert!(tokenize("... !!! ---").is_empty());
    }

    #[test]
    fn unbuilt_index_returns_empty() {
        let index = KeywordIndex::new();
        assert!(index.search("anything", 5).is_empty());
    }

    #[test]
    fn empty_build_returns_empty() {
        let mut index = KeywordIndex::new();
        index.build(Vec::new());
        assert!(index.search("anything", 5).is_empty());
        assert!(index.is_empty());
    }

    #[test]
    fn no_term_overlap_yields_no_results() {
        let index = built_index();
        assert!(index.search("quantum chromodynamics", 5).is_empty());
    }

    #[test]
    fn unique_match_ranks_first() {
        let index = built_index();
        let results = index.search("capital of France", 5);
        assert!(!results.is_empty());
        assert_eq!(
            results[0].chunk.content,
            "Paris is the capital of France"
        );
    }

    #[test]
    fn scores_descend_and_stay_positive() {
        let index = built_index();
        let results = index.search("the dog", 10);
        assert!(results.len() >= 2);
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        for result in &results {
            assert!(result.score > 0.0);
        }
    }

    #[test]
    fn ties_keep_storage_order() {
        let mut index = KeywordIndex::new();
        index.build(vec![
            chunk(0, "apple banana"),
            chunk(1, "apple banana"),
            chunk(2, "cherry"),
            chunk(3, "durian"),
            chunk(4, "elderberry"),
        ]);
        let results = index.search("apple", 3);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.metadata.chunk_id, 0);
        assert_eq!(results[1].chunk.metadata.chunk_id, 1);
        assert!((results[0].score - results[1].score).abs() < 1e-6);
    }

    #[test]
    fn top_k_truncates() {
        let index = built_index();
        let results = index.search("the", 1);
        assert!(results.len() <= 1);
    }

    #[test]
    fn rebuild_is_idempotent() {
        let mut index = built_index();
        let first = index.search("memory safety", 5);
        assert!(!first.is_empty());
        index.build(vec![
            chunk(0, "The quick brown fox jumps over the lazy dog"),
            chunk(1, "Paris is the capital of France"),
            chunk(2, "Rust guarantees memory safety without garbage collection"),
            chunk(3, "The dog sleeps all day long"),
        ]);
        let second = index.search("memory safety", 5);
        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.chunk.content, b.chunk.content);
            assert!((a.score - b.score).abs() < 1e-6);
        }
    }

    #[test]
    fn stats_average_token_count() {
        let index = built_index();
        let stats = index.stats();
        assert_eq!(stats.total_documents, 4);
        assert!(stats.avg_tokens_per_doc > 0);
    }
}
