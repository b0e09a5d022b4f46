//! Brute-force dense index over chunk embeddings.
//!
//! Distances are squared L2, the flat-index convention; ranking is
//! unaffected by skipping the square root, and scores are converted to
//! similarities before leaving this module.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tracing::info;

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::types::{Chunk, SearchResult};

/// On-disk artifact holding the search structure: dimensionality plus the
/// embedding matrix, row `i` matching chunk `i` of the companion artifact.
#[derive(Serialize, Deserialize)]
struct VectorArtifact {
    dimension: usize,
    vectors: Vec<Vec<f32>>,
}

/// Vector-store statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorIndexStats {
    pub total_vectors: usize,
    pub dimension: usize,
    pub total_documents: usize,
}

/// Exact nearest-neighbor index: an ordered chunk sequence and a parallel
/// embedding sequence, scanned linearly at query time.
///
/// Position `i` in both sequences refers to the same logical entry; the
/// pair is only ever replaced as a unit.
pub struct VectorIndex {
    embedder: Arc<dyn EmbeddingProvider>,
    chunks: Vec<Chunk>,
    embeddings: Vec<Vec<f32>>,
}

impl std::fmt::Debug for VectorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorIndex")
            .field("chunks", &self.chunks)
            .field("embeddings", &self.embeddings)
            .finish_non_exhaustive()
    }
}

impl VectorIndex {
    /// Creates an empty index bound to an embedding provider. The
    /// provider's dimensionality governs every vector stored here.
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            embedder,
            chunks: Vec::new(),
            embeddings: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.embedder.dim()
    }

    /// The indexed chunk sequence, in storage order.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Embeds every chunk and replaces the stored chunk and embedding
    /// sequences as one unit. Not incremental: the full chunk set is
    /// re-indexed on every call. An embedding failure leaves the previous
    /// state untouched.
    pub async fn build(&mut self, chunks: Vec<Chunk>) -> Result<()> {
        info!(chunks = chunks.len(), "building vector index");

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.content.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != chunks.len() {
            return Err(RagError::Embedding(format!(
                "provider returned {} vectors for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }
        let dim = self.embedder.dim();
        for vector in &embeddings {
            if vector.len() != dim {
                return Err(RagError::Embedding(format!(
                    "dimensionality mismatch: expected {dim}, got {}",
                    vector.len()
                )));
            }
        }

        self.chunks = chunks;
        self.embeddings = embeddings;
        info!(vectors = self.embeddings.len(), "vector index built");
        Ok(())
    }

    /// Embeds the query and returns the `top_k` nearest chunks, scored by
    /// `1 / (1 + d)` where `d` is squared L2 distance. Ties keep storage
    /// order. An empty index yields an empty result, not an error.
    pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchResult>> {
        if self.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed(query).await?;

        let mut distances: Vec<(usize, f32)> = self
            .embeddings
            .iter()
            .enumerate()
            .map(|(i, vector)| (i, l2_squared(&query_embedding, vector)))
            .collect();
        distances.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        distances.truncate(top_k);

        Ok(distances
            .into_iter()
            .map(|(i, distance)| {
                SearchResult::new(self.chunks[i].clone(), 1.0 / (1.0 + distance))
            })
            .collect())
    }

    /// Persists the embedding matrix and the parallel chunk sequence as a
    /// pair of artifacts. Both must later be loaded together.
    pub async fn save(&self, vectors_path: &Path, chunks_path: &Path) -> Result<()> {
        let artifact = VectorArtifact {
            dimension: self.embedder.dim(),
            vectors: self.embeddings.clone(),
        };

        if let Some(parent) = vectors_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        fs::write(vectors_path, serde_json::to_vec(&artifact)?).await?;
        fs::write(chunks_path, serde_json::to_vec(&self.chunks)?).await?;

        info!(
            vectors = self.embeddings.len(),
            path = %vectors_path.display(),
            "vector index saved"
        );
        Ok(())
    }

    /// Restores a previously saved index. A count or dimensionality
    /// disagreement between the two artifacts (or with the bound provider)
    /// is corruption and fails the load outright.
    pub async fn load(
        embedder: Arc<dyn EmbeddingProvider>,
        vectors_path: &Path,
        chunks_path: &Path,
    ) -> Result<Self> {
        let artifact: VectorArtifact = serde_json::from_slice(&fs::read(vectors_path).await?)?;
        let chunks: Vec<Chunk> = serde_json::from_slice(&fs::read(chunks_path).await?)?;

        if artifact.vectors.len() != chunks.len() {
            return Err(RagError::CorruptIndex(format!(
                "{} vectors but {} chunks",
                artifact.vectors.len(),
                chunks.len()
            )));
        }
        if artifact.dimension != embedder.dim() {
            return Err(RagError::CorruptIndex(format!(
                "artifact dimension {} does not match provider dimension {}",
                artifact.dimension,
                embedder.dim()
            )));
        }
        if let Some(bad) = artifact
            .vectors
            .iter()
            .find(|vector| vector.len() != artifact.dimension)
        {
            return Err(RagError::CorruptIndex(format!(
                "vector of length {} in index of dimension {}",
                bad.len(),
                artifact.dimension
            )));
        }

        info!(
            vectors = artifact.vectors.len(),
            path = %vectors_path.display(),
            "vector index loaded"
        );
        Ok(Self {
            embedder,
            chunks,
            embeddings: artifact.vectors,
        })
    }

    pub fn stats(&self) -> VectorIndexStats {
        let sources: HashSet<&str> = self
            .chunks
            .iter()
            .map(|chunk| chunk.metadata.source.as_str())
            .collect();
        VectorIndexStats {
            total_vectors: self.embeddings.len(),
            dimension: self.embedder.dim(),
            total_documents: sources.len(),
        }
    }
}

fn l2_squared(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::MockEmbeddingProvider;
    use crate::types::ChunkMetadata;
    use chrono::Utc;
    use tempfile::tempdir;

    fn chunk(source: &str, id: usize, content: &str) -> Chunk {
        Chunk {
            content: content.to_string(),
            metadata: ChunkMetadata {
                source: source.to_string(),
                file_name: source.to_string(),
                file_type: ".txt".into(),
                loaded_at: Utc::now(),
                chunk_id: id,
                total_chunks: 3,
                chunk_size: content.chars().count(),
            },
        }
    }

    fn sample_chunks() -> Vec<Chunk> {
        vec![
            chunk("a.txt", 0, "rust is a systems language"),
            chunk("a.txt", 1, "paris is the capital of france"),
            chunk("b.txt", 0, "bread rises with yeast"),
        ]
    }

    async fn built_index() -> VectorIndex {
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(MockEmbeddingProvider::new());
        let mut index = VectorIndex::new(embedder);
        index.build(sample_chunks()).await.unwrap();
        index
    }

    #[tokio::test]
    async fn empty_index_returns_no_results() {
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(MockEmbeddingProvider::new());
        let index = VectorIndex::new(embedder);
        assert!(index.search("anything", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn exact_text_is_its_own_nearest_neighbor() {
        let index = built_index().await;
        let results = index
            .search("paris is the capital of france", 3)
            .await
            .unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].chunk.content, "paris is the capital of france");
        // Identical text embeds to distance zero, similarity 1.
        assert!((results[0].score - 1.0).abs() < 1e-6);
        // Scores are descending and within (0, 1].
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        for result in &results {
            assert!(result.score > 0.0 && result.score <= 1.0);
        }
    }

    #[tokio::test]
    async fn rebuild_is_idempotent() {
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(MockEmbeddingProvider::new());
        let mut index = VectorIndex::new(embedder);
        index.build(sample_chunks()).await.unwrap();
        let first = index.search("systems language", 3).await.unwrap();
        index.build(sample_chunks()).await.unwrap();
        let second = index.search("systems language", 3).await.unwrap();

        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.chunk, b.chunk);
            assert!((a.score - b.score).abs() < 1e-6);
        }
    }

    #[tokio::test]
    async fn save_load_round_trip_preserves_search() {
        let dir = tempdir().unwrap();
        let vectors_path = dir.path().join("vectors.json");
        let chunks_path = dir.path().join("chunks.json");

        let index = built_index().await;
        let before = index.search("capital of france", 2).await.unwrap();
        index.save(&vectors_path, &chunks_path).await.unwrap();

        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(MockEmbeddingProvider::new());
        let loaded = VectorIndex::load(embedder, &vectors_path, &chunks_path)
            .await
            .unwrap();
        let after = loaded.search("capital of france", 2).await.unwrap();

        assert_eq!(before.len(), after.len());
        for (a, b) in before.iter().zip(after.iter()) {
            assert_eq!(a.chunk, b.chunk);
            assert!((a.score - b.score).abs() < 1e-6);
        }
    }

    #[tokio::test]
    async fn mismatched_artifacts_fail_to_load() {
        let dir = tempdir().unwrap();
        let vectors_path = dir.path().join("vectors.json");
        let chunks_path = dir.path().join("chunks.json");

        let index = built_index().await;
        index.save(&vectors_path, &chunks_path).await.unwrap();

        // Drop one chunk from the companion artifact to skew the counts.
        let mut chunks: Vec<Chunk> =
            serde_json::from_slice(&std::fs::read(&chunks_path).unwrap()).unwrap();
        chunks.pop();
        std::fs::write(&chunks_path, serde_json::to_vec(&chunks).unwrap()).unwrap();

        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(MockEmbeddingProvider::new());
        let err = VectorIndex::load(embedder, &vectors_path, &chunks_path)
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::CorruptIndex(_)));
    }

    #[tokio::test]
    async fn stats_count_vectors_and_sources() {
        let index = built_index().await;
        let stats = index.stats();
        assert_eq!(stats.total_vectors, 3);
        assert_eq!(stats.total_documents, 2);
        assert_eq!(stats.dimension, index.dimension());
    }
}
