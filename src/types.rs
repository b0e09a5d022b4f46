//! Shared data model for documents, chunks, search results, and answers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata attached to a loaded document and inherited by its chunks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Stable unique key for the owning document (typically its path).
    pub source: String,
    pub file_name: String,
    pub file_type: String,
    pub loaded_at: DateTime<Utc>,
}

/// A raw document produced by the loading boundary: plain text plus
/// provenance metadata. Immutable once produced; consumed by the chunker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub text: String,
    pub metadata: DocumentMetadata,
}

impl Document {
    pub fn new(text: impl Into<String>, metadata: DocumentMetadata) -> Self {
        Self {
            text: text.into(),
            metadata,
        }
    }
}

/// Metadata carried by every chunk: the parent document's provenance plus
/// the chunk's position within its siblings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source: String,
    pub file_name: String,
    pub file_type: String,
    pub loaded_at: DateTime<Utc>,
    /// Position of this chunk within its parent document.
    pub chunk_id: usize,
    /// Number of chunks the parent document was split into.
    pub total_chunks: usize,
    /// Character length of the chunk content.
    pub chunk_size: usize,
}

impl ChunkMetadata {
    /// Stable synthetic identity for a chunk within one generation of the
    /// corpus.
    pub fn key(&self) -> String {
        format!("{}#{}", self.source, self.chunk_id)
    }
}

/// A bounded, overlap-aware slice of a document's cleaned text: the atomic
/// unit of indexing, retrieval, and citation. Immutable after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    pub metadata: ChunkMetadata,
}

/// A retrieved chunk paired with a score.
///
/// Score semantics depend on where the result came from: distance-derived
/// similarity from the vector index, BM25 relevance from the keyword index,
/// or a fused score from the hybrid engine. Scores from different origins
/// are not comparable without fusion.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub chunk: Chunk,
    pub score: f32,
}

impl SearchResult {
    pub fn new(chunk: Chunk, score: f32) -> Self {
        Self { chunk, score }
    }
}

/// A cited source accompanying a generated answer: a content preview plus
/// the chunk's full metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub content: String,
    pub metadata: ChunkMetadata,
}

/// The outcome of answer generation, whether synthesized by a provider or
/// assembled by the extractive fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedAnswer {
    pub answer: String,
    pub sources: Vec<Source>,
    /// `"provider:model"` when a provider produced the answer, `"fallback"`
    /// otherwise.
    pub model_used: String,
}

/// A retrieval-plus-generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    /// Fused result count. `None` defers to the engine's configured
    /// default depth.
    #[serde(default)]
    pub top_k: Option<usize>,
    pub use_citations: bool,
}

impl QueryRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            top_k: None,
            use_citations: true,
        }
    }

    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }

    #[must_use]
    pub fn with_citations(mut self, use_citations: bool) -> Self {
        self.use_citations = use_citations;
        self
    }
}

/// A fully-timed answer to a [`QueryRequest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub query: String,
    pub answer: String,
    pub sources: Vec<Source>,
    pub model_used: String,
    pub retrieval_time_ms: f64,
    pub generation_time_ms: f64,
    pub total_time_ms: f64,
}

/// Summary of one ingestion cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReport {
    pub documents_processed: usize,
    pub chunks_created: usize,
}

/// Per-source summary used by document listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub file_name: String,
    pub file_type: String,
    pub source: String,
    pub loaded_at: DateTime<Utc>,
    pub chunks: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> ChunkMetadata {
        ChunkMetadata {
            source: "docs/guide.txt".into(),
            file_name: "guide.txt".into(),
            file_type: ".txt".into(),
            loaded_at: Utc::now(),
            chunk_id: 2,
            total_chunks: 5,
            chunk_size: 42,
        }
    }

    #[test]
    fn chunk_key_is_source_and_position() {
        assert_eq!(metadata().key(), "docs/guide.txt#2");
    }

    #[test]
    fn chunk_round_trips_through_json() {
        let chunk = Chunk {
            content: "some content".into(),
            metadata: metadata(),
        };
        let json = serde_json::to_string(&chunk).unwrap();
        let back: Chunk = serde_json::from_str(&json).unwrap();
        assert_eq!(chunk, back);
    }

    #[test]
    fn query_request_builder_defaults() {
        let req = QueryRequest::new("what is rust");
        assert_eq!(req.top_k, None);
        assert!(req.use_citations);
        let req = req.with_top_k(3).with_citations(false);
        assert_eq!(req.top_k, Some(3));
        assert!(!req.use_citations);
    }

    #[test]
    fn query_request_top_k_defaults_when_absent_from_json() {
        let req: QueryRequest =
            serde_json::from_str(r#"{"query": "q", "use_citations": true}"#).unwrap();
        assert_eq!(req.top_k, None);
    }
}
