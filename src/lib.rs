//! Hybrid retrieval and grounded answer generation over plain-text corpora.
//!
//! The pipeline runs in two phases. Ingestion turns documents into
//! overlapping chunks and indexes them twice, densely and lexically;
//! querying fuses both rankings and grounds an answer in the fused context:
//!
//! ```text
//!   documents ──► chunker ──► vector index ──┐
//!                        └──► keyword index ─┤
//!                                            ▼
//!   query ──────────────────────────► hybrid fusion ──► answer generator
//! ```
//!
//! [`engine::RagEngine`] is the front door; the layers underneath are public
//! for callers that want to compose them differently:
//!
//! * [`ingestion`] — document loading, text cleaning, overlap chunking.
//! * [`embedding`] — the embedding-provider boundary and its HTTP client.
//! * [`index`] — exact nearest-neighbor and BM25 indexes with persistence.
//! * [`search`] — reciprocal-rank and weighted-score fusion.
//! * [`llm`] — chat-completion providers and the extractive fallback.
//!
//! ```no_run
//! use ragfuse::config::Settings;
//! use ragfuse::engine::RagEngine;
//! use ragfuse::types::QueryRequest;
//!
//! # async fn run() -> ragfuse::error::Result<()> {
//! let engine = RagEngine::from_settings(Settings::from_env())?;
//! engine.load_indexes().await?;
//! engine.ingest_dir(std::path::Path::new("docs")).await?;
//!
//! let response = engine.query(QueryRequest::new("What is BM25?")).await?;
//! println!("{} ({})", response.answer, response.model_used);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod index;
pub mod ingestion;
pub mod llm;
pub mod search;
pub mod types;

pub use config::Settings;
pub use engine::RagEngine;
pub use error::{RagError, Result};
pub use types::{QueryRequest, QueryResponse};
