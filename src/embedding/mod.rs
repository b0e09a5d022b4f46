//! Embedding provider boundary.
//!
//! The pipeline only depends on the [`EmbeddingProvider`] capability:
//! fixed-dimensional vectors for single texts and order-preserving batches.
//! Provider failures propagate to the caller unchanged; a missing vector
//! would corrupt index alignment, so there is no internal fallback here.

pub mod http;
pub mod mock;

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;

use crate::error::Result;

pub use http::HttpEmbeddingProvider;
pub use mock::MockEmbeddingProvider;

/// External embedding capability with a dimensionality fixed at
/// construction.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Output vector length; every vector this provider returns has exactly
    /// this many components.
    fn dim(&self) -> usize;

    /// Embeds a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embeds many texts, returning one vector per input in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// In-process memo cache for embeddings, keyed by the exact input text.
///
/// Rebuilds re-embed unchanged chunks; the cache keeps those provider
/// round-trips out of the hot path.
#[derive(Debug, Default)]
pub struct EmbeddingCache {
    entries: Mutex<HashMap<String, Vec<f32>>>,
}

impl EmbeddingCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, text: &str) -> Option<Vec<f32>> {
        self.entries.lock().get(text).cloned()
    }

    pub fn insert(&self, text: &str, vector: Vec<f32>) {
        self.entries.lock().insert(text.to_string(), vector);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_round_trip() {
        let cache = EmbeddingCache::new();
        assert!(cache.get("hello").is_none());
        cache.insert("hello", vec![1.0, 2.0]);
        assert_eq!(cache.get("hello"), Some(vec![1.0, 2.0]));
        assert_eq!(cache.len(), 1);
    }
}
