//! HTTP embedding provider speaking the OpenAI-compatible `/embeddings`
//! shape (also served by Ollama and most local inference gateways).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{EmbeddingCache, EmbeddingProvider};
use crate::error::{RagError, Result};

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    index: usize,
    embedding: Vec<f32>,
}

/// Embedding client backed by an OpenAI-compatible HTTP endpoint.
///
/// Dimensionality is fixed at construction; responses whose vectors differ
/// from it are rejected rather than truncated or padded.
pub struct HttpEmbeddingProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    dim: usize,
    batch_size: usize,
    cache: EmbeddingCache,
}

impl HttpEmbeddingProvider {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        dim: usize,
        batch_size: usize,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| RagError::Embedding(err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
            dim,
            batch_size: batch_size.max(1),
            cache: EmbeddingCache::new(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn request_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/embeddings", self.base_url);
        let mut request = self.client.post(&url).json(&EmbeddingRequest {
            model: &self.model,
            input: texts,
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|err| RagError::Embedding(err.to_string()))?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RagError::Embedding(format!(
                "embedding endpoint returned {status}: {body}"
            )));
        }

        let mut payload: EmbeddingResponse = response
            .json()
            .await
            .map_err(|err| RagError::Embedding(err.to_string()))?;
        if payload.data.len() != texts.len() {
            return Err(RagError::Embedding(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                payload.data.len()
            )));
        }

        payload.data.sort_by_key(|item| item.index);
        let mut vectors = Vec::with_capacity(payload.data.len());
        for item in payload.data {
            if item.embedding.len() != self.dim {
                return Err(RagError::Embedding(format!(
                    "dimensionality mismatch: expected {}, got {}",
                    self.dim,
                    item.embedding.len()
                )));
            }
            vectors.push(item.embedding);
        }
        Ok(vectors)
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    fn dim(&self) -> usize {
        self.dim
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(cached) = self.cache.get(text) {
            return Ok(cached);
        }
        let vectors = self.request_batch(std::slice::from_ref(&text.to_string())).await?;
        let vector = vectors.into_iter().next().ok_or_else(|| {
            RagError::Embedding("embedding endpoint returned no vectors".to_string())
        })?;
        self.cache.insert(text, vector.clone());
        Ok(vector)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut results: Vec<Option<Vec<f32>>> = vec![None; texts.len()];
        let mut misses: Vec<usize> = Vec::new();

        for (i, text) in texts.iter().enumerate() {
            match self.cache.get(text) {
                Some(vector) => results[i] = Some(vector),
                None => misses.push(i),
            }
        }
        debug!(
            total = texts.len(),
            cached = texts.len() - misses.len(),
            "embedding batch"
        );

        for window in misses.chunks(self.batch_size) {
            let batch: Vec<String> = window.iter().map(|&i| texts[i].clone()).collect();
            let vectors = self.request_batch(&batch).await?;
            for (&i, vector) in window.iter().zip(vectors) {
                self.cache.insert(&texts[i], vector.clone());
                results[i] = Some(vector);
            }
        }

        Ok(results
            .into_iter()
            .map(|vector| vector.expect("every index filled from cache or batch"))
            .collect())
    }
}
