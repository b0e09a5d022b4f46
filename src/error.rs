//! Error taxonomy for the retrieval and generation pipeline.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, RagError>;

/// Errors surfaced by the retrieval and generation pipeline.
///
/// The variants map onto distinct recovery policies:
///
/// * [`RagError::UnsupportedInput`] — rejected before entering the pipeline,
///   never retried.
/// * [`RagError::Embedding`] — fatal to the in-flight build or query; a
///   missing vector would corrupt index alignment, so there is no silent
///   substitution.
/// * [`RagError::Generation`] — recovered locally by the answer generator's
///   extractive fallback; callers only see this from provider internals.
/// * [`RagError::CorruptIndex`] — persisted artifacts disagree with each
///   other; loading must not proceed with misaligned arrays.
#[derive(Debug, Error)]
pub enum RagError {
    /// Input rejected before entering the pipeline (file type, empty query,
    /// out-of-range parameters).
    #[error("unsupported input: {0}")]
    UnsupportedInput(String),

    /// The embedding provider failed or returned vectors of the wrong shape.
    #[error("embedding provider error: {0}")]
    Embedding(String),

    /// A generation provider call failed (network, auth, malformed response).
    #[error("generation provider error: {0}")]
    Generation(String),

    /// Persisted index artifacts are inconsistent with each other.
    #[error("corrupt index artifacts: {0}")]
    CorruptIndex(String),

    /// Underlying filesystem failure while persisting or restoring indexes.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Artifact serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
