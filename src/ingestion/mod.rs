//! Turning raw documents into indexable chunks.
//!
//! * [`loader`] — plain-text document loading with provenance metadata.
//! * [`chunker`] — text cleaning and overlap-aware splitting.

pub mod chunker;
pub mod loader;

pub use chunker::TextChunker;
pub use loader::DocumentLoader;
