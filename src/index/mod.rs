//! The two independent ranking indexes.
//!
//! * [`vector`] — exact nearest-neighbor search over chunk embeddings.
//! * [`keyword`] — BM25 lexical ranking over tokenized chunk text.

pub mod keyword;
pub mod vector;

pub use keyword::{KeywordIndex, KeywordIndexStats};
pub use vector::{VectorIndex, VectorIndexStats};
