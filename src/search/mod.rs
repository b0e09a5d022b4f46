//! Hybrid retrieval: running both indexes and fusing their rankings.

pub mod hybrid;

pub use hybrid::{FusionMode, HybridSearch, DEFAULT_RRF_K};
