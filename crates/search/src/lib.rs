//! DocHub Search
//!
//! Vector similarity search over embedded chunks, scoped to a project.

mod service;

pub use service::{
    validate_query, ChunkMetadata, SearchResultItem, SearchService, DEFAULT_TOP_K, MAX_TOP_K,
    MIN_TOP_K,
};
