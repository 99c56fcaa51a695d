//! Search service
//!
//! Embeds the query with the same model as stored chunks and ranks
//! candidates by cosine similarity. Candidates are restricted to the
//! project's documents before ranking; that join is the tenancy boundary.

use dochub_common::db::{Repository, RetrievedChunk};
use dochub_common::embeddings::Embedder;
use dochub_common::errors::{AppError, Result};
use dochub_common::metrics;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Allowed top_k range
pub const MIN_TOP_K: usize = 1;
pub const MAX_TOP_K: usize = 20;

/// Default result count when the caller does not specify one
pub const DEFAULT_TOP_K: usize = 5;

/// Denormalized chunk metadata returned with every result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub file_path: String,
    pub file_name: String,
    pub file_type: String,
    pub chunk_position: i32,
    pub total_chunks: i32,
}

/// One ranked search result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResultItem {
    pub chunk_id: Uuid,
    pub document_id: Uuid,
    pub chunk_text: String,
    pub similarity_score: f64,
    pub anchor: Option<String>,
    pub metadata: ChunkMetadata,
}

/// Validate query text and top_k before doing any work.
///
/// Rejected input is never retried.
pub fn validate_query(query: &str, top_k: usize) -> Result<()> {
    if query.trim().is_empty() {
        return Err(AppError::Validation {
            message: "Query must not be empty".to_string(),
            field: Some("query".to_string()),
        });
    }

    if !(MIN_TOP_K..=MAX_TOP_K).contains(&top_k) {
        return Err(AppError::Validation {
            message: format!("top_k must be between {} and {}", MIN_TOP_K, MAX_TOP_K),
            field: Some("top_k".to_string()),
        });
    }

    Ok(())
}

fn to_result_item(row: RetrievedChunk) -> SearchResultItem {
    SearchResultItem {
        chunk_id: row.chunk_id,
        document_id: row.document_id,
        chunk_text: row.content,
        similarity_score: (row.similarity_score * 10_000.0).round() / 10_000.0,
        anchor: row.anchor,
        metadata: ChunkMetadata {
            file_path: row.file_path,
            file_name: row.file_name,
            file_type: row.file_type,
            chunk_position: row.chunk_index,
            total_chunks: row.total_chunks,
        },
    }
}

/// Project-scoped vector similarity search
#[derive(Clone)]
pub struct SearchService {
    repository: Repository,
    embedder: Arc<dyn Embedder>,
}

impl SearchService {
    pub fn new(repository: Repository, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            repository,
            embedder,
        }
    }

    /// Run a similarity search and return results ordered by descending
    /// score, ties broken by chunk position.
    pub async fn search(
        &self,
        project_id: Uuid,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<SearchResultItem>> {
        validate_query(query, top_k)?;

        self.repository
            .find_project_by_id(project_id)
            .await?
            .ok_or_else(|| AppError::ProjectNotFound {
                id: project_id.to_string(),
            })?;

        let start = Instant::now();

        let embedding = self.embedder.embed(query).await?;
        if embedding.len() != self.embedder.dimension() {
            return Err(AppError::DimensionMismatch {
                expected: self.embedder.dimension(),
                actual: embedding.len(),
            });
        }

        let rows = self
            .repository
            .vector_search(project_id, &embedding, top_k)
            .await?;

        let results: Vec<SearchResultItem> = rows.into_iter().map(to_result_item).collect();

        metrics::record_search(start.elapsed().as_secs_f64(), results.len());

        tracing::info!(
            project_id = %project_id,
            query_len = query.len(),
            top_k = top_k,
            results = results.len(),
            latency_ms = start.elapsed().as_millis() as u64,
            "Search completed"
        );

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(score: f64, index: i32) -> RetrievedChunk {
        RetrievedChunk {
            chunk_id: Uuid::new_v4(),
            document_id: Uuid::new_v4(),
            content: "chunk text".to_string(),
            anchor: Some("section".to_string()),
            similarity_score: score,
            chunk_index: index,
            total_chunks: 4,
            file_path: "docs/guide.md".to_string(),
            file_name: "guide.md".to_string(),
            file_type: "md".to_string(),
        }
    }

    #[test]
    fn test_validate_rejects_empty_query() {
        assert!(validate_query("", 5).is_err());
        assert!(validate_query("   ", 5).is_err());
        assert!(validate_query("how does auth work", 5).is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range_top_k() {
        assert!(validate_query("q", 0).is_err());
        assert!(validate_query("q", 21).is_err());
        assert!(validate_query("q", 1).is_ok());
        assert!(validate_query("q", 20).is_ok());
    }

    #[test]
    fn test_result_mapping_rounds_score() {
        let item = to_result_item(row(0.891234, 2));
        assert_eq!(item.similarity_score, 0.8912);
        assert_eq!(item.metadata.chunk_position, 2);
        assert_eq!(item.metadata.total_chunks, 4);
        assert_eq!(item.metadata.file_name, "guide.md");
        assert_eq!(item.anchor.as_deref(), Some("section"));
    }

    #[test]
    fn test_scores_stay_in_unit_range() {
        for score in [0.0, 0.5, 1.0] {
            let item = to_result_item(row(score, 0));
            assert!((0.0..=1.0).contains(&item.similarity_score));
        }
    }
}
