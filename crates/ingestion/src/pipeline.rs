//! Per-document chunk/embed pipeline
//!
//! Turns one changed document into an embedded chunk set and persists it as
//! a single atomic replacement. Failure isolation lives in the collector:
//! an error returned here marks only this document as failed.

use crate::chunker::{chunk_document, ChunkingConfig};
use dochub_common::db::models::Document;
use dochub_common::db::{NewChunk, Repository};
use dochub_common::embeddings::Embedder;
use dochub_common::errors::{AppError, Result};
use dochub_common::metrics;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};

/// Chunk/embed processor for single documents
#[derive(Clone)]
pub struct DocumentPipeline {
    repository: Repository,
    embedder: Arc<dyn Embedder>,
    chunking: ChunkingConfig,
}

impl DocumentPipeline {
    pub fn new(repository: Repository, embedder: Arc<dyn Embedder>, chunking: ChunkingConfig) -> Self {
        Self {
            repository,
            embedder,
            chunking,
        }
    }

    /// Chunk, embed and store one document.
    ///
    /// The chunk set is written as one transactional replace, so readers
    /// never observe a mixture of old and new chunks. Returns the number of
    /// chunks stored.
    #[instrument(skip(self, document), fields(path = %document.file_path))]
    pub async fn process_document(&self, document: &Document) -> Result<usize> {
        let start = Instant::now();

        let chunks = chunk_document(&document.content, document.kind(), &self.chunking);

        if chunks.is_empty() {
            warn!("No chunks generated, skipping embedding");
            return Ok(0);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        // The providers validate dimensions themselves; this guards custom
        // Embedder implementations before anything reaches the index.
        let expected = self.embedder.dimension();
        for embedding in &embeddings {
            if embedding.len() != expected {
                return Err(AppError::DimensionMismatch {
                    expected,
                    actual: embedding.len(),
                });
            }
        }

        let new_chunks: Vec<NewChunk> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| NewChunk {
                index: chunk.index,
                content: chunk.content,
                embedding,
                anchor: chunk.anchor,
            })
            .collect();

        let stored = self.repository.replace_chunks(document, new_chunks).await?;

        metrics::record_embedding(start.elapsed().as_secs_f64(), stored);

        info!(chunks = stored, "Document embedded");

        Ok(stored)
    }
}
