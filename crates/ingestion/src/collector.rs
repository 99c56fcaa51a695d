//! Repository sync collector
//!
//! Pulls a source's remote tree, detects changed files by fingerprint,
//! updates the document store and drives the chunk/embed pipeline. A single
//! file's failure is recorded and the sync continues; only total remote
//! inaccessibility or a fatal configuration error aborts the run, leaving
//! prior state untouched.

use crate::fingerprint;
use crate::github::GithubClient;
use crate::pipeline::DocumentPipeline;
use crate::registry::SyncRegistry;
use chrono::Utc;
use dochub_common::config::SyncConfig;
use dochub_common::db::models::{FileType, Source};
use dochub_common::db::Repository;
use dochub_common::errors::{AppError, Result};
use dochub_common::metrics;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// One file that failed during a sync
#[derive(Debug, Clone, Serialize)]
pub struct FileFailure {
    pub path: String,
    pub reason: String,
}

/// Outcome of a completed sync.
///
/// Per-file failures make this a completed-with-errors outcome, not a sync
/// failure; total failure is an `Err` from [`SyncCollector::sync`] instead.
#[derive(Debug, Clone, Serialize)]
pub struct SyncResult {
    /// Changed or new files fully processed (stored and embedded)
    pub files_synced: usize,
    /// Files skipped because their fingerprint matched the stored document
    pub files_unchanged: usize,
    /// Per-file failures (download, storage or embedding)
    pub files_failed: Vec<FileFailure>,
    /// Chunks written across all processed documents
    pub chunks_created: usize,
    /// End-to-end duration
    pub duration: Duration,
}

impl SyncResult {
    /// Human-readable summary for status queries
    pub fn summary(&self) -> String {
        if self.files_failed.is_empty() {
            format!(
                "Sync completed successfully. {} files synced, {} unchanged.",
                self.files_synced, self.files_unchanged
            )
        } else {
            format!(
                "Sync completed with errors. {} files synced, {} unchanged, {} failed.",
                self.files_synced,
                self.files_unchanged,
                self.files_failed.len()
            )
        }
    }
}

/// Whether a downloaded file matches the stored document and can be skipped
fn is_unchanged(known: &HashMap<String, String>, path: &str, fp: &str) -> bool {
    known.get(path).map(|stored| stored == fp).unwrap_or(false)
}

/// Sync orchestrator for one process
#[derive(Clone)]
pub struct SyncCollector {
    repository: Repository,
    github: GithubClient,
    pipeline: DocumentPipeline,
    registry: SyncRegistry,
    download_concurrency: usize,
    embed_concurrency: usize,
}

impl SyncCollector {
    pub fn new(
        repository: Repository,
        github: GithubClient,
        pipeline: DocumentPipeline,
        registry: SyncRegistry,
        config: &SyncConfig,
    ) -> Self {
        Self {
            repository,
            github,
            pipeline,
            registry,
            download_concurrency: config.download_concurrency.max(1),
            embed_concurrency: config.embed_concurrency.max(1),
        }
    }

    /// Run a full sync for one source.
    ///
    /// Registers the run in the status registry first; a source that is
    /// already syncing is rejected with a conflict. The registry settles to
    /// completed or failed before this returns.
    #[instrument(skip(self), fields(source_id = %source_id))]
    pub async fn sync(&self, source_id: Uuid) -> Result<SyncResult> {
        let source = self
            .repository
            .find_source_by_id(source_id)
            .await?
            .ok_or_else(|| AppError::SourceNotFound {
                id: source_id.to_string(),
            })?;

        self.registry.begin(source_id)?;

        info!(repo = %source.repo_url, "Starting sync");

        match self.run(&source).await {
            Ok(result) => {
                metrics::record_sync(result.duration.as_secs_f64(), result.files_failed.len());
                self.registry.complete(source_id, result.summary());
                Ok(result)
            }
            Err(e) => {
                error!(error = %e, "Sync failed");
                self.registry.fail(source_id, e.to_string());
                Err(e)
            }
        }
    }

    async fn run(&self, source: &Source) -> Result<SyncResult> {
        let start = Instant::now();

        // Whole-tree listing failure aborts the sync with prior state intact
        let files = self
            .github
            .fetch_tree(&source.repo_url, source.folder_path.as_deref())
            .await?;

        let known = self.repository.document_fingerprints(source.id).await?;

        // Bounded-parallel downloads; one slow or failing file never stalls
        // or aborts the rest
        let downloads = stream::iter(files.into_iter().map(|file| {
            let github = self.github.clone();
            let repo_url = source.repo_url.clone();
            async move {
                let content = github.fetch_content(&repo_url, &file.path).await;
                (file, content)
            }
        }))
        .buffer_unordered(self.download_concurrency)
        .collect::<Vec<_>>()
        .await;

        let mut failures: Vec<FileFailure> = Vec::new();
        let mut unchanged = 0usize;
        let mut changed = Vec::new();

        for (file, outcome) in downloads {
            let content = match outcome {
                Ok(content) => content,
                Err(e) => {
                    warn!(path = %file.path, error = %e, "Download failed");
                    failures.push(FileFailure {
                        path: file.path,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let fp = fingerprint(&content);
            if is_unchanged(&known, &file.path, &fp) {
                unchanged += 1;
                continue;
            }

            let file_type = match FileType::from_path(&file.path) {
                Some(t) => t,
                None => {
                    failures.push(FileFailure {
                        path: file.path,
                        reason: "Unsupported file type".to_string(),
                    });
                    continue;
                }
            };

            match self
                .repository
                .upsert_document(source.id, &file.path, file_type, content, fp)
                .await
            {
                Ok(doc) => changed.push(doc),
                Err(e) => {
                    warn!(path = %file.path, error = %e, "Document store update failed");
                    failures.push(FileFailure {
                        path: file.path,
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            changed = changed.len(),
            unchanged = unchanged,
            failed = failures.len(),
            "Downloads complete, starting embedding pipeline"
        );

        // Bounded-parallel chunk/embed; each worker clones the pipeline and
        // therefore gets its own transaction scope for the chunk replace
        let outcomes = stream::iter(changed.into_iter().map(|doc| {
            let pipeline = self.pipeline.clone();
            async move {
                let outcome = pipeline.process_document(&doc).await;
                (doc, outcome)
            }
        }))
        .buffer_unordered(self.embed_concurrency)
        .collect::<Vec<_>>()
        .await;

        let mut files_synced = 0usize;
        let mut chunks_created = 0usize;

        for (doc, outcome) in outcomes {
            match outcome {
                Ok(chunks) => {
                    files_synced += 1;
                    chunks_created += chunks;
                }
                // A dimension mismatch would corrupt the index; abort the
                // whole run instead of recording a per-file failure
                Err(e @ AppError::DimensionMismatch { .. })
                | Err(e @ AppError::Configuration { .. }) => {
                    return Err(e);
                }
                Err(e) => {
                    error!(path = %doc.file_path, error = %e, "Embedding pipeline failed");
                    failures.push(FileFailure {
                        path: doc.file_path.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        // Timestamps move only now that the run has settled
        let upstream_change = match self
            .github
            .last_commit_date(&source.repo_url, source.folder_path.as_deref())
            .await
        {
            Ok(ts) => ts,
            Err(e) => {
                warn!(error = %e, "Could not fetch last commit date");
                Utc::now()
            }
        };

        self.repository
            .mark_source_synced(source.id, Utc::now(), upstream_change)
            .await?;

        let duration = start.elapsed();

        if duration > Duration::from_secs(300) {
            warn!(
                duration_secs = duration.as_secs(),
                "Sync exceeded the 5-minute threshold"
            );
        }

        info!(
            files_synced = files_synced,
            files_unchanged = unchanged,
            files_failed = failures.len(),
            chunks_created = chunks_created,
            duration_ms = duration.as_millis() as u64,
            "Sync complete"
        );

        Ok(SyncResult {
            files_synced,
            files_unchanged: unchanged,
            files_failed: failures,
            chunks_created,
            duration,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_unchanged() {
        let mut known = HashMap::new();
        known.insert("docs/a.md".to_string(), "abc".to_string());

        assert!(is_unchanged(&known, "docs/a.md", "abc"));
        assert!(!is_unchanged(&known, "docs/a.md", "def"));
        assert!(!is_unchanged(&known, "docs/new.md", "abc"));
    }

    #[test]
    fn test_summary_without_failures() {
        let result = SyncResult {
            files_synced: 0,
            files_unchanged: 3,
            files_failed: vec![],
            chunks_created: 0,
            duration: Duration::from_secs(1),
        };
        assert_eq!(
            result.summary(),
            "Sync completed successfully. 0 files synced, 3 unchanged."
        );
    }

    #[test]
    fn test_summary_with_partial_failure() {
        // Embedding failed for 2 of 5 documents: the sync still completes
        let result = SyncResult {
            files_synced: 3,
            files_unchanged: 0,
            files_failed: vec![
                FileFailure {
                    path: "docs/a.md".to_string(),
                    reason: "embedding timeout".to_string(),
                },
                FileFailure {
                    path: "docs/b.md".to_string(),
                    reason: "embedding timeout".to_string(),
                },
            ],
            chunks_created: 12,
            duration: Duration::from_secs(2),
        };
        assert_eq!(result.files_synced, 3);
        assert_eq!(result.files_failed.len(), 2);
        assert!(result.summary().contains("completed with errors"));
    }
}
