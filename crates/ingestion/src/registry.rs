//! Process-wide sync status registry
//!
//! Tracks the lifecycle of each source's sync: created on start, settled on
//! completion or failure. Status queries only ever see settled states or
//! "syncing"; there is no in-between. At most one sync per source may be in
//! flight; a second request is rejected, not queued.

use chrono::{DateTime, Utc};
use dochub_common::errors::{AppError, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Lifecycle phase of a source's most recent sync
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    Syncing,
    Completed,
    Failed,
}

/// Status entry for one source
#[derive(Debug, Clone)]
pub struct SyncStatus {
    pub phase: SyncPhase,
    /// Human-readable summary, e.g. file counts or the failure reason
    pub message: String,
    pub started_at: DateTime<Utc>,
    pub settled_at: Option<DateTime<Utc>>,
}

/// Registry of in-flight and settled syncs, keyed by source id
#[derive(Clone, Default)]
pub struct SyncRegistry {
    inner: Arc<Mutex<HashMap<Uuid, SyncStatus>>>,
}

impl SyncRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a sync as started.
    ///
    /// Rejects with a conflict when a sync for this source is already in
    /// flight.
    pub fn begin(&self, source_id: Uuid) -> Result<()> {
        let mut map = self.inner.lock().expect("sync registry poisoned");

        if let Some(status) = map.get(&source_id) {
            if status.phase == SyncPhase::Syncing {
                return Err(AppError::SyncInProgress {
                    source_id: source_id.to_string(),
                });
            }
        }

        map.insert(
            source_id,
            SyncStatus {
                phase: SyncPhase::Syncing,
                message: "Syncing...".to_string(),
                started_at: Utc::now(),
                settled_at: None,
            },
        );

        Ok(())
    }

    /// Settle a sync as completed (possibly with per-file failures)
    pub fn complete(&self, source_id: Uuid, summary: String) {
        self.settle(source_id, SyncPhase::Completed, summary);
    }

    /// Settle a sync as failed
    pub fn fail(&self, source_id: Uuid, reason: String) {
        self.settle(source_id, SyncPhase::Failed, reason);
    }

    fn settle(&self, source_id: Uuid, phase: SyncPhase, message: String) {
        let mut map = self.inner.lock().expect("sync registry poisoned");
        if let Some(status) = map.get_mut(&source_id) {
            status.phase = phase;
            status.message = message;
            status.settled_at = Some(Utc::now());
        }
    }

    /// Current status for a source, if any sync ran in this process
    pub fn status(&self, source_id: Uuid) -> Option<SyncStatus> {
        self.inner
            .lock()
            .expect("sync registry poisoned")
            .get(&source_id)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_then_complete() {
        let registry = SyncRegistry::new();
        let id = Uuid::new_v4();

        registry.begin(id).unwrap();
        assert_eq!(registry.status(id).unwrap().phase, SyncPhase::Syncing);

        registry.complete(id, "Synced 3 files".to_string());
        let status = registry.status(id).unwrap();
        assert_eq!(status.phase, SyncPhase::Completed);
        assert_eq!(status.message, "Synced 3 files");
        assert!(status.settled_at.is_some());
    }

    #[test]
    fn test_concurrent_sync_rejected() {
        let registry = SyncRegistry::new();
        let id = Uuid::new_v4();

        registry.begin(id).unwrap();
        let err = registry.begin(id).unwrap_err();
        assert!(matches!(err, AppError::SyncInProgress { .. }));
    }

    #[test]
    fn test_resync_allowed_after_settling() {
        let registry = SyncRegistry::new();
        let id = Uuid::new_v4();

        registry.begin(id).unwrap();
        registry.fail(id, "remote unreachable".to_string());
        assert_eq!(registry.status(id).unwrap().phase, SyncPhase::Failed);

        registry.begin(id).unwrap();
        assert_eq!(registry.status(id).unwrap().phase, SyncPhase::Syncing);
    }

    #[test]
    fn test_unknown_source_has_no_status() {
        let registry = SyncRegistry::new();
        assert!(registry.status(Uuid::new_v4()).is_none());
    }

    #[test]
    fn test_independent_sources_do_not_conflict() {
        let registry = SyncRegistry::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        registry.begin(a).unwrap();
        registry.begin(b).unwrap();
        assert_eq!(registry.status(a).unwrap().phase, SyncPhase::Syncing);
        assert_eq!(registry.status(b).unwrap().phase, SyncPhase::Syncing);
    }
}
