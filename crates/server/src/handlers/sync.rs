//! Sync handlers
//!
//! Sync runs asynchronously: the POST returns 202 immediately and the
//! status endpoint reports the last fully-settled state.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::AppState;
use dochub_common::errors::{AppError, Result};
use dochub_ingestion::SyncPhase;

/// Response for an accepted sync request
#[derive(Serialize)]
pub struct SyncAcceptedResponse {
    pub message: String,
    pub source_id: Uuid,
    pub status: &'static str,
}

/// Sync status response
#[derive(Serialize)]
pub struct SyncStatusResponse {
    pub status: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_synced_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_upstream_change_at: Option<String>,
}

/// Trigger a sync for a source.
///
/// Returns 202 and runs the sync in a background task; a source that is
/// already syncing is rejected with 409. The collector re-checks the
/// registry when the task starts, so a racing duplicate settles harmlessly.
pub async fn start_sync(
    State(state): State<AppState>,
    Path(source_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state
        .repository
        .find_source_by_id(source_id)
        .await?
        .ok_or_else(|| AppError::SourceNotFound {
            id: source_id.to_string(),
        })?;

    if let Some(status) = state.registry.status(source_id) {
        if status.phase == SyncPhase::Syncing {
            return Err(AppError::SyncInProgress {
                source_id: source_id.to_string(),
            });
        }
    }

    let collector = state.collector.clone();
    tokio::spawn(async move {
        if let Err(e) = collector.sync(source_id).await {
            tracing::error!(source_id = %source_id, error = %e, "Background sync failed");
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(SyncAcceptedResponse {
            message: "Sync started".to_string(),
            source_id,
            status: "syncing",
        }),
    ))
}

/// Get sync status for a source.
///
/// The in-memory registry wins while this process has seen a sync; otherwise
/// the source's persisted timestamps decide between idle and completed.
pub async fn sync_status(
    State(state): State<AppState>,
    Path(source_id): Path<Uuid>,
) -> Result<Json<SyncStatusResponse>> {
    let source = state
        .repository
        .find_source_by_id(source_id)
        .await?
        .ok_or_else(|| AppError::SourceNotFound {
            id: source_id.to_string(),
        })?;

    let (status, message) = match state.registry.status(source_id) {
        Some(entry) => {
            let status = match entry.phase {
                SyncPhase::Syncing => "syncing",
                SyncPhase::Completed => "completed",
                SyncPhase::Failed => "failed",
            };
            (status, entry.message)
        }
        None if source.last_synced_at.is_none() => ("idle", "Not synced yet".to_string()),
        None => {
            let count = state.repository.count_documents_by_source(source_id).await?;
            let mut message = format!("Sync completed successfully. {} files synced.", count);
            if source.needs_update() {
                message.push_str(" Needs update.");
            }
            ("completed", message)
        }
    };

    Ok(Json(SyncStatusResponse {
        status,
        message,
        last_synced_at: source.last_synced_at.map(|dt| dt.to_rfc3339()),
        last_upstream_change_at: source.last_upstream_change_at.map(|dt| dt.to_rfc3339()),
    }))
}
