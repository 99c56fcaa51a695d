//! Health handlers

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;
use dochub_common::errors::Result;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Liveness probe
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: dochub_common::VERSION,
    })
}

/// Readiness probe: verifies database connectivity
pub async fn ready(State(state): State<AppState>) -> Result<Json<HealthResponse>> {
    state.db.ping().await?;

    Ok(Json(HealthResponse {
        status: "ready",
        version: dochub_common::VERSION,
    }))
}
