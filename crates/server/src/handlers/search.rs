//! Search handlers

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::AppState;
use dochub_common::errors::{AppError, Result};
use dochub_search::{SearchResultItem, DEFAULT_TOP_K};

/// Search request
#[derive(Debug, Deserialize, Validate)]
pub struct SearchRequest {
    #[validate(length(min = 1, max = 1000))]
    pub query: String,

    /// Result count, 1..=20; defaults to 5
    pub top_k: Option<usize>,
}

/// Search response
#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<SearchResultItem>,
    pub total_results: usize,
}

/// Perform a project-scoped vector similarity search
pub async fn search(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResponse>> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let top_k = request.top_k.unwrap_or(DEFAULT_TOP_K);

    let results = state.search.search(project_id, &request.query, top_k).await?;

    Ok(Json(SearchResponse {
        query: request.query,
        total_results: results.len(),
        results,
    }))
}
