use axum::extract::State;
use axum::Json;
use serde::Serialize;

use super::AppState;
use crate::db::EntityCounts;
use crate::error::AppError;

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub counts: EntityCounts,
}

/// Store connectivity plus per-table row counts.
pub async fn get_status(State(state): State<AppState>) -> Result<Json<StatusResponse>, AppError> {
    let counts = state.repo.counts().await?;
    Ok(Json(StatusResponse {
        status: "connected",
        counts,
    }))
}
