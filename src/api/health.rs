use axum::extract::State;
use axum::Json;

use super::AppState;
use crate::error::AppError;

pub async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({"message": "Smart Bookmark Manager API"}))
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Ready once the store answers a query.
pub async fn ready(State(state): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    state.repo.ping().await?;
    Ok(Json(serde_json::json!({"status": "ready"})))
}
