use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use super::extract::{ApiJson, ApiPath, ApiQuery};
use super::{AppState, PageParams};
use crate::domain::{NewUser, User, UserPatch};
use crate::error::AppError;

pub async fn list_users(
    ApiQuery(params): ApiQuery<PageParams>,
    State(state): State<AppState>,
) -> Result<Json<Vec<User>>, AppError> {
    let page = state.page(&params)?;
    Ok(Json(state.repo.list_users(page).await?))
}

pub async fn get_user(
    ApiPath(id): ApiPath<i64>,
    State(state): State<AppState>,
) -> Result<Json<User>, AppError> {
    Ok(Json(state.repo.get_user(id).await?))
}

pub async fn create_user(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<NewUser>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let new = payload.validated()?;
    let user = state.repo.create_user(&new).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn update_user(
    ApiPath(id): ApiPath<i64>,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<UserPatch>,
) -> Result<Json<User>, AppError> {
    let patch = payload.validated()?;
    Ok(Json(state.repo.update_user(id, &patch).await?))
}

pub async fn delete_user(
    ApiPath(id): ApiPath<i64>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    state.repo.delete_user(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
