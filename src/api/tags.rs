use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use super::extract::{ApiJson, ApiPath, ApiQuery};
use super::{AppState, PageParams};
use crate::domain::{NewTag, Tag, TagPatch, TagUsage};
use crate::error::AppError;

pub async fn list_tags(
    ApiQuery(params): ApiQuery<PageParams>,
    State(state): State<AppState>,
) -> Result<Json<Vec<Tag>>, AppError> {
    let page = state.page(&params)?;
    Ok(Json(state.repo.list_tags(page).await?))
}

pub async fn get_tag(
    ApiPath(id): ApiPath<i64>,
    State(state): State<AppState>,
) -> Result<Json<Tag>, AppError> {
    Ok(Json(state.repo.get_tag(id).await?))
}

pub async fn get_tag_usage(
    ApiPath(id): ApiPath<i64>,
    State(state): State<AppState>,
) -> Result<Json<TagUsage>, AppError> {
    Ok(Json(state.repo.tag_usage(id).await?))
}

pub async fn create_tag(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<NewTag>,
) -> Result<(StatusCode, Json<Tag>), AppError> {
    let new = payload.validated()?;
    let tag = state.repo.create_tag(&new).await?;
    Ok((StatusCode::CREATED, Json(tag)))
}

pub async fn update_tag(
    ApiPath(id): ApiPath<i64>,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<TagPatch>,
) -> Result<Json<Tag>, AppError> {
    let patch = payload.validated()?;
    Ok(Json(state.repo.update_tag(id, &patch).await?))
}

pub async fn delete_tag(
    ApiPath(id): ApiPath<i64>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    state.repo.delete_tag(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
