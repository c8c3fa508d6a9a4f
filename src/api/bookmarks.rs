use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use super::extract::{ApiJson, ApiPath, ApiQuery};
use super::{AppState, PageParams};
use crate::domain::{Bookmark, BookmarkPatch, NewBookmark};
use crate::error::AppError;

// Not flattened from PageParams: serde_urlencoded cannot parse numbers through `flatten`.
#[derive(Debug, Deserialize)]
pub struct BookmarksQuery {
    pub user_id: Option<i64>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

pub async fn list_bookmarks(
    ApiQuery(params): ApiQuery<BookmarksQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<Bookmark>>, AppError> {
    let page = state.page(&PageParams {
        skip: params.skip,
        limit: params.limit,
    })?;
    let bookmarks = state.repo.list_bookmarks(params.user_id, page).await?;
    Ok(Json(bookmarks))
}

pub async fn get_bookmark(
    ApiPath(id): ApiPath<i64>,
    State(state): State<AppState>,
) -> Result<Json<Bookmark>, AppError> {
    Ok(Json(state.repo.get_bookmark(id).await?))
}

pub async fn create_bookmark(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<NewBookmark>,
) -> Result<(StatusCode, Json<Bookmark>), AppError> {
    let new = payload.validated()?;
    let bookmark = state.repo.create_bookmark(&new).await?;
    Ok((StatusCode::CREATED, Json(bookmark)))
}

pub async fn update_bookmark(
    ApiPath(id): ApiPath<i64>,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<BookmarkPatch>,
) -> Result<Json<Bookmark>, AppError> {
    let patch = payload.validated()?;
    Ok(Json(state.repo.update_bookmark(id, &patch).await?))
}

pub async fn delete_bookmark(
    ApiPath(id): ApiPath<i64>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    state.repo.delete_bookmark(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
