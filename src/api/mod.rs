pub mod bookmarks;
pub mod extract;
pub mod health;
pub mod status;
pub mod tags;
pub mod users;

use crate::config::Config;
use crate::db::Repository;
use crate::domain::Page;
use crate::error::AppError;
use axum::http::HeaderValue;
use axum::{routing::get, Router};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub config: Config,
}

impl AppState {
    pub fn new(repo: Arc<Repository>, config: Config) -> Self {
        Self { repo, config }
    }

    fn page(&self, params: &PageParams) -> Result<Page, AppError> {
        Ok(Page::new(
            params.skip,
            params.limit,
            self.config.max_page_limit,
        )?)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(parsed))
}

pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_allowed_origins);

    Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/api/status", get(status::get_status))
        .route(
            "/api/users",
            get(users::list_users).post(users::create_user),
        )
        .route(
            "/api/users/:id",
            get(users::get_user)
                .put(users::update_user)
                .patch(users::update_user)
                .delete(users::delete_user),
        )
        .route(
            "/api/bookmarks",
            get(bookmarks::list_bookmarks).post(bookmarks::create_bookmark),
        )
        .route(
            "/api/bookmarks/:id",
            get(bookmarks::get_bookmark)
                .put(bookmarks::update_bookmark)
                .patch(bookmarks::update_bookmark)
                .delete(bookmarks::delete_bookmark),
        )
        .route("/api/tags", get(tags::list_tags).post(tags::create_tag))
        .route(
            "/api/tags/:id",
            get(tags::get_tag)
                .put(tags::update_tag)
                .patch(tags::update_tag)
                .delete(tags::delete_tag),
        )
        .route("/api/tags/:id/usage", get(tags::get_tag_usage))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
