//! Route definitions for the bookmark API
//!
//! This module configures all HTTP routes and maps them to their handlers.

use std::sync::Arc;

use axum::routing::{get, put};
use axum::{middleware, Router};

use crate::handler::{
    archive_bookmark, create_bookmark, delete_bookmark, get_bookmark, health, list_bookmarks,
};
use crate::middleware::auth_middleware;
use crate::service::BookmarkService;

/// Application state shared across all request handlers
#[derive(Clone)]
pub struct AppState {
    pub service: BookmarkService,

    /// Shared secret required on `/api` routes, if any
    pub auth_token: Option<Arc<str>>,
}

impl AppState {
    pub fn new(service: BookmarkService, auth_token: Option<String>) -> Self {
        Self {
            service,
            auth_token: auth_token.map(Arc::from),
        }
    }
}

/// Creates the router with all routes configured
///
/// # Route Definitions
///
/// - `GET /health` - Liveness probe (public)
/// - `POST /api/bookmarks` - Creates and enriches a bookmark
/// - `GET /api/bookmarks` - Lists bookmarks, paginated when `page`/`page_size` are given
/// - `GET /api/bookmarks/{id}` - Fetches one bookmark
/// - `PUT /api/bookmarks/{id}/archive` - Archives a bookmark
/// - `DELETE /api/bookmarks/{id}` - Deletes a bookmark
///
/// All `/api` routes pass through `auth_middleware` and act on behalf of
/// the user named in `X-User-Id`.
pub fn create_app(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/bookmarks", get(list_bookmarks).post(create_bookmark))
        .route("/bookmarks/{id}", get(get_bookmark).delete(delete_bookmark))
        .route("/bookmarks/{id}/archive", put(archive_bookmark))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/health", get(health))
        .nest("/api", api_routes)
        .with_state(state)
}
