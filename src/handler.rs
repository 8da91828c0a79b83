//! HTTP request handlers for the bookmark API
//!
//! Handlers translate requests into service calls and enforce ownership: a
//! bookmark can only be read, archived or deleted by the user it belongs to.
//! The service itself trusts the ids it is given.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, warn};

use crate::error::{ErrorKind, ServiceError};
use crate::middleware::AuthUser;
use crate::model::{Bookmark, CreateBookmark, CreateRequest, ListParams};
use crate::pagination::DEFAULT_PAGE_SIZE;
use crate::route::AppState;

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let status = match kind {
            ErrorKind::InvalidArgument => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::EnrichmentFailed => StatusCode::BAD_GATEWAY,
            ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }

        (
            status,
            Json(json!({
                "error": self.to_string(),
                "code": kind.code()
            })),
        )
            .into_response()
    }
}

fn forbidden() -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(json!({
            "error": "You are not authorized to access this bookmark",
            "code": "forbidden"
        })),
    )
        .into_response()
}

/// Loads a bookmark and checks it belongs to `user`.
fn owned_bookmark(state: &AppState, user: &AuthUser, id: &str) -> Result<Bookmark, Response> {
    let bookmark = state
        .service
        .get_bookmark(id)
        .map_err(IntoResponse::into_response)?;

    if bookmark.user_id != user.0 {
        warn!(id, owner = %bookmark.user_id, requester = %user.0, "ownership check failed");
        return Err(forbidden());
    }
    Ok(bookmark)
}

/// Creates a bookmark for the calling user
///
/// # Request Body
///
/// ```json
/// { "url": "https://example.com/article" }
/// ```
///
/// # Response
///
/// - **201 Created** - The stored, enriched bookmark
/// - **400 Bad Request** - An `id` was supplied or the URL is empty/invalid
/// - **502 Bad Gateway** - A fetch stage failed
pub async fn create_bookmark(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateRequest>,
) -> Response {
    let input = CreateBookmark {
        id: payload.id,
        user_id: user.0,
        url: payload.url,
    };

    match state.service.create_bookmark(input).await {
        Ok(bookmark) => (StatusCode::CREATED, Json(bookmark)).into_response(),
        Err(err) => err.into_response(),
    }
}

/// Lists the caller's bookmarks
///
/// `GET /api/bookmarks?archived=false` returns every matching bookmark as a
/// JSON array. Adding `page` and/or `page_size` returns a pagination
/// envelope instead:
///
/// ```json
/// {
///   "bookmarks": [...],
///   "total_count": 95,
///   "page": 2,
///   "page_size": 20,
///   "total_pages": 5
/// }
/// ```
pub async fn list_bookmarks(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<ListParams>,
) -> Response {
    if params.page.is_none() && params.page_size.is_none() {
        return match state.service.get_all_bookmarks(&user.0, params.archived) {
            Ok(bookmarks) => Json(bookmarks).into_response(),
            Err(err) => err.into_response(),
        };
    }

    let page = params.page.unwrap_or(1);
    let page_size = params.page_size.unwrap_or(i64::from(DEFAULT_PAGE_SIZE));
    match state
        .service
        .get_bookmarks_with_pagination(&user.0, params.archived, page, page_size)
    {
        Ok(result) => Json(result).into_response(),
        Err(err) => err.into_response(),
    }
}

/// Returns one bookmark owned by the caller
///
/// - **404 Not Found** - No such bookmark
/// - **403 Forbidden** - The bookmark belongs to another user
pub async fn get_bookmark(
    Path(id): Path<String>,
    State(state): State<AppState>,
    user: AuthUser,
) -> Response {
    match owned_bookmark(&state, &user, &id) {
        Ok(bookmark) => Json(bookmark).into_response(),
        Err(response) => response,
    }
}

/// Archives a bookmark owned by the caller. Archiving twice succeeds.
pub async fn archive_bookmark(
    Path(id): Path<String>,
    State(state): State<AppState>,
    user: AuthUser,
) -> Response {
    if let Err(response) = owned_bookmark(&state, &user, &id) {
        return response;
    }

    match state.service.archive_bookmark(&id) {
        Ok(bookmark) => Json(bookmark).into_response(),
        Err(err) => err.into_response(),
    }
}

/// Permanently deletes a bookmark owned by the caller
///
/// # Response
///
/// - **200 OK** - `{ "message": ..., "deleted_id": ... }`
/// - **404 Not Found** - No such bookmark
/// - **403 Forbidden** - The bookmark belongs to another user
pub async fn delete_bookmark(
    Path(id): Path<String>,
    State(state): State<AppState>,
    user: AuthUser,
) -> Response {
    if let Err(response) = owned_bookmark(&state, &user, &id) {
        return response;
    }

    match state.service.delete_bookmark(&id) {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "message": "Bookmark deleted successfully",
                "deleted_id": id
            })),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

/// Liveness probe.
pub async fn health() -> &'static str {
    "ok"
}
