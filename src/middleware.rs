//! Request authentication for the `/api` routes
//!
//! Two checks live here: an optional shared secret in the `Authorization`
//! header, and the `X-User-Id` header that identifies the caller. Token
//! issuance and validation belong to the auth service in front of Athena.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::route::AppState;

/// Header carrying the authenticated user's id.
pub const USER_ID_HEADER: &str = "x-user-id";

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "error": "Unauthorized",
            "message": message
        })),
    )
        .into_response()
}

/// Middleware to check for the Authorization header
///
/// When `AppState::auth_token` is set, the request must carry an
/// `Authorization` header with exactly that value. When it is unset the
/// check is skipped.
pub async fn auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    if let Some(secret) = state.auth_token.as_deref() {
        let presented = headers
            .get("Authorization")
            .and_then(|value| value.to_str().ok());

        if presented != Some(secret) {
            return Err(unauthorized("Invalid or missing authorization header"));
        }
    }

    Ok(next.run(request).await)
}

/// The user a request acts on behalf of, taken from `X-User-Id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser(pub String);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| AuthUser(value.to_string()))
            .ok_or_else(|| unauthorized("Missing X-User-Id header"))
    }
}
