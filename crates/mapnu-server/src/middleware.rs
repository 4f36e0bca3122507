//! Session token authentication for protected routes

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::AppState;
use crate::error::ApiError;

/// Extract Bearer token from Authorization header
fn extract_bearer_token(request: &Request<Body>) -> Option<&str> {
    let auth_header = request.headers().get(header::AUTHORIZATION)?;
    let auth_str = auth_header.to_str().ok()?;
    auth_str
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Require a valid session token.
///
/// On success the verified [`Claims`](mapnu_auth::Claims) are added to the
/// request extensions for handlers to extract; otherwise the request is answered
/// with 401 and never reaches the handler.
pub async fn require_session(
    State(auth): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let Some(token) = extract_bearer_token(&request) else {
        debug!(path = %request.uri().path(), "Request without bearer token");
        return ApiError::missing_bearer().into_response();
    };

    let claims = match auth.verify_session_token(token) {
        Ok(claims) => claims,
        Err(e) => return ApiError::from(e).into_response(),
    };

    // Add authenticated user context to request extensions
    request.extensions_mut().insert(claims);
    next.run(request).await
}
