//! HTTP error responses
//!
//! Every failure is rendered as `{"error": ..., "error_description": ...}` with
//! the matching status code.

use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use mapnu_auth::AuthError;
use serde_json::json;

/// Error returned by handlers and the bearer middleware
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: &'static str,
    description: String,
}

impl ApiError {
    /// 400 for request bodies that do not decode
    pub fn bad_request(description: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: "invalid_request",
            description: description.into(),
        }
    }

    /// 401 for a missing or unusable `Authorization` header
    pub fn missing_bearer() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            error: "unauthorized",
            description: "Valid bearer token required".to_string(),
        }
    }

    /// Status code of this error
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        if err.is_unauthorized() {
            Self {
                status: StatusCode::UNAUTHORIZED,
                error: "invalid_token",
                description: err.to_string(),
            }
        } else {
            tracing::error!(error = %err, "Authentication service failure");
            Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                error: "server_error",
                description: "Failed to issue session token".to_string(),
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.error,
            "error_description": self.description,
        }));
        let mut resp = (self.status, body).into_response();

        if self.status == StatusCode::UNAUTHORIZED {
            resp.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                header::HeaderValue::from_static("Bearer"),
            );
        }

        resp
    }
}
