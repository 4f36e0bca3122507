//! Route handlers

use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
};
use mapnu_auth::{Claims, LoginResponse};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::AppState;
use crate::error::ApiError;

/// Body of `POST /auth/google`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GoogleLoginRequest {
    /// ID token obtained from Google sign-in
    pub id_token: String,
}

/// Body of `GET /user/profile`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct UserProfile {
    /// Given name
    pub given_name: String,
    /// Family name
    pub family_name: String,
}

/// Exchange a Google ID token for a session token
pub async fn google_login(
    State(auth): State<AppState>,
    payload: Result<Json<GoogleLoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    let login = auth.exchange(&request.id_token).await?;
    Ok(Json(login))
}

/// Names of the user the session token was issued to
pub async fn user_profile(Extension(claims): Extension<Claims>) -> Json<UserProfile> {
    Json(UserProfile {
        given_name: claims.given_name,
        family_name: claims.family_name,
    })
}

/// Health check handler - returns service health status
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
