//! Authentication routes

use axum::{extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

use crate::{
    auth::LoginResponse,
    error::{ApiError, ApiResult},
    extract::Json,
    routes::MessageResponse,
    state::AppState,
};

/// Fields are optional so a missing one gets a message naming every required
/// field.
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub username: Option<String>,
    pub name: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Register a new user
pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let (Some(username), Some(name), Some(password)) = (
        present(req.username),
        present(req.name),
        present(req.password),
    ) else {
        return Err(ApiError::Validation(
            "Username, name, and password are required".to_string(),
        ));
    };

    state.sessions.signup(&username, &name, &password).await?;
    Ok(Json(MessageResponse::new("Signup successful")))
}

/// Login with username and password
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let (Some(username), Some(password)) = (present(req.username), present(req.password)) else {
        return Err(ApiError::Validation(
            "Username and password are required".to_string(),
        ));
    };

    let response = state.sessions.login(&username, &password).await?;
    Ok(Json(response))
}

/// Revoke a refresh token. Always 204 unless the store fails.
pub async fn logout(
    State(state): State<AppState>,
    Json(req): Json<TokenRequest>,
) -> ApiResult<StatusCode> {
    if let Some(token) = req.token {
        state.sessions.logout(&token).await?;
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Exchange `"<prefix> <refreshToken>"` for a fresh access token
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(req): Json<TokenRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    let raw = req.token.unwrap_or_default();
    let access_token = state.sessions.refresh(&raw).await?;
    Ok(Json(RefreshResponse { access_token }))
}
