//! Authentication middleware for Axum
//!
//! `authorize` is the capability check: it turns the raw `Authorization`
//! header into a typed outcome without touching any store. `require_auth`
//! composes it in front of protected handlers and hands the verified identity
//! to them through request extensions.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use super::jwt::{Claims, JwtManager};
use crate::error::ApiError;

/// Verified identity of the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub username: String,
    pub name: String,
    /// `jti` of the access token that authenticated this request
    pub token_id: Uuid,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            username: claims.sub,
            name: claims.name,
            token_id: claims.jti,
        }
    }
}

/// Result of checking a request's credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Authorized(AuthUser),
    /// No usable bearer token (401)
    Unauthorized,
    /// Token present but bad signature or expired (403)
    Forbidden,
}

/// State needed for authentication
#[derive(Clone)]
pub struct AuthState {
    pub jwt_manager: JwtManager,
}

/// Pull the token out of an `Authorization` value.
///
/// The token is the second space-delimited segment, so `Bearer <token>` works
/// and a value without a space yields nothing.
pub fn extract_bearer_token(header: Option<&str>) -> Option<&str> {
    header
        .and_then(|value| value.split(' ').nth(1))
        .filter(|token| !token.is_empty())
}

/// Check an `Authorization` header value against the access secret
pub fn authorize(jwt_manager: &JwtManager, header: Option<&str>) -> AuthOutcome {
    let Some(token) = extract_bearer_token(header) else {
        return AuthOutcome::Unauthorized;
    };

    match jwt_manager.verify_access(token) {
        Ok(claims) => AuthOutcome::Authorized(claims.into()),
        Err(_) => AuthOutcome::Forbidden,
    }
}

/// Middleware that requires a valid access token
pub async fn require_auth(
    State(auth_state): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    match authorize(&auth_state.jwt_manager, header) {
        AuthOutcome::Authorized(auth_user) => {
            tracing::debug!(path = %path, username = %auth_user.username, "require_auth: authenticated");
            request.extensions_mut().insert(auth_user);
            next.run(request).await
        }
        AuthOutcome::Unauthorized => {
            tracing::warn!(path = %path, "require_auth: token missing");
            ApiError::TokenMissing.into_response()
        }
        AuthOutcome::Forbidden => {
            tracing::warn!(path = %path, "require_auth: invalid or expired token");
            ApiError::TokenInvalid.into_response()
        }
    }
}

/// Handlers behind `require_auth` take `AuthUser` as an extractor
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(ApiError::TokenMissing)
    }
}
