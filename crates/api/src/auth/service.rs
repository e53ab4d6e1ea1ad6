//! Signup, login, logout and access-token refresh
//!
//! Orchestrates the credential hasher, the token issuer and the refresh-token
//! store. Route handlers stay thin and call into this.

use std::sync::Arc;

use serde::Serialize;

use super::jwt::{Identity, JwtManager};
use super::password::{self, TIMING_EQUALIZER_HASH};
use super::sessions::RefreshTokenStore;
use crate::error::{ApiError, ApiResult};
use crate::store::{NewUser, UserStore};

pub const USERNAME_MISMATCH: &str = "Username does not match";
pub const PASSWORD_MISMATCH: &str = "Password does not match";
pub const REFRESH_TOKEN_MISSING: &str = "Refresh token is missing";
pub const REFRESH_TOKEN_NOT_FOUND: &str = "Refresh token is not valid";
pub const REFRESH_TOKEN_INVALID: &str = "invalid refresh token";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub name: String,
    pub username: String,
}

#[derive(Clone)]
pub struct SessionService {
    users: Arc<dyn UserStore>,
    tokens: Arc<dyn RefreshTokenStore>,
    jwt_manager: JwtManager,
}

impl SessionService {
    pub fn new(
        users: Arc<dyn UserStore>,
        tokens: Arc<dyn RefreshTokenStore>,
        jwt_manager: JwtManager,
    ) -> Self {
        Self {
            users,
            tokens,
            jwt_manager,
        }
    }

    /// Register a user. No tokens are issued; the client logs in separately.
    pub async fn signup(&self, username: &str, name: &str, password: &str) -> ApiResult<()> {
        let password_hash = hash_blocking(password.to_string()).await?;

        self.users
            .create(NewUser {
                username: username.to_string(),
                name: name.to_string(),
                password_hash,
            })
            .await
            .map_err(|e| {
                tracing::warn!(username = %username, error = %e, "signup: failed to persist user");
                ApiError::Internal(format!("signup failed: {e}"))
            })?;

        tracing::info!(username = %username, "signup: user created");
        Ok(())
    }

    /// Verify credentials and mint an access/refresh pair.
    ///
    /// Every successful login stores a new refresh-token row; earlier rows for
    /// the same user are left alone.
    pub async fn login(&self, username: &str, password: &str) -> ApiResult<LoginResponse> {
        let Some(user) = self.users.find_by_username(username).await? else {
            // Spend the same hashing effort as a real check before answering
            let _ = verify_blocking(password.to_string(), TIMING_EQUALIZER_HASH.to_string()).await;
            tracing::info!(username = %username, "login: unknown username");
            return Err(ApiError::Authentication(USERNAME_MISMATCH.to_string()));
        };

        let matches = verify_blocking(password.to_string(), user.password_hash.clone()).await?;
        if !matches {
            tracing::info!(username = %username, "login: password mismatch");
            return Err(ApiError::Authentication(PASSWORD_MISMATCH.to_string()));
        }

        let identity = Identity::from(&user);
        let access_token = self.jwt_manager.issue_access(&identity)?;
        let refresh_token = self.jwt_manager.issue_refresh(&identity)?;
        self.tokens.save(&refresh_token).await?;

        tracing::info!(username = %username, "login: token pair issued");
        Ok(LoginResponse {
            access_token,
            refresh_token,
            name: user.name,
            username: user.username,
        })
    }

    /// Revoke a refresh token. Succeeds whether or not the token was stored.
    pub async fn logout(&self, refresh_token: &str) -> ApiResult<()> {
        let removed = self.tokens.delete_by_token(refresh_token).await?;
        tracing::info!(removed, "logout: refresh token deleted");
        Ok(())
    }

    /// Exchange a stored refresh token for a new access token.
    ///
    /// `raw` is `"<prefix> <refreshToken>"`. The refresh token itself is not
    /// rotated.
    pub async fn refresh(&self, raw: &str) -> ApiResult<String> {
        let token = raw
            .split(' ')
            .nth(1)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::Unauthorized(REFRESH_TOKEN_MISSING.to_string()))?;

        let record = self
            .tokens
            .find_by_token(token)
            .await?
            .ok_or_else(|| ApiError::NotFound(REFRESH_TOKEN_NOT_FOUND.to_string()))?;

        let claims = self.jwt_manager.verify_refresh(&record.token).map_err(|_| {
            tracing::warn!(token_len = record.token.len(), "refresh: stored token failed verification");
            ApiError::Unauthorized(REFRESH_TOKEN_INVALID.to_string())
        })?;

        let access_token = self.jwt_manager.issue_access(&claims.identity())?;
        tracing::debug!(username = %claims.sub, "refresh: access token issued");
        Ok(access_token)
    }
}

async fn hash_blocking(password: String) -> ApiResult<String> {
    tokio::task::spawn_blocking(move || password::hash_password(&password))
        .await
        .map_err(|e| ApiError::Internal(format!("hashing task failed: {e}")))?
        .map_err(ApiError::from)
}

async fn verify_blocking(password: String, hash: String) -> ApiResult<bool> {
    tokio::task::spawn_blocking(move || password::verify_password(&password, &hash))
        .await
        .map_err(|e| ApiError::Internal(format!("verification task failed: {e}")))?
        .map_err(ApiError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::sessions::MemoryTokenStore;
    use crate::store::memory::MemoryUserStore;

    fn service() -> (SessionService, Arc<MemoryTokenStore>, JwtManager) {
        let tokens = Arc::new(MemoryTokenStore::default());
        let jwt = JwtManager::new("svc-access", "svc-refresh");
        let svc = SessionService::new(
            Arc::new(MemoryUserStore::default()),
            tokens.clone(),
            jwt.clone(),
        );
        (svc, tokens, jwt)
    }

    #[tokio::test]
    async fn test_signup_issues_no_tokens() {
        let (svc, tokens, _) = service();
        svc.signup("jdoe", "J Doe", "secret123").await.unwrap();
        assert!(tokens.is_empty().await);
    }

    #[tokio::test]
    async fn test_duplicate_signup_is_server_error() {
        let (svc, _, _) = service();
        svc.signup("jdoe", "J Doe", "secret123").await.unwrap();
        let err = svc.signup("jdoe", "Other", "pw").await.unwrap_err();
        assert!(matches!(err, ApiError::Internal(_)));
    }

    #[tokio::test]
    async fn test_login_success_persists_refresh_token() {
        let (svc, tokens, jwt) = service();
        svc.signup("jdoe", "J Doe", "secret123").await.unwrap();

        let resp = svc.login("jdoe", "secret123").await.unwrap();
        assert_eq!(resp.username, "jdoe");
        assert_eq!(resp.name, "J Doe");
        assert!(tokens
            .find_by_token(&resp.refresh_token)
            .await
            .unwrap()
            .is_some());

        let claims = jwt.verify_access(&resp.access_token).unwrap();
        assert_eq!(claims.sub, "jdoe");
    }

    #[tokio::test]
    async fn test_login_failures() {
        let (svc, tokens, _) = service();
        svc.signup("jdoe", "J Doe", "secret123").await.unwrap();

        match svc.login("nobody", "secret123").await {
            Err(ApiError::Authentication(msg)) => assert_eq!(msg, USERNAME_MISMATCH),
            other => panic!("expected username mismatch, got {other:?}"),
        }
        match svc.login("jdoe", "wrong").await {
            Err(ApiError::Authentication(msg)) => assert_eq!(msg, PASSWORD_MISMATCH),
            other => panic!("expected password mismatch, got {other:?}"),
        }
        assert!(tokens.is_empty().await);
    }

    #[tokio::test]
    async fn test_refresh_after_logout_is_not_found() {
        let (svc, _, _) = service();
        svc.signup("jdoe", "J Doe", "secret123").await.unwrap();
        let resp = svc.login("jdoe", "secret123").await.unwrap();
        let raw = format!("Bearer {}", resp.refresh_token);

        assert!(svc.refresh(&raw).await.is_ok());

        svc.logout(&resp.refresh_token).await.unwrap();
        match svc.refresh(&raw).await {
            Err(ApiError::NotFound(msg)) => assert_eq!(msg, REFRESH_TOKEN_NOT_FOUND),
            other => panic!("expected not found, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_logout_unknown_token_succeeds() {
        let (svc, _, _) = service();
        svc.logout("never-issued").await.unwrap();
        svc.logout("").await.unwrap();
    }

    #[tokio::test]
    async fn test_refresh_missing_segment() {
        let (svc, _, _) = service();
        for raw in ["", "Bearer", "Bearer "] {
            match svc.refresh(raw).await {
                Err(ApiError::Unauthorized(msg)) => assert_eq!(msg, REFRESH_TOKEN_MISSING),
                other => panic!("expected missing token for {raw:?}, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_refresh_rejects_stored_token_with_bad_signature() {
        let (svc, tokens, _) = service();
        tokens.save("not-a-jwt").await.unwrap();

        match svc.refresh("Bearer not-a-jwt").await {
            Err(ApiError::Unauthorized(msg)) => assert_eq!(msg, REFRESH_TOKEN_INVALID),
            other => panic!("expected invalid refresh token, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_refresh_issues_access_for_same_identity() {
        let (svc, _, jwt) = service();
        svc.signup("jdoe", "J Doe", "secret123").await.unwrap();
        let resp = svc.login("jdoe", "secret123").await.unwrap();

        let access = svc
            .refresh(&format!("Token {}", resp.refresh_token))
            .await
            .unwrap();
        let claims = jwt.verify_access(&access).unwrap();
        assert_eq!(claims.sub, "jdoe");
        assert_eq!(claims.name, "J Doe");
    }
}
