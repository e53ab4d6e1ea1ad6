//! Access and refresh token issuance and verification
//!
//! Two token classes, two independent HMAC secrets. Access tokens expire
//! after a fixed window and are verified statelessly. Refresh tokens carry
//! no expiry; whether one is still usable is decided by the token store.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::store::User;

/// Access-token validity window
pub const ACCESS_TOKEN_TTL_MINUTES: i64 = 15;

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("failed to sign token: {0}")]
    Signing(String),
    #[error("token is invalid or expired")]
    Invalid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// The identity a token speaks for. Never includes the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub username: String,
    pub name: String,
}

impl From<&User> for Identity {
    fn from(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            name: user.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Username
    pub sub: String,
    pub name: String,
    /// Unique per token, so two logins in the same second never collide
    pub jti: Uuid,
    pub iat: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    pub token_type: TokenType,
}

impl Claims {
    pub fn identity(&self) -> Identity {
        Identity {
            username: self.sub.clone(),
            name: self.name.clone(),
        }
    }
}

/// Signs and verifies both token classes
#[derive(Clone)]
pub struct JwtManager {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
}

impl JwtManager {
    pub fn new(access_secret: &str, refresh_secret: &str) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(access_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(access_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(refresh_secret.as_bytes()),
        }
    }

    /// Issue an access token valid for `ACCESS_TOKEN_TTL_MINUTES`
    pub fn issue_access(&self, identity: &Identity) -> Result<String, JwtError> {
        self.issue_access_at(identity, OffsetDateTime::now_utc())
    }

    pub(crate) fn issue_access_at(
        &self,
        identity: &Identity,
        issued_at: OffsetDateTime,
    ) -> Result<String, JwtError> {
        let expires_at = issued_at + Duration::minutes(ACCESS_TOKEN_TTL_MINUTES);
        let claims = Claims {
            sub: identity.username.clone(),
            name: identity.name.clone(),
            jti: Uuid::new_v4(),
            iat: issued_at.unix_timestamp(),
            exp: Some(expires_at.unix_timestamp()),
            token_type: TokenType::Access,
        };
        sign(&claims, &self.access_encoding)
    }

    /// Issue a refresh token. It has no `exp` claim.
    pub fn issue_refresh(&self, identity: &Identity) -> Result<String, JwtError> {
        let claims = Claims {
            sub: identity.username.clone(),
            name: identity.name.clone(),
            jti: Uuid::new_v4(),
            iat: OffsetDateTime::now_utc().unix_timestamp(),
            exp: None,
            token_type: TokenType::Refresh,
        };
        sign(&claims, &self.refresh_encoding)
    }

    /// Check signature and expiry against the access secret
    pub fn verify_access(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let claims = decode::<Claims>(token, &self.access_decoding, &validation)
            .map_err(|_| JwtError::Invalid)?
            .claims;

        if claims.token_type != TokenType::Access {
            return Err(JwtError::Invalid);
        }
        Ok(claims)
    }

    /// Check the signature against the refresh secret. Expiry is not enforced.
    pub fn verify_refresh(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let claims = decode::<Claims>(token, &self.refresh_decoding, &validation)
            .map_err(|_| JwtError::Invalid)?
            .claims;

        if claims.token_type != TokenType::Refresh {
            return Err(JwtError::Invalid);
        }
        Ok(claims)
    }
}

fn sign(claims: &Claims, key: &EncodingKey) -> Result<String, JwtError> {
    encode(&Header::new(Algorithm::HS256), claims, key).map_err(|e| JwtError::Signing(e.to_string()))
}
