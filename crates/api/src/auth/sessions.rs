//! Refresh-token persistence
//!
//! Store membership is the only revocation mechanism for refresh tokens:
//! logout deletes the row, and the refresh endpoint rejects any token that has
//! no row, whatever its signature says. Rows carry no expiry of their own.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::store::{StoreError, StoreResult};

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct RefreshTokenRecord {
    pub token: String,
    pub created_at: OffsetDateTime,
}

#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    /// Persist a freshly issued refresh token
    async fn save(&self, token: &str) -> StoreResult<()>;

    async fn find_by_token(&self, token: &str) -> StoreResult<Option<RefreshTokenRecord>>;

    /// Remove a token. Idempotent: returns whether a row existed.
    async fn delete_by_token(&self, token: &str) -> StoreResult<bool>;
}

pub struct PgTokenStore {
    pool: PgPool,
}

impl PgTokenStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshTokenStore for PgTokenStore {
    async fn save(&self, token: &str) -> StoreResult<()> {
        sqlx::query("INSERT INTO refresh_tokens (token) VALUES ($1)")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(|e| match e.as_database_error() {
                Some(db) if db.is_unique_violation() => StoreError::Duplicate("refresh token"),
                _ => StoreError::from(e),
            })?;

        Ok(())
    }

    async fn find_by_token(&self, token: &str) -> StoreResult<Option<RefreshTokenRecord>> {
        let record = sqlx::query_as::<_, RefreshTokenRecord>(
            "SELECT token, created_at FROM refresh_tokens WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn delete_by_token(&self, token: &str) -> StoreResult<bool> {
        let rows_affected = sqlx::query("DELETE FROM refresh_tokens WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(rows_affected > 0)
    }
}

#[derive(Default)]
pub struct MemoryTokenStore {
    tokens: RwLock<HashMap<String, RefreshTokenRecord>>,
}

impl MemoryTokenStore {
    /// Number of stored tokens
    pub async fn len(&self) -> usize {
        self.tokens.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tokens.read().await.is_empty()
    }
}

#[async_trait]
impl RefreshTokenStore for MemoryTokenStore {
    async fn save(&self, token: &str) -> StoreResult<()> {
        let mut tokens = self.tokens.write().await;
        if tokens.contains_key(token) {
            return Err(StoreError::Duplicate("refresh token"));
        }
        tokens.insert(
            token.to_string(),
            RefreshTokenRecord {
                token: token.to_string(),
                created_at: OffsetDateTime::now_utc(),
            },
        );
        Ok(())
    }

    async fn find_by_token(&self, token: &str) -> StoreResult<Option<RefreshTokenRecord>> {
        Ok(self.tokens.read().await.get(token).cloned())
    }

    async fn delete_by_token(&self, token: &str) -> StoreResult<bool> {
        Ok(self.tokens.write().await.remove(token).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_find_delete() {
        let store = MemoryTokenStore::default();
        store.save("tok-1").await.unwrap();

        let record = store.find_by_token("tok-1").await.unwrap().unwrap();
        assert_eq!(record.token, "tok-1");

        assert!(store.delete_by_token("tok-1").await.unwrap());
        assert!(store.find_by_token("tok-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = MemoryTokenStore::default();
        assert!(!store.delete_by_token("never-saved").await.unwrap());

        store.save("tok").await.unwrap();
        assert!(store.delete_by_token("tok").await.unwrap());
        assert!(!store.delete_by_token("tok").await.unwrap());
    }

    #[tokio::test]
    async fn test_independent_rows() {
        let store = MemoryTokenStore::default();
        store.save("a").await.unwrap();
        store.save("b").await.unwrap();
        assert_eq!(store.len().await, 2);

        store.delete_by_token("a").await.unwrap();
        assert!(store.find_by_token("b").await.unwrap().is_some());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_exact_match_only() {
        let store = MemoryTokenStore::default();
        store.save("abc").await.unwrap();
        assert!(store.find_by_token("ab").await.unwrap().is_none());
        assert!(store.find_by_token("abc ").await.unwrap().is_none());
        assert!(!store.delete_by_token("ABC").await.unwrap());
        assert!(!store.is_empty().await);
    }
}
