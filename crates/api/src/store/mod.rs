//! Persistence interfaces for users, posts and comments
//!
//! Handlers and services only see the traits below. Two backends implement
//! them: Postgres (`postgres`) for deployments and an in-process map
//! (`memory`) for tests and database-less runs.

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::sessions::{MemoryTokenStore, PgTokenStore, RefreshTokenStore};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique key already exists
    #[error("duplicate {0}")]
    Duplicate(&'static str),
    #[error("database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Stored user identity. The password hash never leaves the server.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub username: String,
    pub name: String,
    pub password_hash: String,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub name: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub sub_heading: String,
    pub description: Option<String>,
    pub picture: Option<String>,
    pub username: String,
    pub categories: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_date: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub sub_heading: String,
    pub description: Option<String>,
    pub picture: Option<String>,
    pub username: String,
    pub categories: Vec<String>,
}

/// Partial update; `None` leaves the field as is
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostUpdate {
    pub title: Option<String>,
    pub sub_heading: Option<String>,
    pub description: Option<String>,
    pub picture: Option<String>,
    pub username: Option<String>,
    pub categories: Option<Vec<String>>,
}

impl PostUpdate {
    pub(crate) fn apply(self, post: &mut Post) {
        if let Some(title) = self.title {
            post.title = title;
        }
        if let Some(sub_heading) = self.sub_heading {
            post.sub_heading = sub_heading;
        }
        if let Some(description) = self.description {
            post.description = Some(description);
        }
        if let Some(picture) = self.picture {
            post.picture = Some(picture);
        }
        if let Some(username) = self.username {
            post.username = username;
        }
        if let Some(categories) = self.categories {
            post.categories = categories;
        }
    }
}

/// Listing filter. A username filter takes precedence over a category.
#[derive(Debug, Clone, Default)]
pub enum PostFilter {
    #[default]
    All,
    Username(String),
    Category(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub username: String,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub post_id: Uuid,
    pub username: String,
    pub content: String,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user. A taken username yields `StoreError::Duplicate`.
    async fn create(&self, user: NewUser) -> StoreResult<User>;
    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>>;
}

#[async_trait]
pub trait PostStore: Send + Sync {
    async fn create(&self, post: NewPost) -> StoreResult<Post>;
    async fn get(&self, id: Uuid) -> StoreResult<Option<Post>>;
    /// Returns the updated post, or `None` if no post has this id
    async fn update(&self, id: Uuid, update: PostUpdate) -> StoreResult<Option<Post>>;
    /// Returns whether a post was removed
    async fn delete(&self, id: Uuid) -> StoreResult<bool>;
    async fn list(&self, filter: PostFilter) -> StoreResult<Vec<Post>>;
}

#[async_trait]
pub trait CommentStore: Send + Sync {
    async fn create(&self, comment: NewComment) -> StoreResult<Comment>;
    /// Comments on a post, oldest first
    async fn list_for_post(&self, post_id: Uuid) -> StoreResult<Vec<Comment>>;
    async fn delete(&self, id: Uuid) -> StoreResult<bool>;
}

/// Every store the server needs, behind trait objects
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub refresh_tokens: Arc<dyn RefreshTokenStore>,
    pub posts: Arc<dyn PostStore>,
    pub comments: Arc<dyn CommentStore>,
}

impl Stores {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(postgres::PgUserStore::new(pool.clone())),
            refresh_tokens: Arc::new(PgTokenStore::new(pool.clone())),
            posts: Arc::new(postgres::PgPostStore::new(pool.clone())),
            comments: Arc::new(postgres::PgCommentStore::new(pool)),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            users: Arc::new(memory::MemoryUserStore::default()),
            refresh_tokens: Arc::new(MemoryTokenStore::default()),
            posts: Arc::new(memory::MemoryPostStore::default()),
            comments: Arc::new(memory::MemoryCommentStore::default()),
        }
    }
}
