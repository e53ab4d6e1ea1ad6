//! Postgres-backed stores

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{
    Comment, CommentStore, NewComment, NewPost, NewUser, Post, PostFilter, PostStore, PostUpdate,
    StoreError, StoreResult, User, UserStore,
};

/// Map a unique-constraint violation to `Duplicate`, anything else to `Database`
fn map_unique(err: sqlx::Error, what: &'static str) -> StoreError {
    match err.as_database_error() {
        Some(db) if db.is_unique_violation() => StoreError::Duplicate(what),
        _ => StoreError::from(err),
    }
}

pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(&self, user: NewUser) -> StoreResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, name, password_hash)
            VALUES ($1, $2, $3)
            RETURNING username, name, password_hash, created_at
            "#,
        )
        .bind(&user.username)
        .bind(&user.name)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique(e, "username"))
    }

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT username, name, password_hash, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }
}

const POST_COLUMNS: &str =
    "id, title, sub_heading, description, picture, username, categories, created_date";

pub struct PgPostStore {
    pool: PgPool,
}

impl PgPostStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PostStore for PgPostStore {
    async fn create(&self, post: NewPost) -> StoreResult<Post> {
        let query = format!(
            r#"
            INSERT INTO posts (id, title, sub_heading, description, picture, username, categories)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {POST_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Post>(&query)
            .bind(Uuid::new_v4())
            .bind(&post.title)
            .bind(&post.sub_heading)
            .bind(&post.description)
            .bind(&post.picture)
            .bind(&post.username)
            .bind(&post.categories)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_unique(e, "post title"))
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<Post>> {
        let query = format!("SELECT {POST_COLUMNS} FROM posts WHERE id = $1");
        let post = sqlx::query_as::<_, Post>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(post)
    }

    async fn update(&self, id: Uuid, update: PostUpdate) -> StoreResult<Option<Post>> {
        // COALESCE keeps the stored value for every field the caller left out
        let query = format!(
            r#"
            UPDATE posts SET
                title = COALESCE($2, title),
                sub_heading = COALESCE($3, sub_heading),
                description = COALESCE($4, description),
                picture = COALESCE($5, picture),
                username = COALESCE($6, username),
                categories = COALESCE($7, categories)
            WHERE id = $1
            RETURNING {POST_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Post>(&query)
            .bind(id)
            .bind(update.title)
            .bind(update.sub_heading)
            .bind(update.description)
            .bind(update.picture)
            .bind(update.username)
            .bind(update.categories)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_unique(e, "post title"))
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let rows_affected = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(rows_affected > 0)
    }

    async fn list(&self, filter: PostFilter) -> StoreResult<Vec<Post>> {
        let posts = match filter {
            PostFilter::All => {
                let query = format!("SELECT {POST_COLUMNS} FROM posts ORDER BY created_date");
                sqlx::query_as::<_, Post>(&query)
                    .fetch_all(&self.pool)
                    .await?
            }
            PostFilter::Username(username) => {
                let query = format!(
                    "SELECT {POST_COLUMNS} FROM posts WHERE username = $1 ORDER BY created_date"
                );
                sqlx::query_as::<_, Post>(&query)
                    .bind(username)
                    .fetch_all(&self.pool)
                    .await?
            }
            PostFilter::Category(category) => {
                let query = format!(
                    "SELECT {POST_COLUMNS} FROM posts WHERE $1 = ANY(categories) ORDER BY created_date"
                );
                sqlx::query_as::<_, Post>(&query)
                    .bind(category)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        Ok(posts)
    }
}

pub struct PgCommentStore {
    pool: PgPool,
}

impl PgCommentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CommentStore for PgCommentStore {
    async fn create(&self, comment: NewComment) -> StoreResult<Comment> {
        let comment = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (id, post_id, username, content)
            VALUES ($1, $2, $3, $4)
            RETURNING id, post_id, username, content, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(comment.post_id)
        .bind(&comment.username)
        .bind(&comment.content)
        .fetch_one(&self.pool)
        .await?;

        Ok(comment)
    }

    async fn list_for_post(&self, post_id: Uuid) -> StoreResult<Vec<Comment>> {
        let comments = sqlx::query_as::<_, Comment>(
            r#"
            SELECT id, post_id, username, content, created_at
            FROM comments
            WHERE post_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(comments)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let rows_affected = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(rows_affected > 0)
    }
}
