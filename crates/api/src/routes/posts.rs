//! Post routes

use axum::extract::State;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    error::{ApiError, ApiResult},
    extract::{Json, Path, Query},
    routes::MessageResponse,
    state::AppState,
    store::{NewPost, Post, PostFilter, PostUpdate},
};

const POST_NOT_FOUND: &str = "Post not found";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    pub title: Option<String>,
    pub sub_heading: Option<String>,
    pub description: Option<String>,
    pub picture: Option<String>,
    pub username: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CreatePostResponse {
    pub msg: String,
    pub post: Post,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListPostsQuery {
    pub username: Option<String>,
    pub category: Option<String>,
}

impl From<ListPostsQuery> for PostFilter {
    fn from(query: ListPostsQuery) -> Self {
        match (query.username, query.category) {
            (Some(username), _) if !username.is_empty() => PostFilter::Username(username),
            (_, Some(category)) if !category.is_empty() => PostFilter::Category(category),
            _ => PostFilter::All,
        }
    }
}

pub(crate) fn parse_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ApiError::Validation("Invalid post ID format".to_string()))
}

pub async fn create_post(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<CreatePostRequest>,
) -> ApiResult<Json<CreatePostResponse>> {
    let filled = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
    let (Some(title), Some(sub_heading), Some(description), Some(username)) = (
        filled(req.title),
        filled(req.sub_heading),
        filled(req.description),
        filled(req.username),
    ) else {
        return Err(ApiError::Validation(
            "Title, subHeading, description, and username are required".to_string(),
        ));
    };

    let post = state
        .stores
        .posts
        .create(NewPost {
            title,
            sub_heading,
            description: Some(description),
            picture: req.picture,
            username,
            categories: req.categories,
        })
        .await?;

    tracing::info!(post_id = %post.id, author = %user.username, "Post created");
    Ok(Json(CreatePostResponse {
        msg: "Post saved successfully".to_string(),
        post,
    }))
}

/// List posts, optionally by author or category
pub async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<ListPostsQuery>,
) -> ApiResult<Json<Vec<Post>>> {
    let posts = state.stores.posts.list(query.into()).await?;
    Ok(Json(posts))
}

pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Post>> {
    let id = parse_id(&id)?;
    state
        .stores
        .posts
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(POST_NOT_FOUND.to_string()))
}

pub async fn update_post(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(update): Json<PostUpdate>,
) -> ApiResult<Json<MessageResponse>> {
    let id = parse_id(&id)?;
    state
        .stores
        .posts
        .update(id, update)
        .await?
        .ok_or_else(|| ApiError::NotFound(POST_NOT_FOUND.to_string()))?;

    tracing::info!(post_id = %id, by = %user.username, "Post updated");
    Ok(Json(MessageResponse::new("Post updated successfully")))
}

pub async fn delete_post(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let id = parse_id(&id)?;
    if !state.stores.posts.delete(id).await? {
        return Err(ApiError::NotFound(POST_NOT_FOUND.to_string()));
    }

    tracing::info!(post_id = %id, by = %user.username, "Post deleted");
    Ok(Json(MessageResponse::new("Post deleted successfully")))
}
