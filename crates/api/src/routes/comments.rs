//! Comment routes

use axum::extract::State;
use serde::Deserialize;

use crate::{
    auth::AuthUser,
    error::{ApiError, ApiResult},
    extract::{Json, Path},
    routes::{posts::parse_id, MessageResponse},
    state::AppState,
    store::{Comment, NewComment},
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    pub post_id: Option<String>,
    pub username: Option<String>,
    pub content: Option<String>,
}

pub async fn create_comment(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<CreateCommentRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let filled = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
    let (Some(post_id), Some(username), Some(content)) = (
        filled(req.post_id),
        filled(req.username),
        filled(req.content),
    ) else {
        return Err(ApiError::Validation(
            "postId, username, and content are required".to_string(),
        ));
    };
    let post_id = parse_id(&post_id)?;

    let comment = state
        .stores
        .comments
        .create(NewComment {
            post_id,
            username,
            content,
        })
        .await?;

    tracing::info!(comment_id = %comment.id, post_id = %post_id, by = %user.username, "Comment created");
    Ok(Json(MessageResponse::new("Comment saved successfully")))
}

/// Comments for a post, oldest first
pub async fn list_comments(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> ApiResult<Json<Vec<Comment>>> {
    let post_id = parse_id(&post_id)?;
    let comments = state.stores.comments.list_for_post(post_id).await?;
    Ok(Json(comments))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let id = uuid::Uuid::parse_str(&id)
        .map_err(|_| ApiError::Validation("Invalid comment ID format".to_string()))?;

    if !state.stores.comments.delete(id).await? {
        return Err(ApiError::NotFound("Comment not found".to_string()));
    }

    tracing::info!(comment_id = %id, by = %user.username, "Comment deleted");
    Ok(Json(MessageResponse::new("Comment deleted successfully")))
}
