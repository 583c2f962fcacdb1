use axum::extract::{Extension, State};
use serde::Deserialize;

use crate::database::models::{Comment, CommentChanges, NewComment};
use crate::database::{ReviewRelations, Table};
use crate::middleware::extract::require;
use crate::middleware::{ApiJson, ApiPath, ApiResponse, ApiResult, AuthUser, Message};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub review_id: i64,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCommentRequest {
    pub content: String,
}

/// POST /comments
pub async fn create_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiJson(body): ApiJson<CreateCommentRequest>,
) -> ApiResult<Comment> {
    require("content", &body.content)?;
    state.store.load_review(body.review_id, ReviewRelations::NONE).await?;

    let comment = state
        .store
        .insert_comment(NewComment {
            review_id: body.review_id,
            user_id: auth.id,
            content: body.content,
        })
        .await?;
    Ok(ApiResponse::created(comment))
}

/// GET /comments/:id, where the id is the review's
pub async fn list_comments(
    State(state): State<AppState>,
    ApiPath(review_id): ApiPath<i64>,
) -> ApiResult<Vec<Comment>> {
    let comments = state.store.list_comments(review_id).await?;
    Ok(ApiResponse::success(comments))
}

/// PUT /comments/:id
pub async fn update_comment(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<UpdateCommentRequest>,
) -> ApiResult<Comment> {
    require("content", &body.content)?;
    let comment = state
        .store
        .update_comment(id, CommentChanges { content: body.content })
        .await?;
    Ok(ApiResponse::success(comment))
}

/// DELETE /comments/:id
pub async fn delete_comment(State(state): State<AppState>, ApiPath(id): ApiPath<i64>) -> ApiResult<Message> {
    state.store.soft_delete(Table::Comments, id).await?;
    Ok(ApiResponse::message("comment deleted successfully"))
}
