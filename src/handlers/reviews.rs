use axum::extract::{Extension, State};
use serde::Deserialize;

use crate::database::models::{NewReview, Review, ReviewChanges, ReviewDetail};
use crate::database::{PhoneRelations, ReviewFilter, ReviewRelations, Table};
use crate::middleware::extract::{require, validate_rating};
use crate::middleware::{ApiJson, ApiPath, ApiResponse, ApiResult, AuthUser, Message};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateReviewRequest {
    pub phone_id: i64,
    pub rating: i32,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateReviewRequest {
    pub rating: i32,
    pub content: String,
}

/// GET /reviews
pub async fn list_reviews(State(state): State<AppState>) -> ApiResult<Vec<ReviewDetail>> {
    let reviews = state
        .store
        .list_reviews(ReviewFilter::default(), ReviewRelations::ALL)
        .await?;
    Ok(ApiResponse::success(reviews))
}

/// GET /reviews/:id
pub async fn get_review(State(state): State<AppState>, ApiPath(id): ApiPath<i64>) -> ApiResult<ReviewDetail> {
    let review = state.store.load_review(id, ReviewRelations::ALL).await?;
    Ok(ApiResponse::success(review))
}

/// POST /reviews
///
/// The author is the token holder, never a body field.
pub async fn create_review(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiJson(body): ApiJson<CreateReviewRequest>,
) -> ApiResult<Review> {
    validate_rating(body.rating)?;
    require("content", &body.content)?;
    state.store.load_phone(body.phone_id, PhoneRelations::NONE).await?;

    let review = state
        .store
        .insert_review(NewReview {
            phone_id: body.phone_id,
            user_id: auth.id,
            rating: body.rating,
            content: body.content,
        })
        .await?;
    tracing::info!("User {} reviewed phone {} ({}/5)", auth.id, review.phone_id, review.rating);
    Ok(ApiResponse::created(review))
}

/// PUT /reviews/:id
pub async fn update_review(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<UpdateReviewRequest>,
) -> ApiResult<Review> {
    validate_rating(body.rating)?;
    require("content", &body.content)?;

    let review = state
        .store
        .update_review(
            id,
            ReviewChanges {
                rating: body.rating,
                content: body.content,
            },
        )
        .await?;
    Ok(ApiResponse::success(review))
}

/// DELETE /reviews/:id
pub async fn delete_review(State(state): State<AppState>, ApiPath(id): ApiPath<i64>) -> ApiResult<Message> {
    state.store.soft_delete(Table::Reviews, id).await?;
    Ok(ApiResponse::message("review deleted successfully"))
}
