use axum::extract::State;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::database::models::{NewProfile, UserDetail};
use crate::database::UserRelations;
use crate::error::ApiError;
use crate::middleware::{ApiJson, ApiPath, ApiResponse, ApiResult, Message};
use crate::state::AppState;

/// Public view of a user with profile and authored reviews
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<ProfileSummary>,
    pub reviews: Vec<ReviewSummary>,
}

#[derive(Debug, Serialize)]
pub struct ProfileSummary {
    pub full_name: String,
    pub bio: String,
}

#[derive(Debug, Serialize)]
pub struct ReviewSummary {
    pub id: i64,
    pub phone_id: i64,
    pub rating: i32,
    pub content: String,
}

impl From<UserDetail> for UserResponse {
    fn from(detail: UserDetail) -> Self {
        Self {
            id: detail.user.id,
            username: detail.user.username,
            profile: detail.profile.map(|p| ProfileSummary {
                full_name: p.full_name,
                bio: p.bio,
            }),
            reviews: detail
                .reviews
                .unwrap_or_default()
                .into_iter()
                .map(|r| ReviewSummary {
                    id: r.id,
                    phone_id: r.phone_id,
                    rating: r.rating,
                    content: r.content,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ProfileRequest {
    pub full_name: String,
    #[serde(default)]
    pub bio: String,
}

/// GET /users/:id
pub async fn get_user(State(state): State<AppState>, ApiPath(id): ApiPath<i64>) -> ApiResult<UserResponse> {
    let detail = state.store.load_user(id, UserRelations::ALL).await?;
    Ok(ApiResponse::success(detail.into()))
}

/// PUT /users/:id/profile
///
/// Creates the profile on first use, afterwards updates it in place.
pub async fn update_profile(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<ProfileRequest>,
) -> ApiResult<Message> {
    state.store.find_user(id).await?;

    match state.store.find_profile_by_user(id).await {
        Ok(profile) if profile.user_id != id => {
            return Err(ApiError::bad_request("profile does not belong to this user"));
        }
        Ok(_) => {}
        Err(e) if e.is_not_found() => {}
        Err(e) => return Err(e.into()),
    }

    let profile = state
        .store
        .upsert_profile(NewProfile {
            user_id: id,
            full_name: body.full_name,
            bio: body.bio,
        })
        .await?;
    info!("Saved profile {} for user {}", profile.id, id);

    Ok(ApiResponse::message("profile updated successfully"))
}
