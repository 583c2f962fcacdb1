use axum::extract::{Extension, State};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::Identity;
use crate::database::models::{NewUser, User};
use crate::database::UserRelations;
use crate::error::ApiError;
use crate::handlers::users::UserResponse;
use crate::middleware::extract::{require, validate_username};
use crate::middleware::{ApiJson, ApiPath, ApiResponse, ApiResult, AuthUser, Message};
use crate::state::AppState;

const INVALID_CREDENTIALS: &str = "invalid credentials";

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: SessionUser,
}

#[derive(Debug, Serialize)]
pub struct SessionUser {
    pub id: i64,
    pub username: String,
}

/// POST /auth/register
pub async fn register(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<Credentials>,
) -> ApiResult<Message> {
    validate_username(&body.username)?;
    require("password", &body.password)?;

    let password_hash = state.passwords.hash_blocking(body.password).await?;
    let user = state
        .store
        .insert_user(NewUser {
            username: body.username,
            password_hash,
        })
        .await?;

    info!("Registered user '{}' (id {})", user.username, user.id);
    Ok(ApiResponse::created_message("registration successful"))
}

/// POST /auth/login
///
/// Unknown usernames and wrong passwords produce the same 401.
pub async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<Credentials>,
) -> ApiResult<LoginResponse> {
    require("username", &body.username)?;
    require("password", &body.password)?;

    let user = match state.store.find_user_by_username(&body.username).await {
        Ok(user) => user,
        Err(e) if e.is_not_found() => {
            warn!("Login for unknown user '{}'", body.username);
            return Err(ApiError::unauthorized(INVALID_CREDENTIALS));
        }
        Err(e) => return Err(e.into()),
    };

    if !check_password(&state, body.password, &user).await? {
        warn!("Login with wrong password for '{}'", user.username);
        return Err(ApiError::unauthorized(INVALID_CREDENTIALS));
    }

    let issued = state.tokens.issue(&Identity {
        user_id: user.id,
        username: user.username.clone(),
    })?;

    Ok(ApiResponse::success(LoginResponse {
        token: issued.token,
        expires_at: issued.expires_at,
        user: SessionUser {
            id: user.id,
            username: user.username,
        },
    }))
}

/// GET /auth/me
pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<UserResponse> {
    let detail = state.store.load_user(auth.id, UserRelations::ALL).await?;
    Ok(ApiResponse::success(detail.into()))
}

/// PUT /auth/change-password/:id
pub async fn change_password(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<ChangePasswordRequest>,
) -> ApiResult<Message> {
    require("new_password", &body.new_password)?;

    let user = state.store.find_user(id).await?;
    if !check_password(&state, body.old_password, &user).await? {
        warn!("Password change for user {} with wrong old password", id);
        return Err(ApiError::unauthorized(INVALID_CREDENTIALS));
    }

    let password_hash = state.passwords.hash_blocking(body.new_password).await?;
    state.store.update_user_password(id, &password_hash).await?;

    info!("Password changed for user {}", id);
    Ok(ApiResponse::message("password updated successfully"))
}

async fn check_password(state: &AppState, plaintext: String, user: &User) -> Result<bool, ApiError> {
    Ok(state
        .passwords
        .verify_blocking(plaintext, user.password.clone())
        .await?)
}
