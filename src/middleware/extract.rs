use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// `Json<T>` whose rejections render as `ApiError`
#[derive(Debug)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

/// `Path<T>` whose rejections render as `ApiError` (400 on non-integer ids)
#[derive(Debug)]
pub struct ApiPath<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

/// Rejects blank strings for required fields
pub fn require(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::invalid_field(field, "This field is required"));
    }
    Ok(())
}

pub fn validate_rating(rating: i32) -> Result<(), ApiError> {
    if !(1..=5).contains(&rating) {
        return Err(ApiError::invalid_field("rating", "must be between 1 and 5"));
    }
    Ok(())
}

/// 3-50 characters of letters, digits, underscore or hyphen, starting alphanumeric
pub fn validate_username(username: &str) -> Result<(), ApiError> {
    let length = username.chars().count();
    let reason = if length < 3 {
        Some("must be at least 3 characters")
    } else if length > 50 {
        Some("must be at most 50 characters")
    } else if !username.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-') {
        Some("can only contain letters, numbers, underscore and hyphen")
    } else if !username.starts_with(|c: char| c.is_alphanumeric()) {
        Some("must start with a letter or number")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(ApiError::invalid_field("username", reason)),
        None => Ok(()),
    }
}
