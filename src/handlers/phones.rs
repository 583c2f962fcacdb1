use axum::extract::State;

use crate::database::models::{Phone, PhoneDetail, PhoneInput, ReviewDetail};
use crate::database::{PhoneRelations, ReviewFilter, ReviewRelations, Table};
use crate::middleware::extract::require;
use crate::middleware::{ApiJson, ApiPath, ApiResponse, ApiResult, Message};
use crate::state::AppState;

fn validate(phone: &PhoneInput) -> Result<(), crate::error::ApiError> {
    require("name", &phone.name)?;
    require("brand", &phone.brand)
}

/// GET /phones
pub async fn list_phones(State(state): State<AppState>) -> ApiResult<Vec<PhoneDetail>> {
    let phones = state.store.list_phones(PhoneRelations::ALL).await?;
    Ok(ApiResponse::success(phones))
}

/// GET /phones/:id
pub async fn get_phone(State(state): State<AppState>, ApiPath(id): ApiPath<i64>) -> ApiResult<PhoneDetail> {
    let phone = state.store.load_phone(id, PhoneRelations::ALL).await?;
    Ok(ApiResponse::success(phone))
}

/// POST /phones
pub async fn create_phone(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<PhoneInput>,
) -> ApiResult<Message> {
    validate(&body)?;
    let phone = state.store.insert_phone(body).await?;
    tracing::info!("Created phone {} '{}'", phone.id, phone.name);
    Ok(ApiResponse::created_message("phone created successfully"))
}

/// PUT /phones/:id
pub async fn update_phone(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<PhoneInput>,
) -> ApiResult<Phone> {
    validate(&body)?;
    let phone = state.store.save_phone(id, body).await?;
    Ok(ApiResponse::success(phone))
}

/// DELETE /phones/:id
pub async fn delete_phone(State(state): State<AppState>, ApiPath(id): ApiPath<i64>) -> ApiResult<Message> {
    state.store.soft_delete(Table::Phones, id).await?;
    Ok(ApiResponse::message("phone deleted successfully"))
}

/// GET /phones/:id/reviews
pub async fn list_phone_reviews(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Vec<ReviewDetail>> {
    state.store.load_phone(id, PhoneRelations::NONE).await?;
    let reviews = state
        .store
        .list_reviews(ReviewFilter { phone_id: Some(id) }, ReviewRelations::ALL)
        .await?;
    Ok(ApiResponse::success(reviews))
}
