use axum::extract::State;
use serde::Deserialize;

use crate::database::models::{Feature, FeatureChanges, NewFeature};
use crate::database::{PhoneRelations, Table};
use crate::error::ApiError;
use crate::middleware::extract::require;
use crate::middleware::{ApiJson, ApiPath, ApiResponse, ApiResult, Message};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct FeatureRequest {
    pub name: String,
    #[serde(default)]
    pub details: String,
}

/// Loads the feature and checks it hangs off `phone_id`; mismatches touch nothing.
async fn owned_feature(state: &AppState, phone_id: i64, feature_id: i64) -> Result<Feature, ApiError> {
    let feature = state.store.find_feature(feature_id).await?;
    if feature.phone_id != phone_id {
        tracing::warn!(
            "Feature {} belongs to phone {}, not phone {}",
            feature.id,
            feature.phone_id,
            phone_id
        );
        return Err(ApiError::bad_request("feature does not belong to this phone"));
    }
    Ok(feature)
}

/// POST /phones/:id/features
pub async fn create_feature(
    State(state): State<AppState>,
    ApiPath(phone_id): ApiPath<i64>,
    ApiJson(body): ApiJson<FeatureRequest>,
) -> ApiResult<Feature> {
    require("name", &body.name)?;
    state.store.load_phone(phone_id, PhoneRelations::NONE).await?;

    let feature = state
        .store
        .insert_feature(NewFeature {
            phone_id,
            name: body.name,
            details: body.details,
        })
        .await?;
    Ok(ApiResponse::created(feature))
}

/// PUT /phones/:id/features/:feature_id
pub async fn update_feature(
    State(state): State<AppState>,
    ApiPath((phone_id, feature_id)): ApiPath<(i64, i64)>,
    ApiJson(body): ApiJson<FeatureRequest>,
) -> ApiResult<Message> {
    require("name", &body.name)?;
    let feature = owned_feature(&state, phone_id, feature_id).await?;

    state
        .store
        .update_feature(
            feature.id,
            FeatureChanges {
                name: body.name,
                details: body.details,
            },
        )
        .await?;
    Ok(ApiResponse::message("feature updated successfully"))
}

/// DELETE /phones/:id/features/:feature_id
pub async fn delete_feature(
    State(state): State<AppState>,
    ApiPath((phone_id, feature_id)): ApiPath<(i64, i64)>,
) -> ApiResult<Message> {
    let feature = owned_feature(&state, phone_id, feature_id).await?;
    state.store.soft_delete(Table::Features, feature.id).await?;
    Ok(ApiResponse::message("feature deleted successfully"))
}
