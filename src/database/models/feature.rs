use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Feature {
    pub id: i64,
    pub phone_id: i64,
    pub name: String,
    pub details: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewFeature {
    pub phone_id: i64,
    pub name: String,
    pub details: String,
}

#[derive(Debug, Clone)]
pub struct FeatureChanges {
    pub name: String,
    pub details: String,
}
