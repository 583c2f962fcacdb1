use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{Feature, Review};

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Phone {
    pub id: i64,
    pub name: String,
    pub brand: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Writable phone columns. Used for creation and for the full overwrite on update.
#[derive(Debug, Clone, Deserialize)]
pub struct PhoneInput {
    pub name: String,
    pub brand: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PhoneDetail {
    #[serde(flatten)]
    pub phone: Phone,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features: Option<Vec<Feature>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviews: Option<Vec<Review>>,
}
