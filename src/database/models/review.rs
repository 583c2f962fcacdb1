use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use super::Comment;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Review {
    pub id: i64,
    pub phone_id: i64,
    pub user_id: i64,
    pub rating: i32,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewReview {
    pub phone_id: i64,
    pub user_id: i64,
    pub rating: i32,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct ReviewChanges {
    pub rating: i32,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewDetail {
    #[serde(flatten)]
    pub review: Review,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<Vec<Comment>>,
}
