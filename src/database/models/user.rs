use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use super::{Profile, Review};

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    /// bcrypt hash, never leaves the server
    #[serde(skip_serializing)]
    pub password: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
}

/// A user with whichever relations were requested through `UserRelations`
#[derive(Debug, Clone)]
pub struct UserDetail {
    pub user: User,
    pub profile: Option<Profile>,
    pub reviews: Option<Vec<Review>>,
}
