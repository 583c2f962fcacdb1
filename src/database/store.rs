use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::database::manager::DatabaseError;
use crate::database::models::{
    Comment, CommentChanges, Feature, FeatureChanges, NewComment, NewFeature, NewProfile,
    NewReview, NewUser, Phone, PhoneDetail, PhoneInput, Profile, Review,
    ReviewChanges, ReviewDetail, User, UserDetail,
};

pub type DbResult<T> = Result<T, DatabaseError>;

/// Tables that support the generic soft-delete operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Users,
    Profiles,
    Phones,
    Features,
    Reviews,
    Comments,
}

impl Table {
    pub fn name(self) -> &'static str {
        match self {
            Table::Users => "users",
            Table::Profiles => "profiles",
            Table::Phones => "phones",
            Table::Features => "features",
            Table::Reviews => "reviews",
            Table::Comments => "comments",
        }
    }

    /// Singular label used in not-found messages
    pub fn entity(self) -> &'static str {
        match self {
            Table::Users => "user",
            Table::Profiles => "profile",
            Table::Phones => "phone",
            Table::Features => "feature",
            Table::Reviews => "review",
            Table::Comments => "comment",
        }
    }

    pub fn not_found(self) -> DatabaseError {
        DatabaseError::NotFound(format!("{} not found", self.entity()))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhoneRelations {
    pub features: bool,
    pub reviews: bool,
}

impl PhoneRelations {
    pub const NONE: Self = Self { features: false, reviews: false };
    pub const ALL: Self = Self { features: true, reviews: true };
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReviewRelations {
    pub comments: bool,
}

impl ReviewRelations {
    pub const NONE: Self = Self { comments: false };
    pub const ALL: Self = Self { comments: true };
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserRelations {
    pub profile: bool,
    pub reviews: bool,
}

impl UserRelations {
    pub const NONE: Self = Self { profile: false, reviews: false };
    pub const ALL: Self = Self { profile: true, reviews: true };
}

/// Equality filters accepted by `Store::list_reviews`
#[derive(Debug, Clone, Copy, Default)]
pub struct ReviewFilter {
    pub phone_id: Option<i64>,
}

/// Persistence operations consumed by the handlers.
///
/// Every read excludes soft-deleted rows, including eager-loaded relations.
/// `tombstone` is the only lookup that sees deleted rows.
#[async_trait]
pub trait Store: Send + Sync {
    async fn ping(&self) -> DbResult<()>;

    /// Marks the row deleted. Fails with `NotFound` if it is absent or already deleted.
    async fn soft_delete(&self, table: Table, id: i64) -> DbResult<()>;

    /// Returns the row's `deleted_at` regardless of the tombstone filter.
    async fn tombstone(&self, table: Table, id: i64) -> DbResult<Option<DateTime<Utc>>>;

    async fn insert_user(&self, new: NewUser) -> DbResult<User>;
    async fn find_user(&self, id: i64) -> DbResult<User>;
    async fn find_user_by_username(&self, username: &str) -> DbResult<User>;
    async fn load_user(&self, id: i64, with: UserRelations) -> DbResult<UserDetail>;
    async fn update_user_password(&self, id: i64, password_hash: &str) -> DbResult<()>;

    async fn find_profile_by_user(&self, user_id: i64) -> DbResult<Profile>;
    /// Creates the user's live profile or overwrites it. At most one live profile per user.
    async fn upsert_profile(&self, profile: NewProfile) -> DbResult<Profile>;

    async fn list_phones(&self, with: PhoneRelations) -> DbResult<Vec<PhoneDetail>>;
    async fn load_phone(&self, id: i64, with: PhoneRelations) -> DbResult<PhoneDetail>;
    async fn insert_phone(&self, new: PhoneInput) -> DbResult<Phone>;
    /// Overwrites every writable column of an existing phone.
    async fn save_phone(&self, id: i64, phone: PhoneInput) -> DbResult<Phone>;

    async fn find_feature(&self, id: i64) -> DbResult<Feature>;
    async fn insert_feature(&self, new: NewFeature) -> DbResult<Feature>;
    async fn update_feature(&self, id: i64, changes: FeatureChanges) -> DbResult<Feature>;

    async fn list_reviews(&self, filter: ReviewFilter, with: ReviewRelations) -> DbResult<Vec<ReviewDetail>>;
    async fn load_review(&self, id: i64, with: ReviewRelations) -> DbResult<ReviewDetail>;
    async fn insert_review(&self, new: NewReview) -> DbResult<Review>;
    async fn update_review(&self, id: i64, changes: ReviewChanges) -> DbResult<Review>;

    async fn list_comments(&self, review_id: i64) -> DbResult<Vec<Comment>>;
    async fn insert_comment(&self, new: NewComment) -> DbResult<Comment>;
    async fn update_comment(&self, id: i64, changes: CommentChanges) -> DbResult<Comment>;
}

/// Buckets eager-loaded children by their parent key.
pub(crate) fn group_by<T>(rows: Vec<T>, key: impl Fn(&T) -> i64) -> HashMap<i64, Vec<T>> {
    let mut groups: HashMap<i64, Vec<T>> = HashMap::new();
    for row in rows {
        groups.entry(key(&row)).or_default().push(row);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_by_keeps_row_order_within_parent() {
        let rows = vec![(1, "a"), (2, "b"), (1, "c")];
        let groups = group_by(rows, |row| row.0);

        assert_eq!(groups[&1], vec![(1, "a"), (1, "c")]);
        assert_eq!(groups[&2], vec![(2, "b")]);
    }

    #[test]
    fn table_labels() {
        assert_eq!(Table::Reviews.name(), "reviews");
        assert_eq!(
            Table::Features.not_found().to_string(),
            "Not found: feature not found"
        );
    }
}
