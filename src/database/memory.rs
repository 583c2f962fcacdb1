use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::database::manager::DatabaseError;
use crate::database::models::{
    Comment, CommentChanges, Feature, FeatureChanges, NewComment, NewFeature, NewProfile,
    NewReview, NewUser, Phone, PhoneDetail, PhoneInput, Profile, Record, Review,
    ReviewChanges, ReviewDetail, User, UserDetail,
};
use crate::database::store::{
    DbResult, PhoneRelations, ReviewFilter, ReviewRelations, Store, Table, UserRelations,
};

/// Process-local store with the same visibility rules as `PgStore`.
/// Backs the test suite and `DB_PROVIDER=memory`.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

#[derive(Default)]
struct Tables {
    users: Rows<User>,
    profiles: Rows<Profile>,
    phones: Rows<Phone>,
    features: Rows<Feature>,
    reviews: Rows<Review>,
    comments: Rows<Comment>,
}

struct Rows<T> {
    last_id: i64,
    rows: BTreeMap<i64, T>,
}

impl<T> Default for Rows<T> {
    fn default() -> Self {
        Self { last_id: 0, rows: BTreeMap::new() }
    }
}

impl<T: Record + Clone> Rows<T> {
    fn insert(&mut self, build: impl FnOnce(i64, DateTime<Utc>) -> T) -> T {
        self.last_id += 1;
        let row = build(self.last_id, Utc::now());
        self.rows.insert(self.last_id, row.clone());
        row
    }

    fn live(&self) -> impl Iterator<Item = &T> {
        self.rows.values().filter(|row| row.is_live())
    }

    fn get(&self, id: i64, table: Table) -> DbResult<T> {
        self.rows
            .get(&id)
            .filter(|row| row.is_live())
            .cloned()
            .ok_or_else(|| table.not_found())
    }

    /// Applies `change` to a live row and bumps `updated_at`
    fn update(&mut self, id: i64, table: Table, change: impl FnOnce(&mut T)) -> DbResult<T> {
        let row = self
            .rows
            .get_mut(&id)
            .filter(|row| row.is_live())
            .ok_or_else(|| table.not_found())?;
        change(row);
        row.touch(Utc::now());
        Ok(row.clone())
    }

    fn live_where(&self, pred: impl Fn(&T) -> bool) -> Vec<T> {
        self.live().filter(|row| pred(row)).cloned().collect()
    }

    fn soft_delete(&mut self, id: i64, table: Table) -> DbResult<()> {
        let row = self
            .rows
            .get_mut(&id)
            .filter(|row| row.is_live())
            .ok_or_else(|| table.not_found())?;
        row.mark_deleted(Utc::now());
        Ok(())
    }

    fn tombstone(&self, id: i64, table: Table) -> DbResult<Option<DateTime<Utc>>> {
        self.rows
            .get(&id)
            .map(|row| row.deleted_at())
            .ok_or_else(|| table.not_found())
    }
}

impl Tables {
    fn phone_detail(&self, phone: Phone, with: PhoneRelations) -> PhoneDetail {
        let id = phone.id;
        PhoneDetail {
            features: with.features.then(|| self.features.live_where(|f| f.phone_id == id)),
            reviews: with.reviews.then(|| self.reviews.live_where(|r| r.phone_id == id)),
            phone,
        }
    }

    fn review_detail(&self, review: Review, with: ReviewRelations) -> ReviewDetail {
        let id = review.id;
        ReviewDetail {
            comments: with.comments.then(|| self.comments.live_where(|c| c.review_id == id)),
            review,
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> DbResult<()> {
        Ok(())
    }

    async fn soft_delete(&self, table: Table, id: i64) -> DbResult<()> {
        let mut t = self.tables.write().await;
        match table {
            Table::Users => t.users.soft_delete(id, table),
            Table::Profiles => t.profiles.soft_delete(id, table),
            Table::Phones => t.phones.soft_delete(id, table),
            Table::Features => t.features.soft_delete(id, table),
            Table::Reviews => t.reviews.soft_delete(id, table),
            Table::Comments => t.comments.soft_delete(id, table),
        }
    }

    async fn tombstone(&self, table: Table, id: i64) -> DbResult<Option<DateTime<Utc>>> {
        let t = self.tables.read().await;
        match table {
            Table::Users => t.users.tombstone(id, table),
            Table::Profiles => t.profiles.tombstone(id, table),
            Table::Phones => t.phones.tombstone(id, table),
            Table::Features => t.features.tombstone(id, table),
            Table::Reviews => t.reviews.tombstone(id, table),
            Table::Comments => t.comments.tombstone(id, table),
        }
    }

    async fn insert_user(&self, new: NewUser) -> DbResult<User> {
        let mut t = self.tables.write().await;
        // The unique index covers deleted rows as well
        if t.users.rows.values().any(|u| u.username == new.username) {
            return Err(DatabaseError::Conflict(format!(
                "username '{}' is already taken",
                new.username
            )));
        }
        Ok(t.users.insert(|id, now| User {
            id,
            username: new.username,
            password: new.password_hash,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }))
    }

    async fn find_user(&self, id: i64) -> DbResult<User> {
        self.tables.read().await.users.get(id, Table::Users)
    }

    async fn find_user_by_username(&self, username: &str) -> DbResult<User> {
        self.tables
            .read()
            .await
            .users
            .live()
            .find(|u| u.username == username)
            .cloned()
            .ok_or_else(|| Table::Users.not_found())
    }

    async fn load_user(&self, id: i64, with: UserRelations) -> DbResult<UserDetail> {
        let t = self.tables.read().await;
        let user = t.users.get(id, Table::Users)?;
        let profile = if with.profile {
            t.profiles.live().find(|p| p.user_id == id).cloned()
        } else {
            None
        };
        let reviews = with.reviews.then(|| t.reviews.live_where(|r| r.user_id == id));
        Ok(UserDetail { user, profile, reviews })
    }

    async fn update_user_password(&self, id: i64, password_hash: &str) -> DbResult<()> {
        let mut t = self.tables.write().await;
        t.users.update(id, Table::Users, |u| u.password = password_hash.to_string())?;
        Ok(())
    }

    async fn find_profile_by_user(&self, user_id: i64) -> DbResult<Profile> {
        self.tables
            .read()
            .await
            .profiles
            .live()
            .find(|p| p.user_id == user_id)
            .cloned()
            .ok_or_else(|| Table::Profiles.not_found())
    }

    async fn upsert_profile(&self, profile: NewProfile) -> DbResult<Profile> {
        let mut t = self.tables.write().await;
        let existing = t
            .profiles
            .live()
            .find(|p| p.user_id == profile.user_id)
            .map(|p| p.id);

        match existing {
            Some(id) => t.profiles.update(id, Table::Profiles, |p| {
                p.full_name = profile.full_name;
                p.bio = profile.bio;
            }),
            None => Ok(t.profiles.insert(|id, now| Profile {
                id,
                user_id: profile.user_id,
                full_name: profile.full_name,
                bio: profile.bio,
                created_at: now,
                updated_at: now,
                deleted_at: None,
            })),
        }
    }

    async fn list_phones(&self, with: PhoneRelations) -> DbResult<Vec<PhoneDetail>> {
        let t = self.tables.read().await;
        Ok(t.phones
            .live()
            .cloned()
            .map(|phone| t.phone_detail(phone, with))
            .collect())
    }

    async fn load_phone(&self, id: i64, with: PhoneRelations) -> DbResult<PhoneDetail> {
        let t = self.tables.read().await;
        let phone = t.phones.get(id, Table::Phones)?;
        Ok(t.phone_detail(phone, with))
    }

    async fn insert_phone(&self, new: PhoneInput) -> DbResult<Phone> {
        let mut t = self.tables.write().await;
        Ok(t.phones.insert(|id, now| Phone {
            id,
            name: new.name,
            brand: new.brand,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }))
    }

    async fn save_phone(&self, id: i64, phone: PhoneInput) -> DbResult<Phone> {
        let mut t = self.tables.write().await;
        t.phones.update(id, Table::Phones, |p| {
            p.name = phone.name;
            p.brand = phone.brand;
        })
    }

    async fn find_feature(&self, id: i64) -> DbResult<Feature> {
        self.tables.read().await.features.get(id, Table::Features)
    }

    async fn insert_feature(&self, new: NewFeature) -> DbResult<Feature> {
        let mut t = self.tables.write().await;
        Ok(t.features.insert(|id, now| Feature {
            id,
            phone_id: new.phone_id,
            name: new.name,
            details: new.details,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }))
    }

    async fn update_feature(&self, id: i64, changes: FeatureChanges) -> DbResult<Feature> {
        let mut t = self.tables.write().await;
        t.features.update(id, Table::Features, |f| {
            f.name = changes.name;
            f.details = changes.details;
        })
    }

    async fn list_reviews(&self, filter: ReviewFilter, with: ReviewRelations) -> DbResult<Vec<ReviewDetail>> {
        let t = self.tables.read().await;
        Ok(t.reviews
            .live_where(|r| filter.phone_id.map_or(true, |phone_id| r.phone_id == phone_id))
            .into_iter()
            .map(|review| t.review_detail(review, with))
            .collect())
    }

    async fn load_review(&self, id: i64, with: ReviewRelations) -> DbResult<ReviewDetail> {
        let t = self.tables.read().await;
        let review = t.reviews.get(id, Table::Reviews)?;
        Ok(t.review_detail(review, with))
    }

    async fn insert_review(&self, new: NewReview) -> DbResult<Review> {
        let mut t = self.tables.write().await;
        Ok(t.reviews.insert(|id, now| Review {
            id,
            phone_id: new.phone_id,
            user_id: new.user_id,
            rating: new.rating,
            content: new.content,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }))
    }

    async fn update_review(&self, id: i64, changes: ReviewChanges) -> DbResult<Review> {
        let mut t = self.tables.write().await;
        t.reviews.update(id, Table::Reviews, |r| {
            r.rating = changes.rating;
            r.content = changes.content;
        })
    }

    async fn list_comments(&self, review_id: i64) -> DbResult<Vec<Comment>> {
        Ok(self
            .tables
            .read()
            .await
            .comments
            .live_where(|c| c.review_id == review_id))
    }

    async fn insert_comment(&self, new: NewComment) -> DbResult<Comment> {
        let mut t = self.tables.write().await;
        Ok(t.comments.insert(|id, now| Comment {
            id,
            review_id: new.review_id,
            user_id: new.user_id,
            content: new.content,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }))
    }

    async fn update_comment(&self, id: i64, changes: CommentChanges) -> DbResult<Comment> {
        let mut t = self.tables.write().await;
        t.comments.update(id, Table::Comments, |c| c.content = changes.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(name: &str) -> NewUser {
        NewUser {
            username: name.to_string(),
            password_hash: "hash".to_string(),
        }
    }

    fn phone(name: &str) -> PhoneInput {
        PhoneInput {
            name: name.to_string(),
            brand: "Acme".to_string(),
        }
    }

    #[tokio::test]
    async fn ids_auto_increment_per_table() {
        let store = MemoryStore::new();
        let a = store.insert_phone(phone("A1")).await.unwrap();
        let b = store.insert_phone(phone("B2")).await.unwrap();
        let user = store.insert_user(new_user("alice")).await.unwrap();

        assert_eq!((a.id, b.id, user.id), (1, 2, 1));
    }

    #[tokio::test]
    async fn duplicate_username_is_a_conflict() {
        let store = MemoryStore::new();
        store.insert_user(new_user("alice")).await.unwrap();

        let err = store.insert_user(new_user("alice")).await.unwrap_err();
        assert!(matches!(err, DatabaseError::Conflict(_)));
    }

    #[tokio::test]
    async fn soft_delete_hides_row_but_keeps_tombstone() {
        let store = MemoryStore::new();
        let p = store.insert_phone(phone("X")).await.unwrap();

        store.soft_delete(Table::Phones, p.id).await.unwrap();

        assert!(store.load_phone(p.id, PhoneRelations::NONE).await.unwrap_err().is_not_found());
        assert!(store.list_phones(PhoneRelations::NONE).await.unwrap().is_empty());
        assert!(store.tombstone(Table::Phones, p.id).await.unwrap().is_some());

        // a second delete finds nothing live
        assert!(store.soft_delete(Table::Phones, p.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn eager_loads_skip_deleted_children() {
        let store = MemoryStore::new();
        let p = store.insert_phone(phone("X")).await.unwrap();
        let keep = store
            .insert_feature(NewFeature { phone_id: p.id, name: "NFC".into(), details: String::new() })
            .await
            .unwrap();
        let drop = store
            .insert_feature(NewFeature { phone_id: p.id, name: "Jack".into(), details: String::new() })
            .await
            .unwrap();
        store.soft_delete(Table::Features, drop.id).await.unwrap();

        let detail = store.load_phone(p.id, PhoneRelations::ALL).await.unwrap();
        let features = detail.features.unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].id, keep.id);
        assert_eq!(detail.reviews.unwrap().len(), 0);

        let bare = store.load_phone(p.id, PhoneRelations::NONE).await.unwrap();
        assert!(bare.features.is_none());
    }

    fn profile(user_id: i64, full_name: &str) -> NewProfile {
        NewProfile {
            user_id,
            full_name: full_name.to_string(),
            bio: String::new(),
        }
    }

    #[tokio::test]
    async fn upsert_profile_keeps_one_row_per_user() {
        let store = MemoryStore::new();
        let first = store.upsert_profile(profile(1, "Alice")).await.unwrap();
        let second = store.upsert_profile(profile(1, "Alice L")).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.full_name, "Alice L");
        assert_eq!(store.find_profile_by_user(1).await.unwrap().full_name, "Alice L");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_first_upserts_create_a_single_profile() {
        let store = std::sync::Arc::new(MemoryStore::new());
        let tasks: Vec<_> = (0..32)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move { store.upsert_profile(profile(9, &format!("v{}", i))).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let rows = store.tables.read().await.profiles.live_where(|p| p.user_id == 9);
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn deleted_profile_is_replaced_by_a_new_one() {
        let store = MemoryStore::new();
        let old = store.upsert_profile(profile(3, "Old")).await.unwrap();
        store.soft_delete(Table::Profiles, old.id).await.unwrap();

        let new = store.upsert_profile(profile(3, "New")).await.unwrap();
        assert_ne!(new.id, old.id);
        assert_eq!(store.find_profile_by_user(3).await.unwrap().id, new.id);
    }

    #[tokio::test]
    async fn update_touches_updated_at_only() {
        let store = MemoryStore::new();
        let p = store.insert_phone(phone("Old")).await.unwrap();

        let saved = store.save_phone(p.id, phone("New")).await.unwrap();
        assert_eq!(saved.name, "New");
        assert_eq!(saved.created_at, p.created_at);
        assert!(saved.updated_at >= p.updated_at);
    }

    #[tokio::test]
    async fn review_filter_by_phone() {
        let store = MemoryStore::new();
        for phone_id in [1, 2, 1] {
            store
                .insert_review(NewReview { phone_id, user_id: 1, rating: 4, content: "ok".into() })
                .await
                .unwrap();
        }

        let filtered = store
            .list_reviews(ReviewFilter { phone_id: Some(1) }, ReviewRelations::NONE)
            .await
            .unwrap();
        assert_eq!(filtered.len(), 2);

        let all = store
            .list_reviews(ReviewFilter::default(), ReviewRelations::ALL)
            .await
            .unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.iter().all(|r| r.comments.as_ref().is_some_and(Vec::is_empty)));
    }
}
