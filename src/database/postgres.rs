use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::database::manager::DatabaseError;
use crate::database::models::{
    Comment, CommentChanges, Feature, FeatureChanges, NewComment, NewFeature, NewProfile,
    NewReview, NewUser, Phone, PhoneDetail, PhoneInput, Profile, Review,
    ReviewChanges, ReviewDetail, User, UserDetail,
};
use crate::database::repository::Repository;
use crate::database::store::{
    group_by, DbResult, PhoneRelations, ReviewFilter, ReviewRelations, Store, Table, UserRelations,
};

/// PostgreSQL-backed store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn repo<T>(&self, table: Table) -> Repository<'_, T>
    where
        T: for<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> + Send + Unpin,
    {
        Repository::new(table, &self.pool)
    }

    async fn with_phone_relations(
        &self,
        phones: Vec<Phone>,
        with: PhoneRelations,
    ) -> DbResult<Vec<PhoneDetail>> {
        let ids: Vec<i64> = phones.iter().map(|p| p.id).collect();

        let mut features = if with.features {
            let rows = self.repo::<Feature>(Table::Features).select_in("phone_id", &ids).await?;
            Some(group_by(rows, |f| f.phone_id))
        } else {
            None
        };
        let mut reviews = if with.reviews {
            let rows = self.repo::<Review>(Table::Reviews).select_in("phone_id", &ids).await?;
            Some(group_by(rows, |r| r.phone_id))
        } else {
            None
        };

        Ok(phones
            .into_iter()
            .map(|phone| PhoneDetail {
                features: features.as_mut().map(|g| g.remove(&phone.id).unwrap_or_default()),
                reviews: reviews.as_mut().map(|g| g.remove(&phone.id).unwrap_or_default()),
                phone,
            })
            .collect())
    }

    async fn with_review_relations(
        &self,
        reviews: Vec<Review>,
        with: ReviewRelations,
    ) -> DbResult<Vec<ReviewDetail>> {
        let mut comments = if with.comments {
            let ids: Vec<i64> = reviews.iter().map(|r| r.id).collect();
            let rows = self.repo::<Comment>(Table::Comments).select_in("review_id", &ids).await?;
            Some(group_by(rows, |c| c.review_id))
        } else {
            None
        };

        Ok(reviews
            .into_iter()
            .map(|review| ReviewDetail {
                comments: comments.as_mut().map(|g| g.remove(&review.id).unwrap_or_default()),
                review,
            })
            .collect())
    }
}

/// SQLSTATE 23505
fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

fn found<T>(row: Option<T>, table: Table) -> DbResult<T> {
    row.ok_or_else(|| table.not_found())
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> DbResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn soft_delete(&self, table: Table, id: i64) -> DbResult<()> {
        let sql = format!(
            "UPDATE {} SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
            table.name()
        );
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(table.not_found());
        }
        Ok(())
    }

    async fn tombstone(&self, table: Table, id: i64) -> DbResult<Option<DateTime<Utc>>> {
        let sql = format!("SELECT deleted_at FROM {} WHERE id = $1", table.name());
        let row = sqlx::query_scalar::<_, Option<DateTime<Utc>>>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        found(row, table)
    }

    async fn insert_user(&self, new: NewUser) -> DbResult<User> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (username, password) VALUES ($1, $2) RETURNING *",
        )
        .bind(&new.username)
        .bind(&new.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                DatabaseError::Conflict(format!("username '{}' is already taken", new.username))
            } else {
                e.into()
            }
        })
    }

    async fn find_user(&self, id: i64) -> DbResult<User> {
        self.repo(Table::Users).select_404(id).await
    }

    async fn find_user_by_username(&self, username: &str) -> DbResult<User> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE username = $1 AND deleted_at IS NULL",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        found(user, Table::Users)
    }

    async fn load_user(&self, id: i64, with: UserRelations) -> DbResult<UserDetail> {
        let user: User = self.repo(Table::Users).select_404(id).await?;

        let profile = if with.profile {
            self.repo::<Profile>(Table::Profiles)
                .select_by("user_id", id)
                .await?
                .into_iter()
                .next()
        } else {
            None
        };
        let reviews = if with.reviews {
            Some(self.repo::<Review>(Table::Reviews).select_by("user_id", id).await?)
        } else {
            None
        };

        Ok(UserDetail { user, profile, reviews })
    }

    async fn update_user_password(&self, id: i64, password_hash: &str) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE users SET password = $2, updated_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(Table::Users.not_found());
        }
        Ok(())
    }

    async fn find_profile_by_user(&self, user_id: i64) -> DbResult<Profile> {
        let profile = self
            .repo::<Profile>(Table::Profiles)
            .select_by("user_id", user_id)
            .await?
            .into_iter()
            .next();
        found(profile, Table::Profiles)
    }

    async fn upsert_profile(&self, profile: NewProfile) -> DbResult<Profile> {
        let profile = sqlx::query_as::<_, Profile>(
            "INSERT INTO profiles (user_id, full_name, bio) VALUES ($1, $2, $3)
             ON CONFLICT (user_id) WHERE deleted_at IS NULL
             DO UPDATE SET full_name = EXCLUDED.full_name, bio = EXCLUDED.bio, updated_at = NOW()
             RETURNING *",
        )
        .bind(profile.user_id)
        .bind(&profile.full_name)
        .bind(&profile.bio)
        .fetch_one(&self.pool)
        .await?;
        Ok(profile)
    }

    async fn list_phones(&self, with: PhoneRelations) -> DbResult<Vec<PhoneDetail>> {
        let phones = self.repo::<Phone>(Table::Phones).select_all().await?;
        self.with_phone_relations(phones, with).await
    }

    async fn load_phone(&self, id: i64, with: PhoneRelations) -> DbResult<PhoneDetail> {
        let phone = self.repo::<Phone>(Table::Phones).select_404(id).await?;
        let mut details = self.with_phone_relations(vec![phone], with).await?;
        details.pop().ok_or_else(|| Table::Phones.not_found())
    }

    async fn insert_phone(&self, new: PhoneInput) -> DbResult<Phone> {
        let phone = sqlx::query_as::<_, Phone>(
            "INSERT INTO phones (name, brand) VALUES ($1, $2) RETURNING *",
        )
        .bind(&new.name)
        .bind(&new.brand)
        .fetch_one(&self.pool)
        .await?;
        Ok(phone)
    }

    async fn save_phone(&self, id: i64, phone: PhoneInput) -> DbResult<Phone> {
        let saved = sqlx::query_as::<_, Phone>(
            "UPDATE phones SET name = $2, brand = $3, updated_at = NOW()
             WHERE id = $1 AND deleted_at IS NULL RETURNING *",
        )
        .bind(id)
        .bind(&phone.name)
        .bind(&phone.brand)
        .fetch_optional(&self.pool)
        .await?;
        found(saved, Table::Phones)
    }

    async fn find_feature(&self, id: i64) -> DbResult<Feature> {
        self.repo(Table::Features).select_404(id).await
    }

    async fn insert_feature(&self, new: NewFeature) -> DbResult<Feature> {
        let feature = sqlx::query_as::<_, Feature>(
            "INSERT INTO features (phone_id, name, details) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(new.phone_id)
        .bind(&new.name)
        .bind(&new.details)
        .fetch_one(&self.pool)
        .await?;
        Ok(feature)
    }

    async fn update_feature(&self, id: i64, changes: FeatureChanges) -> DbResult<Feature> {
        let feature = sqlx::query_as::<_, Feature>(
            "UPDATE features SET name = $2, details = $3, updated_at = NOW()
             WHERE id = $1 AND deleted_at IS NULL RETURNING *",
        )
        .bind(id)
        .bind(&changes.name)
        .bind(&changes.details)
        .fetch_optional(&self.pool)
        .await?;
        found(feature, Table::Features)
    }

    async fn list_reviews(&self, filter: ReviewFilter, with: ReviewRelations) -> DbResult<Vec<ReviewDetail>> {
        let repo = self.repo::<Review>(Table::Reviews);
        let reviews = match filter.phone_id {
            Some(phone_id) => repo.select_by("phone_id", phone_id).await?,
            None => repo.select_all().await?,
        };
        self.with_review_relations(reviews, with).await
    }

    async fn load_review(&self, id: i64, with: ReviewRelations) -> DbResult<ReviewDetail> {
        let review = self.repo::<Review>(Table::Reviews).select_404(id).await?;
        let mut details = self.with_review_relations(vec![review], with).await?;
        details.pop().ok_or_else(|| Table::Reviews.not_found())
    }

    async fn insert_review(&self, new: NewReview) -> DbResult<Review> {
        let review = sqlx::query_as::<_, Review>(
            "INSERT INTO reviews (phone_id, user_id, rating, content)
             VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(new.phone_id)
        .bind(new.user_id)
        .bind(new.rating)
        .bind(&new.content)
        .fetch_one(&self.pool)
        .await?;
        Ok(review)
    }

    async fn update_review(&self, id: i64, changes: ReviewChanges) -> DbResult<Review> {
        let review = sqlx::query_as::<_, Review>(
            "UPDATE reviews SET rating = $2, content = $3, updated_at = NOW()
             WHERE id = $1 AND deleted_at IS NULL RETURNING *",
        )
        .bind(id)
        .bind(changes.rating)
        .bind(&changes.content)
        .fetch_optional(&self.pool)
        .await?;
        found(review, Table::Reviews)
    }

    async fn list_comments(&self, review_id: i64) -> DbResult<Vec<Comment>> {
        self.repo(Table::Comments).select_by("review_id", review_id).await
    }

    async fn insert_comment(&self, new: NewComment) -> DbResult<Comment> {
        let comment = sqlx::query_as::<_, Comment>(
            "INSERT INTO comments (review_id, user_id, content) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(new.review_id)
        .bind(new.user_id)
        .bind(&new.content)
        .fetch_one(&self.pool)
        .await?;
        Ok(comment)
    }

    async fn update_comment(&self, id: i64, changes: CommentChanges) -> DbResult<Comment> {
        let comment = sqlx::query_as::<_, Comment>(
            "UPDATE comments SET content = $2, updated_at = NOW()
             WHERE id = $1 AND deleted_at IS NULL RETURNING *",
        )
        .bind(id)
        .bind(&changes.content)
        .fetch_optional(&self.pool)
        .await?;
        found(comment, Table::Comments)
    }
}
