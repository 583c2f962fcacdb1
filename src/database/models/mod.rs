pub mod comment;
pub mod feature;
pub mod phone;
pub mod profile;
pub mod review;
pub mod user;

use chrono::{DateTime, Utc};

pub use comment::{Comment, CommentChanges, NewComment};
pub use feature::{Feature, FeatureChanges, NewFeature};
pub use phone::{Phone, PhoneDetail, PhoneInput};
pub use profile::{NewProfile, Profile};
pub use review::{NewReview, Review, ReviewChanges, ReviewDetail};
pub use user::{NewUser, User, UserDetail};

/// Bookkeeping columns shared by every table
pub trait Record {
    fn deleted_at(&self) -> Option<DateTime<Utc>>;
    fn mark_deleted(&mut self, at: DateTime<Utc>);
    fn touch(&mut self, at: DateTime<Utc>);

    fn is_live(&self) -> bool {
        self.deleted_at().is_none()
    }
}

macro_rules! impl_record {
    ($($model:ty),+ $(,)?) => {
        $(
            impl Record for $model {
                fn deleted_at(&self) -> Option<DateTime<Utc>> {
                    self.deleted_at
                }

                fn mark_deleted(&mut self, at: DateTime<Utc>) {
                    self.deleted_at = Some(at);
                }

                fn touch(&mut self, at: DateTime<Utc>) {
                    self.updated_at = at;
                }
            }
        )+
    };
}

impl_record!(User, Profile, Phone, Feature, Review, Comment);
