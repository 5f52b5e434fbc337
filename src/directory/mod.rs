//! Persistent store of user records.
//!
//! The account flow only talks to [`Directory`]; [`sqlite::SqliteDirectory`] is the
//! implementation wired up in `main`.

pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::AppError;
use crate::models::user::User;

pub use sqlite::SqliteDirectory;

/// Columns a lookup may filter on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    UserId,
    Email,
    Phone,
}

impl Field {
    pub fn column(self) -> &'static str {
        match self {
            Field::UserId => "user_id",
            Field::Email => "email",
            Field::Phone => "phone",
        }
    }
}

/// Fields rewritten whenever a fresh token pair is issued.
#[derive(Debug, Clone)]
pub struct UserUpdate<'a> {
    pub token: &'a str,
    pub refresh_token: &'a str,
    pub updated_at: DateTime<Utc>,
}

#[async_trait]
pub trait Directory: Send + Sync {
    async fn count_where(&self, field: Field, value: &str) -> Result<i64, AppError>;

    async fn find_one_where(&self, field: Field, value: &str) -> Result<Option<User>, AppError>;

    /// Fails with `Conflict` when the email or phone is already taken.
    async fn insert_record(&self, user: &User) -> Result<String, AppError>;

    /// Returns the number of records touched.
    async fn update_fields_where(
        &self,
        field: Field,
        value: &str,
        update: &UserUpdate<'_>,
    ) -> Result<u64, AppError>;

    async fn find_page(&self, offset: i64, limit: i64) -> Result<Vec<User>, AppError>;

    async fn count_all(&self) -> Result<i64, AppError>;
}
