use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use super::{Directory, Field, UserUpdate};
use crate::error::AppError;
use crate::models::user::User;

const USER_COLUMNS: &str = "user_id, first_name, last_name, email, phone, password, user_type, \
     token, refresh_token, created_at, updated_at";

/// Open a pool. Connections never idle out so `sqlite::memory:` keeps its data.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
    SqlitePoolOptions::new()
        .max_connections(max_connections)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect(database_url)
        .await
}

#[derive(Clone)]
pub struct SqliteDirectory {
    pool: SqlitePool,
}

impl SqliteDirectory {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

fn conflict_for(err: sqlx::Error) -> AppError {
    if let Some(db_err) = err.as_database_error() {
        if db_err.is_unique_violation() {
            let message = db_err.message();
            if message.contains("users.phone") {
                return AppError::Conflict("User already exists with this phone number".into());
            }
            return AppError::Conflict("User already exists with this email".into());
        }
    }
    AppError::Sqlx(err)
}

#[async_trait]
impl Directory for SqliteDirectory {
    async fn count_where(&self, field: Field, value: &str) -> Result<i64, AppError> {
        let sql = format!("SELECT COUNT(*) FROM users WHERE {} = ?", field.column());
        let count = sqlx::query_scalar::<_, i64>(&sql)
            .bind(value)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn find_one_where(&self, field: Field, value: &str) -> Result<Option<User>, AppError> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE {} = ? LIMIT 1",
            field.column()
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn insert_record(&self, user: &User) -> Result<String, AppError> {
        let sql = format!(
            "INSERT INTO users ({USER_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        );
        sqlx::query(&sql)
            .bind(&user.user_id)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.email)
            .bind(&user.phone)
            .bind(&user.password)
            .bind(user.user_type)
            .bind(&user.token)
            .bind(&user.refresh_token)
            .bind(user.created_at)
            .bind(user.updated_at)
            .execute(&self.pool)
            .await
            .map_err(conflict_for)?;
        Ok(user.user_id.clone())
    }

    async fn update_fields_where(
        &self,
        field: Field,
        value: &str,
        update: &UserUpdate<'_>,
    ) -> Result<u64, AppError> {
        let sql = format!(
            "UPDATE users SET token = ?, refresh_token = ?, updated_at = ? WHERE {} = ?",
            field.column()
        );
        let result = sqlx::query(&sql)
            .bind(update.token)
            .bind(update.refresh_token)
            .bind(update.updated_at)
            .bind(value)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn find_page(&self, offset: i64, limit: i64) -> Result<Vec<User>, AppError> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at, rowid LIMIT ? OFFSET ?"
        );
        let users = sqlx::query_as::<_, User>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    async fn count_all(&self) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::UserType;
    use chrono::{Duration, Utc};

    async fn directory() -> SqliteDirectory {
        let pool = connect("sqlite::memory:", 1).await.unwrap();
        let directory = SqliteDirectory::new(pool);
        directory.migrate().await.unwrap();
        directory
    }

    fn user(n: i64, email: &str, phone: &str) -> User {
        let created = Utc::now() + Duration::seconds(n);
        User {
            user_id: format!("user-{n}"),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: email.into(),
            phone: phone.into(),
            password: "$argon2id$stub".into(),
            user_type: UserType::User,
            token: None,
            refresh_token: None,
            created_at: created,
            updated_at: created,
        }
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let dir = directory().await;
        let id = dir
            .insert_record(&user(1, "ada@example.com", "111"))
            .await
            .unwrap();
        assert_eq!(id, "user-1");

        let found = dir
            .find_one_where(Field::Email, "ada@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.user_id, "user-1");
        assert_eq!(found.user_type, UserType::User);
        assert_eq!(dir.count_where(Field::Phone, "111").await.unwrap(), 1);
        assert!(dir
            .find_one_where(Field::UserId, "missing")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_unique_email_and_phone() {
        let dir = directory().await;
        dir.insert_record(&user(1, "ada@example.com", "111"))
            .await
            .unwrap();

        let err = dir
            .insert_record(&user(2, "ada@example.com", "222"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(msg) if msg.contains("email")));

        let err = dir
            .insert_record(&user(3, "grace@example.com", "111"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(msg) if msg.contains("phone")));
        assert_eq!(dir.count_all().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_tokens() {
        let dir = directory().await;
        dir.insert_record(&user(1, "ada@example.com", "111"))
            .await
            .unwrap();

        let update = UserUpdate {
            token: "access",
            refresh_token: "refresh",
            updated_at: Utc::now() + Duration::hours(1),
        };
        let touched = dir
            .update_fields_where(Field::UserId, "user-1", &update)
            .await
            .unwrap();
        assert_eq!(touched, 1);

        let found = dir
            .find_one_where(Field::UserId, "user-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.token.as_deref(), Some("access"));
        assert_eq!(found.refresh_token.as_deref(), Some("refresh"));
        assert!(found.updated_at > found.created_at);

        let touched = dir
            .update_fields_where(Field::UserId, "nobody", &update)
            .await
            .unwrap();
        assert_eq!(touched, 0);
    }

    #[tokio::test]
    async fn test_pages() {
        let dir = directory().await;
        for n in 0..5 {
            dir.insert_record(&user(n, &format!("u{n}@example.com"), &format!("{n}")))
                .await
                .unwrap();
        }

        let first = dir.find_page(0, 2).await.unwrap();
        assert_eq!(
            first.iter().map(|u| u.user_id.as_str()).collect::<Vec<_>>(),
            ["user-0", "user-1"]
        );
        assert_eq!(dir.find_page(4, 2).await.unwrap().len(), 1);
        assert!(dir.find_page(10, 2).await.unwrap().is_empty());
        assert_eq!(dir.count_all().await.unwrap(), 5);
    }
}
