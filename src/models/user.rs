use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(rename_all = "UPPERCASE")]
pub enum UserType {
    Admin,
    User,
}

impl UserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Admin => "ADMIN",
            UserType::User => "USER",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ADMIN" => Some(UserType::Admin),
            "USER" => Some(UserType::User),
            _ => None,
        }
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored user record. The password hash never leaves the service.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    #[serde(skip)]
    pub password: String,
    pub user_type: UserType,
    pub token: Option<String>,
    pub refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Tri-state JSON field: missing from the body, explicitly `null`, or set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FieldInput<T> {
    #[default]
    Absent,
    Null,
    Present(T),
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for FieldInput<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(value) => FieldInput::Present(value),
            None => FieldInput::Null,
        })
    }
}

impl<T> FieldInput<T> {
    /// Falls back to `default` only when the field was left out entirely.
    fn or_default(self, name: &str, default: impl FnOnce() -> T) -> Result<T, AppError> {
        match self {
            FieldInput::Absent => Ok(default()),
            FieldInput::Null => Err(AppError::Validation(format!("{name} must not be null"))),
            FieldInput::Present(value) => Ok(value),
        }
    }

    fn required(self, name: &str) -> Result<T, AppError> {
        match self {
            FieldInput::Present(value) => Ok(value),
            FieldInput::Absent | FieldInput::Null => {
                Err(AppError::Validation(format!("{name} is required")))
            }
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub first_name: FieldInput<String>,
    #[serde(default)]
    pub last_name: FieldInput<String>,
    #[serde(default)]
    pub email: FieldInput<String>,
    #[serde(default)]
    pub password: FieldInput<String>,
    #[serde(default)]
    pub phone: FieldInput<String>,
    #[serde(default)]
    pub user_type: FieldInput<String>,
}

/// Signup input after defaults and validation. `password` is still plaintext.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub phone: String,
    pub user_type: UserType,
}

pub const DEFAULT_FIRST_NAME: &str = "User";
pub const DEFAULT_LAST_NAME: &str = "Default";
pub const DEFAULT_PHONE: &str = "0000000000";
pub const MIN_PASSWORD_LEN: usize = 6;

impl SignupRequest {
    pub fn validate(self) -> Result<NewUser, AppError> {
        let first_name = self
            .first_name
            .or_default("first_name", || DEFAULT_FIRST_NAME.to_string())?;
        let last_name = self
            .last_name
            .or_default("last_name", || DEFAULT_LAST_NAME.to_string())?;
        let user_type = self
            .user_type
            .or_default("user_type", || UserType::User.as_str().to_string())?;
        let phone = self
            .phone
            .or_default("phone", || DEFAULT_PHONE.to_string())?;
        let email = self.email.required("email")?;
        let password = self.password.required("password")?;

        check_name_len("first_name", &first_name)?;
        check_name_len("last_name", &last_name)?;

        if !is_valid_email(&email) {
            return Err(AppError::Validation("email is not a valid address".into()));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::Validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        let user_type = UserType::parse(&user_type).ok_or_else(|| {
            AppError::Validation("user_type must be one of ADMIN, USER".into())
        })?;
        if phone.trim().is_empty() {
            return Err(AppError::Validation("phone is required".into()));
        }

        Ok(NewUser {
            first_name,
            last_name,
            email,
            password,
            phone,
            user_type,
        })
    }
}

fn check_name_len(name: &str, value: &str) -> Result<(), AppError> {
    let len = value.chars().count();
    if !(2..=100).contains(&len) {
        return Err(AppError::Validation(format!(
            "{name} must be between 2 and 100 characters"
        )));
    }
    Ok(())
}

fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

#[derive(Debug, Deserialize)]
pub struct LoginPayload {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Profile handed back on login. No password hash.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub user_type: UserType,
    pub token: String,
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(rename = "recordPerPage")]
    pub record_per_page: Option<String>,
    pub page: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub record_per_page: i64,
    offset: i64,
}

impl Pagination {
    pub fn parse(query: &PageQuery) -> Result<Self, AppError> {
        let record_per_page = positive(query.record_per_page.as_deref())
            .ok_or_else(|| AppError::Validation("Invalid recordPerPage".into()))?;
        let page = positive(query.page.as_deref())
            .ok_or_else(|| AppError::Validation("Invalid page".into()))?;
        // a window starting past i64::MAX can't be addressed
        let offset = (page - 1)
            .checked_mul(record_per_page)
            .ok_or_else(|| AppError::Validation("Invalid page".into()))?;
        Ok(Self {
            page,
            record_per_page,
            offset,
        })
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }
}

fn positive(raw: Option<&str>) -> Option<i64> {
    raw?.trim().parse::<i64>().ok().filter(|n| *n >= 1)
}

#[derive(Debug, Serialize)]
pub struct UsersPage {
    #[serde(rename = "totalRecords")]
    pub total_records: i64,
    pub users: Vec<User>,
    pub page: i64,
    #[serde(rename = "recordPerPage")]
    pub record_per_page: i64,
}
