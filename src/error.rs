use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::auth::token::TokenError;

/// Message shared by every failed login so callers cannot tell a missing
/// account from a wrong password.
pub const LOGIN_FAIL_MESSAGE: &str = "invalid email or password";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("password hashing error: {0}")]
    PasswordHash(#[from] argon2::password_hash::Error),

    #[error("token signing error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("token rejected: {0}")]
    Token(#[from] TokenError),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{}", LOGIN_FAIL_MESSAGE)]
    LoginFail,

    #[error("{0}")]
    Unauthorized(String),

    #[error("Unauthorized to access this resource")]
    Forbidden,

    #[error("{0}")]
    NotFound(String),

    #[error("store did not answer in time")]
    Timeout,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Sqlx(e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                )
            }
            AppError::PasswordHash(e) => {
                tracing::error!("Password hashing error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Password hashing error".to_string(),
                )
            }
            AppError::Jwt(e) => {
                tracing::error!("JWT error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Token error".to_string())
            }
            AppError::Token(e) => {
                tracing::debug!("Token rejected: {}", e);
                (
                    StatusCode::UNAUTHORIZED,
                    "Invalid or expired token".to_string(),
                )
            }
            AppError::Timeout => {
                tracing::error!("Store interaction timed out");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Store timed out".to_string(),
                )
            }
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::LoginFail => (StatusCode::UNAUTHORIZED, LOGIN_FAIL_MESSAGE.to_string()),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            e @ AppError::Forbidden => (StatusCode::FORBIDDEN, e.to_string()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let cases = [
            (AppError::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (AppError::Conflict("dup".into()), StatusCode::CONFLICT),
            (AppError::LoginFail, StatusCode::UNAUTHORIZED),
            (AppError::Token(TokenError::Expired), StatusCode::UNAUTHORIZED),
            (AppError::Forbidden, StatusCode::FORBIDDEN),
            (AppError::NotFound("gone".into()), StatusCode::NOT_FOUND),
            (AppError::Timeout, StatusCode::INTERNAL_SERVER_ERROR),
            (
                AppError::Sqlx(sqlx::Error::RowNotFound),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }
}
