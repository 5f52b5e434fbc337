use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};

use crate::auth::guard::AuthContext;
use crate::error::AppError;
use crate::AppState;

/// Extractor that validates a Bearer access token and yields the caller's context.
#[derive(Debug)]
pub struct AuthUser(pub AuthContext);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Missing authorization header".into()))?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::Unauthorized("Invalid authorization header format".into())
        })?;

        let claims = state.tokens.validate_access_token(token)?;
        Ok(AuthUser(claims.into()))
    }
}
