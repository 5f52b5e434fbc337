use crate::auth::token::TokenClaims;
use crate::error::AppError;
use crate::models::user::UserType;

/// Caller identity resolved from a validated access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub uid: String,
    pub user_type: UserType,
    pub email: String,
}

impl From<TokenClaims> for AuthContext {
    fn from(claims: TokenClaims) -> Self {
        Self {
            uid: claims.identity.user_id,
            user_type: claims.identity.user_type,
            email: claims.identity.email,
        }
    }
}

pub fn require_role(ctx: &AuthContext, role: UserType) -> Result<(), AppError> {
    if ctx.user_type != role {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

/// A USER may only reach their own record; every other caller must hold `role`.
pub fn require_self_or_role(
    ctx: &AuthContext,
    target_user_id: &str,
    role: UserType,
) -> Result<(), AppError> {
    match ctx.user_type {
        UserType::User if ctx.uid == target_user_id => Ok(()),
        UserType::User => Err(AppError::Forbidden),
        _ => require_role(ctx, role),
    }
}
