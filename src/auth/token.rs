use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::directory::{Directory, Field, UserUpdate};
use crate::error::AppError;
use crate::models::user::{User, UserType};

pub const ACCESS_TOKEN_TTL_HOURS: i64 = 24;
pub const REFRESH_TOKEN_TTL_HOURS: i64 = 168;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("signature does not verify")]
    InvalidSignature,
    #[error("token is expired")]
    Expired,
    #[error("expected a {expected:?} token")]
    WrongKind { expected: TokenKind },
    #[error("malformed token: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Who the token speaks for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(rename = "uid")]
    pub user_id: String,
    pub user_type: UserType,
}

impl From<&User> for Identity {
    fn from(user: &User) -> Self {
        Self {
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            user_id: user.user_id.clone(),
            user_type: user.user_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    #[serde(flatten)]
    pub identity: Identity,
    pub kind: TokenKind,
    /// Seconds since the epoch.
    #[serde(rename = "exp")]
    pub expires_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub token: String,
    pub refresh_token: String,
}

/// HS256 signer/verifier around the process-wide secret.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenService {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn issue_token_pair(&self, identity: &Identity) -> Result<TokenPair, AppError> {
        let now = Utc::now();
        let access = TokenClaims {
            identity: identity.clone(),
            kind: TokenKind::Access,
            expires_at: (now + Duration::hours(ACCESS_TOKEN_TTL_HOURS)).timestamp(),
        };
        let refresh = TokenClaims {
            identity: identity.clone(),
            kind: TokenKind::Refresh,
            expires_at: (now + Duration::hours(REFRESH_TOKEN_TTL_HOURS)).timestamp(),
        };

        Ok(TokenPair {
            token: self.sign(&access)?,
            refresh_token: self.sign(&refresh)?,
        })
    }

    pub(crate) fn sign(&self, claims: &TokenClaims) -> Result<String, AppError> {
        let header = Header::new(Algorithm::HS256);
        Ok(encode(&header, claims, &self.encoding_key)?)
    }

    /// Signature is checked before expiry, so a foreign token never reports `Expired`.
    pub fn validate_token(&self, token: &str) -> Result<TokenClaims, TokenError> {
        decode::<TokenClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed(e.to_string()),
            })
    }

    pub fn validate_access_token(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let claims = self.validate_token(token)?;
        if claims.kind != TokenKind::Access {
            return Err(TokenError::WrongKind {
                expected: TokenKind::Access,
            });
        }
        Ok(claims)
    }
}

/// Overwrite the stored pair on the user's record and bump `updated_at`.
pub async fn persist_token_pair(
    directory: &dyn Directory,
    pair: &TokenPair,
    user_id: &str,
) -> Result<(), AppError> {
    let update = UserUpdate {
        token: &pair.token,
        refresh_token: &pair.refresh_token,
        updated_at: Utc::now(),
    };
    let updated = directory
        .update_fields_where(Field::UserId, user_id, &update)
        .await?;
    if updated == 0 {
        return Err(AppError::NotFound(format!("No user with id {user_id}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> Identity {
        Identity {
            email: "ada@example.com".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            user_id: "user-123".into(),
            user_type: UserType::Admin,
        }
    }

    #[test]
    fn test_issue_and_validate_round_trip() {
        let tokens = TokenService::new("test-secret");
        let pair = tokens.issue_token_pair(&identity()).unwrap();

        let access = tokens.validate_token(&pair.token).unwrap();
        assert_eq!(access.identity, identity());
        assert_eq!(access.kind, TokenKind::Access);

        let refresh = tokens.validate_token(&pair.refresh_token).unwrap();
        assert_eq!(refresh.identity, identity());
        assert_eq!(refresh.kind, TokenKind::Refresh);
    }

    #[test]
    fn test_expiry_windows() {
        let tokens = TokenService::new("test-secret");
        let before = Utc::now().timestamp();
        let pair = tokens.issue_token_pair(&identity()).unwrap();
        let after = Utc::now().timestamp();

        let access = tokens.validate_token(&pair.token).unwrap();
        let refresh = tokens.validate_token(&pair.refresh_token).unwrap();
        let day = ACCESS_TOKEN_TTL_HOURS * 3600;
        let week = REFRESH_TOKEN_TTL_HOURS * 3600;
        assert!((before + day..=after + day).contains(&access.expires_at));
        assert!((before + week..=after + week).contains(&refresh.expires_at));
    }

    #[test]
    fn test_wrong_secret_is_invalid_signature() {
        let pair = TokenService::new("secret-1")
            .issue_token_pair(&identity())
            .unwrap();
        let result = TokenService::new("secret-2").validate_token(&pair.token);
        assert_eq!(result, Err(TokenError::InvalidSignature));
    }

    #[test]
    fn test_expired_token() {
        let tokens = TokenService::new("test-secret");
        let claims = TokenClaims {
            identity: identity(),
            kind: TokenKind::Access,
            expires_at: Utc::now().timestamp() - 5,
        };
        let token = tokens.sign(&claims).unwrap();
        assert_eq!(tokens.validate_token(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_expired_foreign_token_reports_signature() {
        let claims = TokenClaims {
            identity: identity(),
            kind: TokenKind::Access,
            expires_at: Utc::now().timestamp() - 3600,
        };
        let token = TokenService::new("secret-1").sign(&claims).unwrap();
        assert_eq!(
            TokenService::new("secret-2").validate_token(&token),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn test_refresh_token_is_not_an_access_token() {
        let tokens = TokenService::new("test-secret");
        let pair = tokens.issue_token_pair(&identity()).unwrap();
        assert!(tokens.validate_access_token(&pair.token).is_ok());
        assert_eq!(
            tokens.validate_access_token(&pair.refresh_token),
            Err(TokenError::WrongKind {
                expected: TokenKind::Access
            })
        );
    }

    #[test]
    fn test_garbage_is_malformed() {
        let tokens = TokenService::new("test-secret");
        assert!(matches!(
            tokens.validate_token("not.a.jwt"),
            Err(TokenError::Malformed(_))
        ));
    }
}
