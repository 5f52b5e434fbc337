//! Credentials, bearer tokens and role checks.

pub mod guard;
pub mod middleware;
pub mod password;
pub mod token;

pub use guard::{require_role, require_self_or_role, AuthContext};
pub use middleware::AuthUser;
pub use token::{Identity, TokenClaims, TokenError, TokenKind, TokenPair, TokenService};
