use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::{timeout_at, Instant};
use uuid::Uuid;

use crate::auth::guard::{require_role, require_self_or_role, AuthContext};
use crate::auth::password::{hash_password, verify_password};
use crate::auth::token::{persist_token_pair, Identity, TokenService};
use crate::directory::{Directory, Field};
use crate::error::AppError;
use crate::models::user::{
    LoginPayload, LoginResponse, PageQuery, Pagination, SignupRequest, User, UserType, UsersPage,
};

/// Signup, login and user lookup on top of an injected [`Directory`].
#[derive(Clone)]
pub struct AccountService {
    directory: Arc<dyn Directory>,
    tokens: TokenService,
    store_timeout: Duration,
}

async fn bounded<T, F>(deadline: Instant, fut: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>>,
{
    timeout_at(deadline, fut)
        .await
        .map_err(|_| AppError::Timeout)?
}

impl AccountService {
    pub fn new(directory: Arc<dyn Directory>, tokens: TokenService, store_timeout: Duration) -> Self {
        Self {
            directory,
            tokens,
            store_timeout,
        }
    }

    fn deadline(&self) -> Instant {
        Instant::now() + self.store_timeout
    }

    pub async fn signup(&self, req: SignupRequest) -> Result<User, AppError> {
        let deadline = self.deadline();
        let new_user = req.validate()?;

        let taken = bounded(
            deadline,
            self.directory.count_where(Field::Email, &new_user.email),
        )
        .await?;
        if taken > 0 {
            return Err(AppError::Conflict(
                "User already exists with this email".into(),
            ));
        }

        let password = hash_password(&new_user.password)?;

        let taken = bounded(
            deadline,
            self.directory.count_where(Field::Phone, &new_user.phone),
        )
        .await?;
        if taken > 0 {
            return Err(AppError::Conflict(
                "User already exists with this phone number".into(),
            ));
        }

        let now = Utc::now();
        let mut user = User {
            user_id: Uuid::new_v4().simple().to_string(),
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            email: new_user.email,
            phone: new_user.phone,
            password,
            user_type: new_user.user_type,
            token: None,
            refresh_token: None,
            created_at: now,
            updated_at: now,
        };
        let pair = self.tokens.issue_token_pair(&Identity::from(&user))?;
        user.token = Some(pair.token);
        user.refresh_token = Some(pair.refresh_token);

        bounded(deadline, self.directory.insert_record(&user)).await?;
        tracing::info!(user_id = %user.user_id, user_type = %user.user_type, "User signed up");
        Ok(user)
    }

    pub async fn login(&self, payload: LoginPayload) -> Result<LoginResponse, AppError> {
        let deadline = self.deadline();
        let (Some(email), Some(password)) = (payload.email, payload.password) else {
            return Err(AppError::Validation(
                "email and password are required".into(),
            ));
        };

        let user = bounded(deadline, self.directory.find_one_where(Field::Email, &email))
            .await?
            .ok_or_else(|| {
                tracing::debug!("Login failed: unknown email");
                AppError::LoginFail
            })?;

        match verify_password(&user.password, &password) {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(user_id = %user.user_id, "Login failed: password mismatch");
                return Err(AppError::LoginFail);
            }
            Err(e) => {
                tracing::warn!(user_id = %user.user_id, "Stored password hash unreadable: {}", e);
                return Err(AppError::LoginFail);
            }
        }

        let pair = self.tokens.issue_token_pair(&Identity::from(&user))?;
        bounded(
            deadline,
            persist_token_pair(self.directory.as_ref(), &pair, &user.user_id),
        )
        .await?;

        Ok(LoginResponse {
            user_id: user.user_id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            user_type: user.user_type,
            token: pair.token,
            refresh_token: pair.refresh_token,
        })
    }

    pub async fn list_users(
        &self,
        ctx: &AuthContext,
        query: &PageQuery,
    ) -> Result<UsersPage, AppError> {
        require_role(ctx, UserType::Admin)?;
        let pagination = Pagination::parse(query)?;
        let deadline = self.deadline();

        let total_records = bounded(deadline, self.directory.count_all()).await?;
        let users = bounded(
            deadline,
            self.directory
                .find_page(pagination.offset(), pagination.record_per_page),
        )
        .await?;

        Ok(UsersPage {
            total_records,
            users,
            page: pagination.page,
            record_per_page: pagination.record_per_page,
        })
    }

    pub async fn get_user(&self, ctx: &AuthContext, user_id: &str) -> Result<User, AppError> {
        require_self_or_role(ctx, user_id, UserType::Admin)?;
        bounded(
            self.deadline(),
            self.directory.find_one_where(Field::UserId, user_id),
        )
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))
    }
}
