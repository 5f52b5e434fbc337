use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    Json,
};

use crate::{
    auth::{require_role, AuthUser},
    error::AppError,
    models::user::{PageQuery, User, UserType, UsersPage},
    AppState,
};

/// GET /users?recordPerPage=&page=
#[tracing::instrument(skip(state, caller, query))]
pub async fn list_users(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<UsersPage>, AppError> {
    // non-admins get 403 even when the query string is unparseable
    require_role(&caller, UserType::Admin)?;
    let Query(query) = query.map_err(|e| AppError::Validation(e.body_text()))?;
    let page = state.accounts.list_users(&caller, &query).await?;
    Ok(Json(page))
}

/// GET /users/:user_id
#[tracing::instrument(skip(state, caller))]
pub async fn get_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(user_id): Path<String>,
) -> Result<Json<User>, AppError> {
    let user = state.accounts.get_user(&caller, &user_id).await?;
    Ok(Json(user))
}
