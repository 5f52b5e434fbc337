use axum::{extract::rejection::JsonRejection, extract::State, Json};

use crate::{
    error::AppError,
    models::user::{LoginPayload, LoginResponse, SignupRequest, User},
    AppState,
};

/// POST /users/signup
#[tracing::instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<Json<User>, AppError> {
    let Json(req) = payload.map_err(|e| AppError::Validation(e.body_text()))?;
    let user = state.accounts.signup(req).await?;
    Ok(Json(user))
}

/// POST /users/login
#[tracing::instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginPayload>, JsonRejection>,
) -> Result<Json<LoginResponse>, AppError> {
    let Json(req) = payload.map_err(|e| AppError::Validation(e.body_text()))?;
    let response = state.accounts.login(req).await?;
    Ok(Json(response))
}
