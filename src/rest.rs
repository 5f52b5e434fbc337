use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::{auth, users};
use crate::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/users/signup", post(auth::signup))
        .route("/users/login", post(auth::login))
        .route("/users", get(users::list_users))
        .route("/users/:user_id", get(users::get_user))
        .with_state(state)
}
