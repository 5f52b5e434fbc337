pub mod auth;
pub mod config;
pub mod directory;
pub mod error;
pub mod handlers;
pub mod models;
pub mod rest;
pub mod service;

use auth::TokenService;
use service::AccountService;

#[derive(Clone)]
pub struct AppState {
    pub accounts: AccountService,
    pub tokens: TokenService,
}
