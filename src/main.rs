use std::sync::Arc;

use auth_server::{
    auth::TokenService,
    config::Config,
    directory::{sqlite, SqliteDirectory},
    rest,
    service::AccountService,
    AppState,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "auth_server=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::debug!(?config, "Loaded configuration");

    let pool = sqlite::connect(&config.database_url, config.max_connections).await?;
    let directory = SqliteDirectory::new(pool);
    directory.migrate().await?;

    let tokens = TokenService::new(&config.secret_key);
    let accounts = AccountService::new(Arc::new(directory), tokens.clone(), config.store_timeout);
    let app_state = AppState { accounts, tokens };

    let rest_app = rest::router(app_state);
    let rest_addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("REST API listening on {}", rest_addr);
    let rest_listener = tokio::net::TcpListener::bind(&rest_addr).await?;

    axum::serve(rest_listener, rest_app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutting down");
}
