//! # BookRelay API Server
//!
//! This is the main API server for BookRelay, a shared book-library
//! service: members list books, borrow from each other through an
//! owner-approved return cycle, and leave feedback.
//!
//! ## Architecture
//!
//! The API server is built with Axum and provides:
//! - Account registration with mailed activation codes
//! - JWT authentication (access + refresh tokens)
//! - The book catalog and the lending lifecycle
//! - Feedback with on-read rating aggregation
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p bookrelay-api
//! ```

use bookrelay_api::{
    app::{build_router, AppState},
    config::Config,
};
use bookrelay_shared::db::{migrations, pool};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bookrelay_api=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "BookRelay API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;

    migrations::ensure_database_exists(&config.database.url).await?;

    let db = pool::create_pool(pool::DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..Default::default()
    })
    .await?;

    migrations::run_migrations(&db).await?;
    let status = migrations::get_migration_status(&db).await?;
    tracing::info!(
        applied = status.applied_migrations,
        latest = ?status.latest_version,
        "Database schema ready"
    );

    let state = AppState::new(db.clone(), config.clone());
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    tracing::info!("Server listening on http://{}", config.bind_address());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool::close_pool(db).await;

    tracing::info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("Shutdown signal received, draining connections...");
}
