//! Property Portal - Main Application Entry Point
//!
//! Web backend for a property-management business whose books live in
//! QuickBooks Online. Tenants, landlords and staff sign in, the portal keeps
//! a QuickBooks OAuth2 connection alive, links each user to their accounting
//! customer or vendor, and serves role-scoped dashboards and property records.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL with sqlx (async queries)
//! - **Sessions**: HS256 JWT in an HttpOnly cookie
//! - **Accounting**: QuickBooks Online REST API over reqwest
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Create database connection pool
//! 3. Run database migrations
//! 4. Build the QuickBooks client and shared state
//! 5. Build HTTP router with routes and middleware
//! 6. Start server on configured port

mod app;
mod config;
mod cookies;
mod db;
mod error;
mod handlers;
mod middleware;
mod models;
mod services;
mod state;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::services::accounting::quickbooks::QuickBooksClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Reads RUST_LOG, defaults to "info"
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = config::Config::from_env()?;
    tracing::info!(
        environment = config.quickbooks_environment.as_str(),
        "Configuration loaded"
    );

    let pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Database pool created");

    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    let accounting = QuickBooksClient::new(&config)?;
    let addr = format!("0.0.0.0:{}", config.server_port);
    let state = state::AppState::new(pool, config, Arc::new(accounting));

    let app = app::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
