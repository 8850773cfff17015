//! Health check endpoint for service monitoring.

use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{error::AppError, services::token_service, state::AppState};

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,

    pub database: &'static str,

    /// `connected` when a company token with a live refresh token is stored.
    pub accounting_provider: &'static str,

    pub environment: &'static str,

    pub timestamp: DateTime<Utc>,
}

/// Health check handler.
///
/// # Response (200 OK)
///
/// ```json
/// {
///   "status": "healthy",
///   "database": "connected",
///   "accountingProvider": "connected",
///   "environment": "sandbox",
///   "timestamp": "2025-12-21T19:00:00Z"
/// }
/// ```
///
/// If the database is unreachable, returns the standard 500 error response.
pub async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>, AppError> {
    let now = Utc::now();
    let environment = state.config.quickbooks_environment;

    let stored = token_service::load_company_token(&state.pool, environment).await?;
    let accounting_provider = match stored {
        Some(tokens) if tokens.is_refresh_valid(now) => "connected",
        _ => "disconnected",
    };

    Ok(Json(HealthResponse {
        status: "healthy",
        database: "connected",
        accounting_provider,
        environment: environment.as_str(),
        timestamp: now,
    }))
}
