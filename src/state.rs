//! Shared application state.

use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    config::Config,
    db::DbPool,
    services::{access::PgAccessStore, accounting::AccountingProvider, session_service::SessionKeys},
};

/// State cloned into every handler and middleware.
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub config: Arc<Config>,
    pub accounting: Arc<dyn AccountingProvider>,
    pub sessions: SessionKeys,
}

impl AppState {
    pub fn new(pool: DbPool, config: Config, accounting: Arc<dyn AccountingProvider>) -> Self {
        let sessions = SessionKeys::new(&config.jwt_secret, config.session_ttl_hours);
        Self {
            pool,
            config: Arc::new(config),
            accounting,
            sessions,
        }
    }

    pub fn access_store(&self) -> PgAccessStore<'_> {
        PgAccessStore {
            pool: &self.pool,
            environment: self.config.quickbooks_environment,
        }
    }

    pub fn cookie_secure(&self) -> bool {
        self.config.cookie_secure
    }
}

impl FromRef<AppState> for DbPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}
