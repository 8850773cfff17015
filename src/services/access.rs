//! Access resolution for dashboard routes.
//!
//! A dashboard request passes through these states in order:
//!
//! 1. **Session**: the `auth_token` JWT must verify and name an existing user.
//! 2. **Provider tokens**: a provider token pair must come from cookies or the
//!    stored company token.
//! 3. **Freshness**: an expired (or unknown-expiry) access token is refreshed
//!    and the new pair persisted.
//! 4. **Identity**: tenants and landlords without an accounting id are linked
//!    to a matching customer/vendor, created when absent.
//! 5. **Routing**: tenants and landlords are confined to their canonical
//!    dashboard subtree; staff go anywhere under `/dashboard`.
//!
//! Each step either advances or ends in a [`Decision`]. Whatever the outcome,
//! a token pair obtained along the way is returned in
//! [`Resolution::refreshed`] so the caller can write it to cookies.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    config::QuickBooksEnvironment,
    db::DbPool,
    error::{AccountingError, AppError},
    models::{
        token::{CookieTokens, TokenSet},
        user::{AccountType, User},
    },
    services::{
        accounting::AccountingProvider, session_service::SessionKeys, token_service,
        user_service,
    },
};

/// Dashboard paths shared by every role.
const SHARED_DASHBOARD_PREFIXES: &[&str] = &["/dashboard/invoices"];

/// Persistence the access chain needs.
#[async_trait]
pub trait AccessStore: Send + Sync {
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, AppError>;

    async fn set_accounting_id(&self, id: Uuid, accounting_id: &str) -> Result<(), AppError>;

    async fn load_company_token(&self) -> Result<Option<TokenSet>, AppError>;

    async fn save_company_token(&self, tokens: &TokenSet) -> Result<(), AppError>;
}

/// [`AccessStore`] over the Postgres pool.
pub struct PgAccessStore<'a> {
    pub pool: &'a DbPool,
    pub environment: QuickBooksEnvironment,
}

#[async_trait]
impl AccessStore for PgAccessStore<'_> {
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        user_service::find_user(self.pool, id).await
    }

    async fn set_accounting_id(&self, id: Uuid, accounting_id: &str) -> Result<(), AppError> {
        user_service::set_accounting_id(self.pool, id, accounting_id).await
    }

    async fn load_company_token(&self) -> Result<Option<TokenSet>, AppError> {
        token_service::load_company_token(self.pool, self.environment).await
    }

    async fn save_company_token(&self, tokens: &TokenSet) -> Result<(), AppError> {
        token_service::save_company_token(self.pool, self.environment, tokens).await
    }
}

/// Where a dashboard request ends up.
#[derive(Debug)]
pub enum Decision {
    /// No valid session: send to the login page.
    Login,
    /// No usable provider token pair: start the provider OAuth flow.
    ConnectProvider,
    /// Authenticated, but on someone else's (or a generic) dashboard path.
    Redirect(String),
    /// Serve the request.
    Proceed { user: User, access_token: String },
}

#[derive(Debug)]
pub struct Resolution {
    pub decision: Decision,
    /// Token pair obtained during resolution, to be written to cookies.
    pub refreshed: Option<TokenSet>,
}

impl Resolution {
    fn new(decision: Decision, refreshed: Option<TokenSet>) -> Self {
        Self {
            decision,
            refreshed,
        }
    }
}

/// A usable access token and, when it did not come from cookies, the full
/// pair to write back.
#[derive(Debug, Clone)]
pub struct ProviderAccess {
    pub access_token: String,
    pub refreshed: Option<TokenSet>,
}

/// Inputs to one resolution.
pub struct AccessRequest<'a> {
    pub session_token: Option<&'a str>,
    pub provider_tokens: Option<CookieTokens>,
    pub path: &'a str,
    pub now: DateTime<Utc>,
}

/// Canonical dashboard root for linked roles.
pub fn canonical_path(user: &User) -> Option<String> {
    match user.account_type {
        AccountType::Tenant if user.is_linked() => {
            Some(format!("/dashboard/tenant/{}", user.accounting_id))
        }
        AccountType::Landlord if user.is_linked() => {
            Some(format!("/dashboard/landlord/{}", user.accounting_id))
        }
        _ => None,
    }
}

/// `path` equals `root` or lies below it. `/dashboard/tenant/5` does not
/// contain `/dashboard/tenant/58`.
fn is_within(path: &str, root: &str) -> bool {
    match path.strip_prefix(root) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Step 5: `None` to proceed, or the path to redirect to.
pub fn route(user: &User, path: &str) -> Option<String> {
    let path = match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    };

    if user.account_type.is_staff() {
        return None;
    }
    if SHARED_DASHBOARD_PREFIXES
        .iter()
        .any(|prefix| is_within(path, prefix))
    {
        return None;
    }

    match canonical_path(user) {
        Some(canonical) if is_within(path, &canonical) => None,
        Some(canonical) => Some(canonical),
        // Linking always precedes routing, so only a provider that returned
        // no id can land here.
        None => Some("/dashboard".to_string()),
    }
}

/// Steps 2 and 3: find a usable access token.
///
/// Returns `Ok(None)` when no pair is available or the refresh was refused.
pub async fn ensure_provider_tokens(
    store: &dyn AccessStore,
    provider: &dyn AccountingProvider,
    cookie_tokens: Option<CookieTokens>,
    now: DateTime<Utc>,
) -> Result<Option<ProviderAccess>, AppError> {
    if let Some(tokens) = cookie_tokens {
        if tokens.is_access_valid(now) {
            return Ok(Some(ProviderAccess {
                access_token: tokens.access_token,
                refreshed: None,
            }));
        }
        return refresh(store, provider, &tokens.refresh_token, now).await;
    }

    let Some(stored) = store.load_company_token().await? else {
        tracing::info!("no provider token in cookies or storage");
        return Ok(None);
    };

    if stored.is_access_valid(now) {
        return Ok(Some(ProviderAccess {
            access_token: stored.access_token.clone(),
            refreshed: Some(stored),
        }));
    }
    if !stored.is_refresh_valid(now) {
        tracing::warn!(refresh_expires_at = %stored.refresh_expires_at, "stored refresh token expired");
        return Ok(None);
    }
    refresh(store, provider, &stored.refresh_token, now).await
}

async fn refresh(
    store: &dyn AccessStore,
    provider: &dyn AccountingProvider,
    refresh_token: &str,
    now: DateTime<Utc>,
) -> Result<Option<ProviderAccess>, AppError> {
    let refreshed = provider
        .refresh(refresh_token)
        .await
        .and_then(|grant| TokenSet::from_grant(grant, provider.realm_id(), now));
    let tokens = match refreshed {
        Ok(tokens) => tokens,
        Err(e) => {
            tracing::warn!(error = %e, "provider token refresh failed");
            return Ok(None);
        }
    };

    store.save_company_token(&tokens).await?;

    Ok(Some(ProviderAccess {
        access_token: tokens.access_token.clone(),
        refreshed: Some(tokens),
    }))
}

/// Run the whole chain for one dashboard request.
#[tracing::instrument(skip_all, fields(path = %request.path))]
pub async fn resolve(
    store: &dyn AccessStore,
    provider: &dyn AccountingProvider,
    keys: &SessionKeys,
    request: AccessRequest<'_>,
) -> Result<Resolution, AppError> {
    // Step 1: session
    let claims = match request.session_token.map(|token| keys.verify(token)) {
        Some(Ok(claims)) => claims,
        _ => return Ok(Resolution::new(Decision::Login, None)),
    };
    let Some(mut user) = store.find_user(claims.sub).await? else {
        tracing::info!(user_id = %claims.sub, "session names a deleted user");
        return Ok(Resolution::new(Decision::Login, None));
    };

    // Steps 2 and 3: provider tokens
    let Some(access) =
        ensure_provider_tokens(store, provider, request.provider_tokens, request.now).await?
    else {
        return Ok(Resolution::new(Decision::ConnectProvider, None));
    };
    let refreshed = access.refreshed;

    // Step 4: identity
    if user.account_type.is_accounting_linked() && !user.is_linked() {
        match user_service::link_accounting_entity(provider, &access.access_token, &user).await {
            Ok(Some(accounting_id)) => {
                store.set_accounting_id(user.id, &accounting_id).await?;
                user.accounting_id = accounting_id;
            }
            Ok(None) => {}
            Err(AccountingError::Unauthorized) => {
                tracing::warn!(user_id = %user.id, "provider rejected access token while linking");
                return Ok(Resolution::new(Decision::ConnectProvider, refreshed));
            }
            Err(e) => return Err(e.into()),
        }
    }

    // Step 5: routing
    let decision = match route(&user, request.path) {
        Some(target) => Decision::Redirect(target),
        None => Decision::Proceed {
            user,
            access_token: access.access_token,
        },
    };
    Ok(Resolution::new(decision, refreshed))
}

#[cfg(test)]
pub(crate) mod mock {
    use std::sync::Mutex;

    use super::*;

    /// In-memory [`AccessStore`].
    #[derive(Default)]
    pub struct MemoryStore {
        pub users: Mutex<Vec<User>>,
        pub company_token: Mutex<Option<TokenSet>>,
        pub saved_tokens: Mutex<Vec<TokenSet>>,
    }

    impl MemoryStore {
        pub fn with_user(user: User) -> Self {
            Self {
                users: Mutex::new(vec![user]),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl AccessStore for MemoryStore {
        async fn find_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
            Ok(self.users.lock().unwrap().iter().find(|u| u.id == id).cloned())
        }

        async fn set_accounting_id(&self, id: Uuid, accounting_id: &str) -> Result<(), AppError> {
            let mut users = self.users.lock().unwrap();
            let user = users
                .iter_mut()
                .find(|u| u.id == id)
                .ok_or(AppError::UserNotFound)?;
            user.accounting_id = accounting_id.to_string();
            Ok(())
        }

        async fn load_company_token(&self) -> Result<Option<TokenSet>, AppError> {
            Ok(self.company_token.lock().unwrap().clone())
        }

        async fn save_company_token(&self, tokens: &TokenSet) -> Result<(), AppError> {
            *self.company_token.lock().unwrap() = Some(tokens.clone());
            self.saved_tokens.lock().unwrap().push(tokens.clone());
            Ok(())
        }
    }
}
