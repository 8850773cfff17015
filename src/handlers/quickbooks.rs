//! Accounting provider HTTP handlers.
//!
//! OAuth flow (public):
//! - GET /api/quickbooks/auth - Consent URL plus a signed state cookie
//! - GET /api/quickbooks/callback - Code exchange, then back to the dashboard
//! - GET /api/quickbooks/refresh-token - Refresh from cookies, then `returnUrl`
//! - GET /api/quickbooks/set-cookies - Copy the stored token into cookies
//!
//! Accounting data (session required):
//! - GET /api/quickbooks/customers
//! - GET /api/quickbooks/vendors
//! - GET /api/quickbooks/invoices
//! - GET /api/quickbooks/invoices/{id}

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::Redirect,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_cookies::Cookies;

use crate::{
    cookies,
    error::AppError,
    middleware::access::CONNECT_PROVIDER_PATH,
    models::{
        accounting::{Customer, Invoice, InvoiceView, Vendor},
        session::SessionUser,
        token::TokenSet,
        user::{AccountType, User},
    },
    services::{access, token_service},
    state::AppState,
};

const AUTH_FAILED_LOCATION: &str = "/quickbooks?error=auth_failed";

/// Usable access token, refreshing or loading the stored pair as needed.
/// Writes any new pair to cookies.
async fn provider_access(state: &AppState, jar: &Cookies) -> Result<Option<String>, AppError> {
    let store = state.access_store();
    let access = access::ensure_provider_tokens(
        &store,
        state.accounting.as_ref(),
        cookies::read_provider_tokens(jar),
        Utc::now(),
    )
    .await?;

    Ok(access.map(|access| {
        if let Some(tokens) = &access.refreshed {
            cookies::set_provider_cookies(jar, tokens, state.cookie_secure());
        }
        access.access_token
    }))
}

async fn require_provider_access(state: &AppState, jar: &Cookies) -> Result<String, AppError> {
    provider_access(state, jar)
        .await?
        .ok_or(AppError::ProviderNotConnected)
}

/// Like [`provider_access`], but failures only get logged.
pub(crate) async fn optional_provider_access(state: &AppState, jar: &Cookies) -> Option<String> {
    match provider_access(state, jar).await {
        Ok(token) => token,
        Err(e) => {
            tracing::warn!(error = %e, "could not obtain provider token");
            None
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUrlResponse {
    pub auth_url: String,
}

/// Start the provider OAuth flow.
///
/// The returned URL carries a fresh `nonce.signature` state that is also
/// bound to this browser through the `qb_oauth_state` cookie.
pub async fn auth(
    State(state): State<AppState>,
    jar: Cookies,
) -> Result<Json<AuthUrlResponse>, AppError> {
    let oauth_state = cookies::new_oauth_state(&state.config.jwt_secret)?;
    let auth_url = state.accounting.authorize_url(&oauth_state);

    jar.add(cookies::oauth_state_cookie(oauth_state, state.cookie_secure()));

    Ok(Json(AuthUrlResponse { auth_url }))
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    #[serde(rename = "realmId")]
    pub realm_id: Option<String>,
    pub error: Option<String>,
}

/// OAuth redirect target.
///
/// # Flow
///
/// 1. Check the returned state against the state cookie
/// 2. Exchange the code for a token pair
/// 3. Store it as the company token and mirror it into cookies
/// 4. Redirect to `/dashboard`
///
/// Any failure redirects to `/quickbooks?error=auth_failed`.
#[tracing::instrument(skip_all)]
pub async fn callback(
    State(state): State<AppState>,
    jar: Cookies,
    Query(query): Query<CallbackQuery>,
) -> Redirect {
    let bound_state = jar
        .get(cookies::OAUTH_STATE_COOKIE)
        .map(|c| c.value().to_string());
    jar.add(cookies::removal(cookies::OAUTH_STATE_COOKIE, state.cookie_secure()));

    if let Some(error) = &query.error {
        tracing::warn!(error = %error, "provider denied authorization");
        return Redirect::to(AUTH_FAILED_LOCATION);
    }

    let (Some(code), Some(returned_state)) = (query.code.as_deref(), query.state.as_deref()) else {
        tracing::warn!("callback without code or state");
        return Redirect::to(AUTH_FAILED_LOCATION);
    };

    if !cookies::verify_oauth_state(&state.config.jwt_secret, returned_state, bound_state.as_deref()) {
        tracing::warn!("oauth state mismatch");
        return Redirect::to(AUTH_FAILED_LOCATION);
    }

    let realm_id = state.accounting.realm_id();
    let exchanged = state
        .accounting
        .exchange_code(code)
        .await
        .and_then(|grant| TokenSet::from_grant(grant, realm_id, Utc::now()));
    let tokens = match exchanged {
        Ok(tokens) => tokens,
        Err(e) => {
            tracing::error!(error = %e, "authorization code exchange failed");
            return Redirect::to(AUTH_FAILED_LOCATION);
        }
    };

    if let Some(returned) = query.realm_id.as_deref().filter(|r| *r != realm_id) {
        tracing::warn!(returned, configured = realm_id, "authorized company differs from configured realm");
    }

    if let Err(e) =
        token_service::save_company_token(&state.pool, state.config.quickbooks_environment, &tokens)
            .await
    {
        tracing::error!(error = %e, "could not store company token");
        return Redirect::to(AUTH_FAILED_LOCATION);
    }

    cookies::set_provider_cookies(&jar, &tokens, state.cookie_secure());
    Redirect::to("/dashboard")
}

#[derive(Debug, Deserialize)]
pub struct ReturnQuery {
    #[serde(rename = "returnUrl")]
    pub return_url: Option<String>,
}

/// Refresh the pair held in cookies and go back to `returnUrl`.
pub async fn refresh_token(
    State(state): State<AppState>,
    jar: Cookies,
    Query(query): Query<ReturnQuery>,
) -> Result<Redirect, AppError> {
    let Some(refresh_token) = cookies::read_provider_tokens(&jar).map(|t| t.refresh_token) else {
        return Ok(Redirect::to(CONNECT_PROVIDER_PATH));
    };

    let refreshed = state
        .accounting
        .refresh(&refresh_token)
        .await
        .and_then(|grant| TokenSet::from_grant(grant, state.accounting.realm_id(), Utc::now()));
    let tokens = match refreshed {
        Ok(tokens) => tokens,
        Err(e) => {
            tracing::warn!(error = %e, "provider token refresh failed");
            return Ok(Redirect::to(CONNECT_PROVIDER_PATH));
        }
    };
    token_service::save_company_token(&state.pool, state.config.quickbooks_environment, &tokens)
        .await?;
    cookies::set_provider_cookies(&jar, &tokens, state.cookie_secure());

    Ok(Redirect::to(&cookies::safe_return_path(query.return_url.as_deref())))
}

/// Copy the stored company token into cookies and go back to `returnUrl`.
///
/// An expired stored access token is refreshed first.
pub async fn set_cookies(
    State(state): State<AppState>,
    jar: Cookies,
    Query(query): Query<ReturnQuery>,
) -> Result<Redirect, AppError> {
    let store = state.access_store();
    let access =
        access::ensure_provider_tokens(&store, state.accounting.as_ref(), None, Utc::now()).await?;

    match access.and_then(|a| a.refreshed) {
        Some(tokens) => {
            cookies::set_provider_cookies(&jar, &tokens, state.cookie_secure());
            Ok(Redirect::to(&cookies::safe_return_path(query.return_url.as_deref())))
        }
        None => Ok(Redirect::to(CONNECT_PROVIDER_PATH)),
    }
}

fn ensure_not_tenant(user: &User) -> Result<(), AppError> {
    if user.account_type == AccountType::Tenant {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

pub async fn list_customers(
    State(state): State<AppState>,
    Extension(session): Extension<SessionUser>,
    jar: Cookies,
) -> Result<Json<Vec<Customer>>, AppError> {
    ensure_not_tenant(&session.user)?;
    let access_token = require_provider_access(&state, &jar).await?;
    Ok(Json(state.accounting.list_customers(&access_token).await?))
}

pub async fn list_vendors(
    State(state): State<AppState>,
    Extension(session): Extension<SessionUser>,
    jar: Cookies,
) -> Result<Json<Vec<Vendor>>, AppError> {
    ensure_not_tenant(&session.user)?;
    let access_token = require_provider_access(&state, &jar).await?;
    Ok(Json(state.accounting.list_vendors(&access_token).await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct InvoiceQuery {
    pub customer_id: Option<String>,
}

/// Customer whose invoices `user` may list, or `None` for every customer.
///
/// Tenants are pinned to their own customer id.
pub(crate) fn invoice_scope(user: &User, requested: Option<&str>) -> Result<Option<String>, AppError> {
    let requested = requested.map(str::trim).filter(|id| !id.is_empty());
    match user.account_type {
        AccountType::Tenant => match requested {
            Some(id) if id != user.accounting_id => Err(AppError::Forbidden),
            _ => Ok(Some(user.accounting_id.clone())),
        },
        _ => Ok(requested.map(str::to_string)),
    }
}

pub(crate) fn filter_invoices(invoices: Vec<Invoice>, scope: Option<&str>) -> Vec<InvoiceView> {
    invoices
        .into_iter()
        .filter(|invoice| scope.is_none_or(|customer_id| invoice.belongs_to(customer_id)))
        .map(InvoiceView::from)
        .collect()
}

/// Find one invoice `user` may see. Tenants get 404 for invoices of other
/// customers.
pub(crate) fn find_visible_invoice(
    invoices: Vec<Invoice>,
    user: &User,
    invoice_id: &str,
) -> Result<InvoiceView, AppError> {
    let invoice = invoices
        .into_iter()
        .find(|invoice| invoice.id == invoice_id)
        .ok_or(AppError::InvoiceNotFound)?;

    if user.account_type == AccountType::Tenant && !invoice.belongs_to(&user.accounting_id) {
        return Err(AppError::InvoiceNotFound);
    }
    Ok(invoice.into())
}

pub async fn list_invoices(
    State(state): State<AppState>,
    Extension(session): Extension<SessionUser>,
    jar: Cookies,
    Query(query): Query<InvoiceQuery>,
) -> Result<Json<Vec<InvoiceView>>, AppError> {
    let scope = invoice_scope(&session.user, query.customer_id.as_deref())?;
    if scope.as_deref() == Some("") {
        // Unlinked tenant: nothing is theirs yet.
        return Ok(Json(Vec::new()));
    }

    let access_token = require_provider_access(&state, &jar).await?;
    let invoices = state.accounting.list_invoices(&access_token).await?;
    Ok(Json(filter_invoices(invoices, scope.as_deref())))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    Extension(session): Extension<SessionUser>,
    jar: Cookies,
    Path(invoice_id): Path<String>,
) -> Result<Json<InvoiceView>, AppError> {
    let access_token = require_provider_access(&state, &jar).await?;
    let invoices = state.accounting.list_invoices(&access_token).await?;
    Ok(Json(find_visible_invoice(invoices, &session.user, &invoice_id)?))
}
