//! Dashboard access middleware.
//!
//! Runs the access chain for every `/dashboard` request and turns its
//! decision into either a 303 redirect or a call to the handler. Refreshed
//! provider tokens are written to cookies on every outcome.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use tower_cookies::Cookies;
use url::form_urlencoded;

use crate::{
    cookies,
    error::AppError,
    models::session::SessionUser,
    services::access::{self, AccessRequest, Decision},
    state::AppState,
};

pub const LOGIN_PATH: &str = "/login";
pub const CONNECT_PROVIDER_PATH: &str = "/quickbooks";

/// Provider access token for the current dashboard request.
#[derive(Debug, Clone)]
pub struct ProviderToken(pub String);

/// Page that starts the provider OAuth flow and comes back to `path`.
pub fn connect_provider_location(path: &str) -> String {
    let query: String = form_urlencoded::Serializer::new(String::new())
        .append_pair("returnUrl", path)
        .finish();
    format!("{CONNECT_PROVIDER_PATH}?{query}")
}

pub async fn dashboard_access(
    State(state): State<AppState>,
    jar: Cookies,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let session_token = cookies::read_session_token(&jar);
    let path = request.uri().path().to_string();
    let store = state.access_store();

    let resolution = access::resolve(
        &store,
        state.accounting.as_ref(),
        &state.sessions,
        AccessRequest {
            session_token: session_token.as_deref(),
            provider_tokens: cookies::read_provider_tokens(&jar),
            path: &path,
            now: Utc::now(),
        },
    )
    .await?;

    if let Some(tokens) = &resolution.refreshed {
        cookies::set_provider_cookies(&jar, tokens, state.cookie_secure());
    }

    match resolution.decision {
        Decision::Login => {
            jar.add(cookies::removal(cookies::SESSION_COOKIE, state.cookie_secure()));
            Ok(Redirect::to(LOGIN_PATH).into_response())
        }
        Decision::ConnectProvider => {
            Ok(Redirect::to(&connect_provider_location(&path)).into_response())
        }
        Decision::Redirect(target) => {
            tracing::debug!(from = %path, to = %target, "dashboard redirect");
            Ok(Redirect::to(&target).into_response())
        }
        Decision::Proceed { user, access_token } => {
            request.extensions_mut().insert(SessionUser { user });
            request.extensions_mut().insert(ProviderToken(access_token));
            Ok(next.run(request).await)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_location_carries_encoded_return_path() {
        assert_eq!(
            connect_provider_location("/dashboard/tenant/58"),
            "/quickbooks?returnUrl=%2Fdashboard%2Ftenant%2F58"
        );
    }
}
