//! Session cookie authentication middleware.
//!
//! This middleware intercepts every protected API request to:
//! 1. Read the `auth_token` cookie
//! 2. Verify the JWT signature and expiry
//! 3. Load the user it names
//! 4. Inject a `SessionUser` into the request
//! 5. Reject anything else with HTTP 401

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tower_cookies::Cookies;

use crate::{
    cookies, error::AppError, models::session::SessionUser, services::user_service,
    state::AppState,
};

/// Session middleware function.
///
/// Handlers behind it extract the user with `Extension<SessionUser>`.
pub async fn require_session(
    State(state): State<AppState>,
    jar: Cookies,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = cookies::read_session_token(&jar).ok_or(AppError::Unauthorized)?;
    let claims = state.sessions.verify(&token)?;

    // A valid token for a deleted user is still unauthenticated.
    let user = user_service::find_user(&state.pool, claims.sub)
        .await?
        .ok_or(AppError::Unauthorized)?;

    request.extensions_mut().insert(SessionUser { user });

    Ok(next.run(request).await)
}
