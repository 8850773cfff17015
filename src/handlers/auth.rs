//! Authentication HTTP handlers.
//!
//! - POST /api/auth/signup - Register and start a session
//! - POST /api/auth/login - Start a session
//! - POST /api/auth/logout - Drop session and provider cookies

use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;
use serde::Serialize;
use serde_json::{Value, json};
use tower_cookies::Cookies;

use crate::{
    cookies,
    error::AppError,
    handlers::quickbooks::optional_provider_access,
    models::user::{LoginRequest, SignupRequest, User, UserResponse},
    services::user_service,
    state::AppState,
};

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub user: UserResponse,
}

fn start_session(state: &AppState, jar: &Cookies, user: &User) -> Result<(), AppError> {
    let token = state.sessions.issue(user, Utc::now())?;
    jar.add(cookies::session_cookie(
        token,
        state.sessions.ttl(),
        state.cookie_secure(),
    ));
    Ok(())
}

/// The signed-in user behind a signup request, if the session cookie is valid.
async fn signup_actor(state: &AppState, jar: &Cookies) -> Result<Option<User>, AppError> {
    let Some(claims) = cookies::read_session_token(jar).and_then(|t| state.sessions.verify(&t).ok())
    else {
        return Ok(None);
    };
    user_service::find_user(&state.pool, claims.sub).await
}

/// Register a new user.
///
/// # Endpoint
///
/// `POST /api/auth/signup`
///
/// # Request Body
///
/// ```json
/// {
///   "email": "amy@example.com",
///   "password": "at-least-8",
///   "firstName": "Amy",
///   "lastName": "Lauterbach",
///   "accountType": "tenant"
/// }
/// ```
///
/// # Response
///
/// - **Success (201 Created)**: the new user; the session cookie is set
///   unless a staff member created the account
/// - **Error (400)**: missing fields or short password
/// - **Error (403)**: `manager`/`admin` or `accountingId` without a staff session
/// - **Error (409)**: email already registered
#[tracing::instrument(skip_all)]
pub async fn signup(
    State(state): State<AppState>,
    jar: Cookies,
    Json(request): Json<SignupRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let actor = signup_actor(&state, &jar).await?;
    let created_by_staff = actor.as_ref().is_some_and(|a| a.account_type.is_staff());

    // Linking at signup is best effort; the dashboard chain retries it.
    let access_token = optional_provider_access(&state, &jar).await;

    let user = user_service::signup(
        &state.pool,
        state.accounting.as_ref(),
        access_token.as_deref(),
        actor.as_ref(),
        request,
    )
    .await?;

    if !created_by_staff {
        start_session(&state, &jar, &user)?;
    }

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            success: true,
            user: user.into(),
        }),
    ))
}

/// Log in with email and password.
///
/// # Response
///
/// - **Success (200 OK)**: the user; the session cookie is set
/// - **Error (401)**: unknown email or wrong password
#[tracing::instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    jar: Cookies,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let user = user_service::authenticate(&state.pool, &request.email, &request.password).await?;

    start_session(&state, &jar, &user)?;

    Ok(Json(AuthResponse {
        success: true,
        user: user.into(),
    }))
}

/// Log out. Always succeeds.
pub async fn logout(State(state): State<AppState>, jar: Cookies) -> Json<Value> {
    cookies::clear_all(&jar, state.cookie_secure());
    Json(json!({ "success": true, "message": "Logged out successfully" }))
}
