//! Profile HTTP handlers.

use axum::{Extension, Json, extract::State};
use tower_cookies::Cookies;

use crate::{
    error::AppError,
    handlers::quickbooks::optional_provider_access,
    models::{
        session::SessionUser,
        user::{UpdateUserRequest, UserResponse},
    },
    services::user_service,
    state::AppState,
};

/// Update the session user's profile.
///
/// # Endpoint
///
/// `POST /api/user`
///
/// Only the provided fields change. Linked tenants and landlords also get
/// their accounting customer/vendor updated.
///
/// # Response
///
/// - **Success (200 OK)**: the updated user
/// - **Error (401)**: no session
/// - **Error (404)**: linked accounting entity no longer exists
/// - **Error (502)**: provider rejected the update
pub async fn update_user(
    State(state): State<AppState>,
    Extension(session): Extension<SessionUser>,
    jar: Cookies,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let access_token = if session.user.is_linked() {
        optional_provider_access(&state, &jar).await
    } else {
        None
    };

    let user = user_service::update_profile(
        &state.pool,
        state.accounting.as_ref(),
        access_token.as_deref(),
        &session.user,
        request,
    )
    .await?;

    Ok(Json(user.into()))
}
