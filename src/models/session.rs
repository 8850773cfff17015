//! Session token claims and the per-request session context.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::user::{AccountType, User};

/// Claims carried by the `auth_token` cookie.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// User id.
    pub sub: Uuid,
    pub email: String,
    pub account_type: AccountType,
    pub iat: i64,
    pub exp: i64,
}

/// Authenticated user attached to request extensions by the session
/// middleware. Handlers extract it with `Extension<SessionUser>`.
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub user: User,
}

