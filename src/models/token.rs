//! Accounting provider OAuth2 token models.
//!
//! The provider issues a short-lived access token (about an hour) and a
//! long-lived refresh token (about 100 days). `TokenSet` records both with
//! absolute expiry instants so validity checks do not depend on when the
//! grant was received.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AccountingError;

/// Tokens are treated as expired this long before their real expiry.
pub const EXPIRY_SKEW_SECONDS: i64 = 60;

/// Raw token endpoint response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    /// Refresh token lifetime in seconds.
    #[serde(default = "default_refresh_lifetime")]
    pub x_refresh_token_expires_in: i64,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

fn default_refresh_lifetime() -> i64 {
    // Provider default: 100 days.
    100 * 24 * 60 * 60
}

/// An access/refresh pair with absolute expiry instants.
///
/// Stored in the `accounting_tokens` table (one row per environment) and
/// mirrored into browser cookies.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct TokenSet {
    pub realm_id: String,
    #[serde(skip_serializing)]
    pub access_token: String,
    #[serde(skip_serializing)]
    pub refresh_token: String,
    pub token_type: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
}

fn expires_after(
    now: DateTime<Utc>,
    seconds: i64,
    field: &str,
) -> Result<DateTime<Utc>, AccountingError> {
    Duration::try_seconds(seconds)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .ok_or_else(|| AccountingError::Decode(format!("{field} out of range: {seconds}")))
}

impl TokenSet {
    /// Fails when a lifetime in the grant does not fit a timestamp.
    pub fn from_grant(
        grant: TokenGrant,
        realm_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Self, AccountingError> {
        Ok(Self {
            realm_id: realm_id.to_string(),
            access_expires_at: expires_after(now, grant.expires_in, "expires_in")?,
            refresh_expires_at: expires_after(
                now,
                grant.x_refresh_token_expires_in,
                "x_refresh_token_expires_in",
            )?,
            access_token: grant.access_token,
            refresh_token: grant.refresh_token,
            token_type: grant.token_type,
        })
    }

    pub fn is_access_valid(&self, now: DateTime<Utc>) -> bool {
        !self.access_token.is_empty()
            && now + Duration::seconds(EXPIRY_SKEW_SECONDS) < self.access_expires_at
    }

    pub fn is_refresh_valid(&self, now: DateTime<Utc>) -> bool {
        !self.refresh_token.is_empty()
            && now + Duration::seconds(EXPIRY_SKEW_SECONDS) < self.refresh_expires_at
    }
}

/// Token pair as read back from browser cookies.
///
/// The cookies carry no refresh expiry, and the access expiry may be missing
/// when the cookie was dropped; an unknown expiry counts as expired.
#[derive(Debug, Clone, PartialEq)]
pub struct CookieTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub access_expires_at: Option<DateTime<Utc>>,
}

impl CookieTokens {
    pub fn is_access_valid(&self, now: DateTime<Utc>) -> bool {
        match self.access_expires_at {
            Some(expires_at) => {
                !self.access_token.is_empty()
                    && now + Duration::seconds(EXPIRY_SKEW_SECONDS) < expires_at
            }
            None => false,
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_tokens(now: DateTime<Utc>, access_ttl_seconds: i64) -> TokenSet {
    TokenSet {
        realm_id: "4620816365".to_string(),
        access_token: "access-token".to_string(),
        refresh_token: "refresh-token".to_string(),
        token_type: "bearer".to_string(),
        access_expires_at: now + Duration::seconds(access_ttl_seconds),
        refresh_expires_at: now + Duration::days(100),
    }
}
