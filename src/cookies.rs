//! Cookie names, builders and the signed OAuth state.
//!
//! Every cookie the portal sets is HttpOnly, SameSite=Lax and scoped to `/`;
//! `Secure` follows `COOKIE_SECURE`.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tower_cookies::{Cookie, Cookies, cookie::SameSite};

use crate::{
    error::AppError,
    models::token::{CookieTokens, TokenSet},
};

pub const SESSION_COOKIE: &str = "auth_token";
pub const ACCESS_TOKEN_COOKIE: &str = "qb_access_token";
pub const REFRESH_TOKEN_COOKIE: &str = "qb_refresh_token";
pub const EXPIRES_AT_COOKIE: &str = "qb_token_expires_at";
pub const OAUTH_STATE_COOKIE: &str = "qb_oauth_state";

const ACCESS_TOKEN_MAX_AGE: time::Duration = time::Duration::hours(2);
const REFRESH_TOKEN_MAX_AGE: time::Duration = time::Duration::days(30);
const OAUTH_STATE_MAX_AGE: time::Duration = time::Duration::minutes(10);

type HmacSha256 = Hmac<Sha256>;

fn build(name: &'static str, value: String, max_age: time::Duration, secure: bool) -> Cookie<'static> {
    let mut cookie = Cookie::new(name, value);
    cookie.set_http_only(true);
    cookie.set_secure(secure);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_path("/");
    cookie.set_max_age(max_age);
    cookie
}

/// Expired, empty cookie that makes the browser drop `name`.
pub fn removal(name: &'static str, secure: bool) -> Cookie<'static> {
    let mut cookie = build(name, String::new(), time::Duration::ZERO, secure);
    cookie.set_expires(Some(time::OffsetDateTime::UNIX_EPOCH));
    cookie
}

pub fn session_cookie(token: String, ttl: chrono::Duration, secure: bool) -> Cookie<'static> {
    build(
        SESSION_COOKIE,
        token,
        time::Duration::seconds(ttl.num_seconds()),
        secure,
    )
}

/// Access token, refresh token and access expiry cookies for `tokens`.
pub fn provider_cookies(tokens: &TokenSet, secure: bool) -> [Cookie<'static>; 3] {
    [
        build(
            ACCESS_TOKEN_COOKIE,
            tokens.access_token.clone(),
            ACCESS_TOKEN_MAX_AGE,
            secure,
        ),
        build(
            REFRESH_TOKEN_COOKIE,
            tokens.refresh_token.clone(),
            REFRESH_TOKEN_MAX_AGE,
            secure,
        ),
        build(
            EXPIRES_AT_COOKIE,
            tokens.access_expires_at.to_rfc3339(),
            ACCESS_TOKEN_MAX_AGE,
            secure,
        ),
    ]
}

pub fn set_provider_cookies(cookies: &Cookies, tokens: &TokenSet, secure: bool) {
    for cookie in provider_cookies(tokens, secure) {
        cookies.add(cookie);
    }
}

/// Drop the session and every provider cookie.
pub fn clear_all(cookies: &Cookies, secure: bool) {
    for name in [
        SESSION_COOKIE,
        ACCESS_TOKEN_COOKIE,
        REFRESH_TOKEN_COOKIE,
        EXPIRES_AT_COOKIE,
        OAUTH_STATE_COOKIE,
    ] {
        cookies.add(removal(name, secure));
    }
}

/// Accepts RFC 3339 or epoch milliseconds.
fn parse_expiry(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(value) {
        return Some(at.with_timezone(&Utc));
    }
    value
        .parse::<i64>()
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
}

/// Provider tokens from a cookie lookup.
///
/// A refresh token is required; the access token and its expiry may be
/// missing, in which case the pair counts as expired.
pub fn provider_tokens_from<F>(get: F) -> Option<CookieTokens>
where
    F: Fn(&str) -> Option<String>,
{
    let refresh_token = get(REFRESH_TOKEN_COOKIE).filter(|t| !t.is_empty())?;
    Some(CookieTokens {
        access_token: get(ACCESS_TOKEN_COOKIE).unwrap_or_default(),
        refresh_token,
        access_expires_at: get(EXPIRES_AT_COOKIE).as_deref().and_then(parse_expiry),
    })
}

pub fn read_provider_tokens(cookies: &Cookies) -> Option<CookieTokens> {
    provider_tokens_from(|name| cookies.get(name).map(|c| c.value().to_string()))
}

pub fn read_session_token(cookies: &Cookies) -> Option<String> {
    cookies
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}

fn state_signature(secret: &str, nonce: &str) -> Result<HmacSha256, AppError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Internal(format!("state key rejected: {e}")))?;
    mac.update(nonce.as_bytes());
    Ok(mac)
}

/// New `nonce.signature` OAuth state value.
pub fn new_oauth_state(secret: &str) -> Result<String, AppError> {
    let bytes: [u8; 16] = rand::random();
    let nonce = hex::encode(bytes);
    let signature = state_signature(secret, &nonce)?.finalize().into_bytes();
    Ok(format!("{nonce}.{}", hex::encode(signature)))
}

/// The state returned by the provider must equal the one bound to this
/// browser and carry a valid signature.
pub fn verify_oauth_state(secret: &str, returned: &str, bound: Option<&str>) -> bool {
    if bound != Some(returned) {
        return false;
    }
    let Some((nonce, signature)) = returned.split_once('.') else {
        return false;
    };
    let Ok(signature) = hex::decode(signature) else {
        return false;
    };
    state_signature(secret, nonce)
        .map(|mac| mac.verify_slice(&signature).is_ok())
        .unwrap_or(false)
}

pub fn oauth_state_cookie(state: String, secure: bool) -> Cookie<'static> {
    build(OAUTH_STATE_COOKIE, state, OAUTH_STATE_MAX_AGE, secure)
}

/// Local absolute path to send the browser back to; anything else becomes
/// `/dashboard`.
pub fn safe_return_path(return_url: Option<&str>) -> String {
    match return_url.map(str::trim) {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.starts_with("/\\")
                && !path.chars().any(char::is_control) =>
        {
            path.to_string()
        }
        _ => "/dashboard".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::models::token::sample_tokens;

    #[test]
    fn provider_cookies_are_http_only_and_lax() {
        let now = Utc::now();
        let [access, refresh, expires] = provider_cookies(&sample_tokens(now, 3600), true);

        assert_eq!(access.name(), ACCESS_TOKEN_COOKIE);
        assert_eq!(access.http_only(), Some(true));
        assert_eq!(access.secure(), Some(true));
        assert_eq!(access.same_site(), Some(SameSite::Lax));
        assert_eq!(access.path(), Some("/"));
        assert_eq!(access.max_age(), Some(time::Duration::hours(2)));
        assert_eq!(refresh.max_age(), Some(time::Duration::days(30)));
        assert_eq!(
            parse_expiry(expires.value()).map(|t| t.timestamp()),
            Some((now + chrono::Duration::seconds(3600)).timestamp())
        );
    }

    #[test]
    fn tokens_require_refresh_cookie() {
        let jar: HashMap<&str, String> =
            HashMap::from([(ACCESS_TOKEN_COOKIE, "a".to_string())]);
        assert!(provider_tokens_from(|n| jar.get(n).cloned()).is_none());

        let jar: HashMap<&str, String> = HashMap::from([
            (REFRESH_TOKEN_COOKIE, "r".to_string()),
            (EXPIRES_AT_COOKIE, "1735689600000".to_string()),
        ]);
        let tokens = provider_tokens_from(|n| jar.get(n).cloned()).unwrap();
        assert_eq!(tokens.access_token, "");
        assert_eq!(tokens.access_expires_at.map(|t| t.timestamp()), Some(1_735_689_600));
    }

    #[test]
    fn garbage_expiry_reads_as_unknown() {
        assert!(parse_expiry("tomorrow").is_none());
    }

    #[test]
    fn oauth_state_binds_to_cookie_and_secret() {
        let state = new_oauth_state("secret").unwrap();

        assert!(verify_oauth_state("secret", &state, Some(&state)));
        assert!(!verify_oauth_state("secret", &state, None));
        assert!(!verify_oauth_state("other", &state, Some(&state)));

        let forged = format!("{}.00", state.split_once('.').unwrap().0);
        assert!(!verify_oauth_state("secret", &forged, Some(&forged)));
        assert!(!verify_oauth_state("secret", "testState", Some("testState")));
    }

    #[test]
    fn return_paths_must_stay_local() {
        assert_eq!(safe_return_path(Some("/dashboard/tenant/58")), "/dashboard/tenant/58");
        assert_eq!(safe_return_path(None), "/dashboard");
        assert_eq!(safe_return_path(Some("https://evil.test")), "/dashboard");
        assert_eq!(safe_return_path(Some("//evil.test/x")), "/dashboard");
        assert_eq!(safe_return_path(Some("/\\evil.test")), "/dashboard");
    }

    #[test]
    fn removal_cookie_expires_immediately() {
        let cookie = removal(SESSION_COOKIE, false);
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(time::Duration::ZERO));
    }
}
