//! Password hashing and session token issuing.
//!
//! Passwords are stored as argon2id PHC strings. Sessions are stateless HS256
//! JWTs kept in the `auth_token` cookie; revoking one means clearing the
//! cookie, there is no server-side session table.

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::{
    error::AppError,
    models::{session::SessionClaims, user::User},
};

/// Minimum accepted password length.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Hash a password into an argon2id PHC string.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))
}

/// Check a password against a stored PHC string.
///
/// A malformed stored hash counts as a mismatch.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!(error = %e, "stored password hash is malformed");
            false
        }
    }
}

/// Signing keys and lifetime for session tokens.
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl SessionKeys {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::hours(ttl_hours),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a session token for `user`.
    pub fn issue(&self, user: &User, now: DateTime<Utc>) -> Result<String, AppError> {
        let claims = SessionClaims {
            sub: user.id,
            email: user.email.clone(),
            account_type: user.account_type,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("session token signing failed: {e}")))
    }

    /// Validate signature and expiry.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, AppError> {
        let validation = Validation::new(Algorithm::HS256);
        Ok(jsonwebtoken::decode::<SessionClaims>(token, &self.decoding, &validation)?.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::{AccountType, sample_user};

    #[test]
    fn password_round_trip() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
    }

    #[test]
    fn malformed_hash_never_verifies() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }

    #[test]
    fn issued_token_verifies_with_same_secret() {
        let keys = SessionKeys::new("secret-one", 24);
        let user = sample_user(AccountType::Landlord, "56");

        let token = keys.issue(&user, Utc::now()).unwrap();
        let claims = keys.verify(&token).unwrap();

        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.account_type, AccountType::Landlord);
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let user = sample_user(AccountType::Tenant, "");
        let token = SessionKeys::new("secret-one", 24)
            .issue(&user, Utc::now())
            .unwrap();

        let result = SessionKeys::new("secret-two", 24).verify(&token);
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let keys = SessionKeys::new("secret-one", 1);
        let user = sample_user(AccountType::Tenant, "");
        let token = keys
            .issue(&user, Utc::now() - Duration::hours(3))
            .unwrap();

        assert!(matches!(keys.verify(&token), Err(AppError::Unauthorized)));
    }
}
