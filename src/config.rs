//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to automatically deserialize environment variables into a type-safe struct.

use serde::Deserialize;

/// Which QuickBooks environment the service talks to.
///
/// Tokens are stored per environment so a sandbox token never leaks into
/// production calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuickBooksEnvironment {
    Sandbox,
    Production,
}

impl QuickBooksEnvironment {
    /// Base URL of the accounting API for this environment.
    pub fn api_base_url(self) -> &'static str {
        match self {
            QuickBooksEnvironment::Sandbox => "https://sandbox-quickbooks.api.intuit.com",
            QuickBooksEnvironment::Production => "https://quickbooks.api.intuit.com",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            QuickBooksEnvironment::Sandbox => "sandbox",
            QuickBooksEnvironment::Production => "production",
        }
    }
}

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required): PostgreSQL connection string
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `JWT_SECRET` (required): HMAC key for session tokens and OAuth state
/// - `QUICKBOOKS_CLIENT_ID`, `QUICKBOOKS_CLIENT_SECRET`, `QUICKBOOKS_REALM_ID` (required)
/// - `QUICKBOOKS_ENVIRONMENT` (optional): `sandbox` or `production`, defaults to sandbox
/// - `APP_URL` (optional): public base URL, defaults to `http://localhost:3000`
/// - `COOKIE_SECURE` (optional): mark cookies `Secure`, defaults to false
/// - `SESSION_TTL_HOURS` (optional): session lifetime, defaults to 24
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    pub jwt_secret: String,

    pub quickbooks_client_id: String,

    pub quickbooks_client_secret: String,

    pub quickbooks_realm_id: String,

    #[serde(default = "default_environment")]
    pub quickbooks_environment: QuickBooksEnvironment,

    #[serde(default = "default_app_url")]
    pub app_url: String,

    #[serde(default)]
    pub cookie_secure: bool,

    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: i64,
}

/// Default port if SERVER_PORT environment variable is not set.
fn default_port() -> u16 {
    3000
}

fn default_environment() -> QuickBooksEnvironment {
    QuickBooksEnvironment::Sandbox
}

fn default_app_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_session_ttl_hours() -> i64 {
    24
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and deserializes them into a Config struct.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing (e.g., DATABASE_URL, JWT_SECRET)
    /// - Environment variable values cannot be parsed into expected types
    pub fn from_env() -> Result<Self, envy::Error> {
        // Try to load .env file if it exists (does nothing if not found)
        dotenvy::dotenv().ok();

        // Field names are automatically converted: database_url -> DATABASE_URL
        envy::from_env::<Config>()
    }

    /// OAuth redirect URI registered with the accounting provider.
    pub fn oauth_redirect_uri(&self) -> String {
        format!(
            "{}/api/quickbooks/callback",
            self.app_url.trim_end_matches('/')
        )
    }
}

#[cfg(test)]
impl Config {
    /// Configuration with fixed values for unit and router tests.
    pub fn for_tests() -> Self {
        Self {
            database_url: "postgres://localhost/property_portal_test".to_string(),
            server_port: 3000,
            jwt_secret: "test-secret-test-secret-test-secret".to_string(),
            quickbooks_client_id: "client-id".to_string(),
            quickbooks_client_secret: "client-secret".to_string(),
            quickbooks_realm_id: "4620816365".to_string(),
            quickbooks_environment: QuickBooksEnvironment::Sandbox,
            app_url: "http://localhost:3000/".to_string(),
            cookie_secure: false,
            session_ttl_hours: 24,
        }
    }
}
