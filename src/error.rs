//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Failure talking to the accounting provider.
#[derive(Debug, thiserror::Error)]
pub enum AccountingError {
    /// Transport-level failure (DNS, TLS, timeout, body read).
    #[error("accounting provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider rejected the access token or the grant.
    #[error("accounting provider rejected the credentials")]
    Unauthorized,

    /// Any other non-success response.
    #[error("accounting provider returned {status}: {body}")]
    Rejected { status: u16, body: String },

    /// Response body did not have the expected shape.
    #[error("unexpected accounting provider response: {0}")]
    Decode(String),
}

/// Application-wide error type.
///
/// Each variant maps to a specific HTTP status code and error code.
///
/// # Error Categories
///
/// - **Database Errors**: Any sqlx::Error from database operations
/// - **Authentication Errors**: Missing or invalid session, bad credentials
/// - **Resource Errors**: Requested users, properties or invoices not found
/// - **Provider Errors**: Accounting provider unreachable or not connected
/// - **Validation Errors**: Invalid request data
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed (e.g., connection error, query error).
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Session cookie is missing, expired, or signed with another key.
    #[error("Authentication required")]
    Unauthorized,

    /// Email or password did not match.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Authenticated, but the role does not allow the operation.
    #[error("Not allowed for this account")]
    Forbidden,

    #[error("User not found")]
    UserNotFound,

    #[error("Property not found")]
    PropertyNotFound,

    #[error("Invoice not found")]
    InvoiceNotFound,

    /// Customer or vendor missing on the provider side.
    #[error("Accounting entity not found")]
    EntityNotFound,

    #[error("Email already registered")]
    EmailTaken,

    /// Request body or parameters are invalid.
    ///
    /// The String contains details about what was invalid.
    #[error("Invalid request")]
    InvalidRequest(String),

    /// No provider token pair is available in cookies or storage.
    #[error("Accounting provider is not connected")]
    ProviderNotConnected,

    #[error(transparent)]
    Accounting(#[from] AccountingError),

    /// Internal failure that should not leak details to clients.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(_: jsonwebtoken::errors::Error) -> Self {
        AppError::Unauthorized
    }
}

/// Convert AppError into an HTTP response.
///
/// # Response Format
///
/// All errors return JSON in this format:
/// ```json
/// {
///   "error": {
///     "code": "error_type",
///     "message": "Human-readable error message"
///   }
/// }
/// ```
///
/// Database and internal errors are logged and replaced by a generic message.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", self.to_string()),
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "invalid_credentials",
                self.to_string(),
            ),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "forbidden", self.to_string()),
            AppError::UserNotFound => (StatusCode::NOT_FOUND, "user_not_found", self.to_string()),
            AppError::PropertyNotFound => {
                (StatusCode::NOT_FOUND, "property_not_found", self.to_string())
            }
            AppError::InvoiceNotFound => {
                (StatusCode::NOT_FOUND, "invoice_not_found", self.to_string())
            }
            AppError::EntityNotFound => {
                (StatusCode::NOT_FOUND, "entity_not_found", self.to_string())
            }
            AppError::EmailTaken => (StatusCode::CONFLICT, "email_taken", self.to_string()),
            AppError::InvalidRequest(ref msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", msg.clone())
            }
            AppError::ProviderNotConnected => (
                StatusCode::UNAUTHORIZED,
                "provider_not_connected",
                self.to_string(),
            ),
            AppError::Accounting(AccountingError::Unauthorized) => (
                StatusCode::UNAUTHORIZED,
                "accounting_error",
                "Accounting provider rejected the credentials".to_string(),
            ),
            AppError::Accounting(ref e) => {
                tracing::error!(error = %e, "accounting provider call failed");
                (
                    StatusCode::BAD_GATEWAY,
                    "accounting_error",
                    "Accounting provider request failed".to_string(),
                )
            }
            AppError::Database(ref e) => {
                tracing::error!(error = %e, "database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
            AppError::Internal(ref e) => {
                tracing::error!(error = %e, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_variants_to_status_codes() {
        let cases = [
            (AppError::Unauthorized, StatusCode::UNAUTHORIZED),
            (AppError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (AppError::Forbidden, StatusCode::FORBIDDEN),
            (AppError::PropertyNotFound, StatusCode::NOT_FOUND),
            (AppError::EmailTaken, StatusCode::CONFLICT),
            (
                AppError::InvalidRequest("bad".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (AppError::ProviderNotConnected, StatusCode::UNAUTHORIZED),
            (
                AppError::Accounting(AccountingError::Unauthorized),
                StatusCode::UNAUTHORIZED,
            ),
            (
                AppError::Accounting(AccountingError::Rejected {
                    status: 500,
                    body: "boom".to_string(),
                }),
                StatusCode::BAD_GATEWAY,
            ),
            (
                AppError::Internal("hidden".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }
}
