//! HTTP middleware components.
//!
//! Middleware are functions that run before route handlers.
//! They can:
//! - Authenticate requests
//! - Refresh provider tokens and rewrite cookies
//! - Short-circuit requests (reject or redirect)

/// Dashboard access chain
pub mod access;
/// Session cookie authentication for API routes
pub mod session;
