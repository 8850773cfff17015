//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, URL params, cookies)
//! 2. Calls into the services layer
//! 3. Returns an HTTP response (JSON, redirect, status code)

/// Signup, login and logout
pub mod auth;
/// Dashboard view models behind the access chain
pub mod dashboard;
/// Liveness and database connectivity
pub mod health;
/// Property CRUD and unit management
pub mod properties;
/// Provider OAuth flow and accounting data
pub mod quickbooks;
/// Profile updates
pub mod users;
