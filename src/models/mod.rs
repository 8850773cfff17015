//! Data models representing database entities and API payloads.

/// Accounting provider entities (customers, vendors, invoices)
pub mod accounting;
/// Rental properties and their derived metrics
pub mod property;
/// Session token claims and request context
pub mod session;
/// Provider OAuth2 token pairs
pub mod token;
/// Portal user accounts
pub mod user;
