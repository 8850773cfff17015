//! Business logic services.
//!
//! Services contain core business logic separated from HTTP handlers.
//! They own the SQL, the accounting provider calls and the access chain.

pub mod access;
pub mod accounting;
pub mod property_service;
pub mod session_service;
pub mod token_service;
pub mod user_service;
