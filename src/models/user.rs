//! User data models and API request/response types.
//!
//! This module defines:
//! - `User`: Database entity representing a portal account
//! - `AccountType`: The single role each user holds
//! - Request bodies for signup, login and profile updates
//! - `UserResponse`: Response body returned to clients (no password hash)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use uuid::Uuid;

/// Role of a portal account.
///
/// Tenants are linked to accounting customers, landlords to accounting
/// vendors. Managers and admins are never linked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum AccountType {
    #[default]
    Tenant,
    Landlord,
    Manager,
    Admin,
}

impl AccountType {
    /// Whether this role is mirrored by an entity in the accounting provider.
    pub fn is_accounting_linked(self) -> bool {
        matches!(self, AccountType::Tenant | AccountType::Landlord)
    }

    /// Whether this role may manage every property, not only its own.
    pub fn is_staff(self) -> bool {
        matches!(self, AccountType::Manager | AccountType::Admin)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AccountType::Tenant => "tenant",
            AccountType::Landlord => "landlord",
            AccountType::Manager => "manager",
            AccountType::Admin => "admin",
        }
    }
}

/// Postal address, shaped after the accounting provider's bill address.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default)]
    pub line1: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub postal_code: String,
    /// State or province code, e.g. "CA".
    #[serde(default)]
    pub country_sub_division_code: String,
    pub country: Option<String>,
}

/// Represents a user record from the database.
///
/// # Database Table
///
/// Maps to the `users` table. Each user:
/// - Has exactly one `account_type`
/// - Is identified by a case-insensitive unique email
/// - Carries the id of its accounting customer/vendor once linked
///   (`accounting_id` is empty until then)
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,

    /// Argon2 PHC string, never serialized.
    pub password_hash: String,

    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
    pub company_name: Option<String>,
    pub account_type: AccountType,

    /// Customer id (tenants) or vendor id (landlords) in the accounting provider.
    pub accounting_id: String,

    pub address: Option<Json<Address>>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn initials(&self) -> String {
        self.first_name
            .chars()
            .next()
            .into_iter()
            .chain(self.last_name.chars().next())
            .flat_map(char::to_uppercase)
            .collect()
    }

    pub fn is_linked(&self) -> bool {
        !self.accounting_id.is_empty()
    }
}

/// Request body for `POST /api/auth/signup`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub phone_number: Option<String>,
    pub company_name: Option<String>,
    #[serde(default)]
    pub account_type: AccountType,
    /// Pre-existing accounting id, when the caller already knows it.
    #[serde(default, alias = "intuitCustomerId")]
    pub accounting_id: String,
    pub address: Option<Address>,
}

/// Request body for `POST /api/auth/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request body for `POST /api/user`.
///
/// Only provided fields are changed.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub company_name: Option<String>,
    pub address: Option<Address>,
}

/// Response body for user endpoints.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
    pub company_name: Option<String>,
    pub account_type: AccountType,
    pub accounting_id: String,
    pub address: Option<Address>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Drops the password hash and unwraps the JSON address.
impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            phone_number: user.phone_number,
            company_name: user.company_name,
            account_type: user.account_type,
            accounting_id: user.accounting_id,
            address: user.address.map(|a| a.0),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_user(account_type: AccountType, accounting_id: &str) -> User {
    let now = Utc::now();
    User {
        id: Uuid::new_v4(),
        email: "Amy.Lauterbach@example.com".to_string(),
        password_hash: String::new(),
        first_name: "Amy".to_string(),
        last_name: "Lauterbach".to_string(),
        phone_number: Some("555-0100".to_string()),
        company_name: None,
        account_type,
        accounting_id: accounting_id.to_string(),
        address: None,
        last_login: None,
        created_at: now,
        updated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signup_defaults_to_tenant_and_accepts_legacy_id_name() {
        let request: SignupRequest = serde_json::from_value(serde_json::json!({
            "email": "a@b.com",
            "password": "password1",
            "firstName": "A",
            "lastName": "B",
            "intuitCustomerId": "58"
        }))
        .unwrap();

        assert_eq!(request.account_type, AccountType::Tenant);
        assert_eq!(request.accounting_id, "58");
    }

    #[test]
    fn only_tenants_and_landlords_are_linked() {
        assert!(AccountType::Tenant.is_accounting_linked());
        assert!(AccountType::Landlord.is_accounting_linked());
        assert!(!AccountType::Manager.is_accounting_linked());
        assert!(!AccountType::Admin.is_accounting_linked());
    }

    #[test]
    fn response_hides_password_hash() {
        let mut user = sample_user(AccountType::Landlord, "7");
        user.password_hash = "$argon2id$secret".to_string();

        let json = serde_json::to_value(UserResponse::from(user)).unwrap();

        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["accountType"], "landlord");
        assert_eq!(json["accountingId"], "7");
    }

    #[test]
    fn initials_are_uppercase() {
        let mut user = sample_user(AccountType::Tenant, "");
        user.first_name = "amy".to_string();
        user.last_name = "lauterbach".to_string();
        assert_eq!(user.initials(), "AL");
        assert_eq!(user.full_name(), "amy lauterbach");
    }
}
