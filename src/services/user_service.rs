//! User accounts: signup, login, profile updates and accounting identity.
//!
//! Tenants are mirrored as accounting customers and landlords as vendors.
//! A user's `accounting_id` is filled either at signup (when provider tokens
//! are available) or later by the access chain.

use chrono::Utc;
use sqlx::types::Json;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::{AccountingError, AppError},
    models::{
        accounting::{Customer, Vendor},
        user::{AccountType, SignupRequest, UpdateUserRequest, User},
    },
    services::{accounting::AccountingProvider, session_service},
};

const USER_COLUMNS: &str = "id, email, password_hash, first_name, last_name, phone_number, \
     company_name, account_type, accounting_id, address, last_login, created_at, updated_at";

/// Validate a signup body before touching the database.
fn validate_signup(request: &SignupRequest) -> Result<(), AppError> {
    let email = request.email.trim();
    if email.is_empty()
        || request.password.is_empty()
        || request.first_name.trim().is_empty()
        || request.last_name.trim().is_empty()
    {
        return Err(AppError::InvalidRequest(
            "email, password, firstName and lastName are required".to_string(),
        ));
    }
    if !email.contains('@') {
        return Err(AppError::InvalidRequest("email is not valid".to_string()));
    }
    if request.password.chars().count() < session_service::MIN_PASSWORD_LEN {
        return Err(AppError::InvalidRequest(format!(
            "password must be at least {} characters",
            session_service::MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

/// Public signup may only create tenants and landlords, and only staff may
/// preset the accounting id.
fn authorize_signup(request: &SignupRequest, actor: Option<&User>) -> Result<(), AppError> {
    if actor.is_some_and(|a| a.account_type.is_staff()) {
        return Ok(());
    }
    if request.account_type.is_staff() || !request.accounting_id.trim().is_empty() {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

/// Register a new user.
///
/// `actor` is the signed-in user issuing the request, if any.
///
/// # Process
///
/// 1. Validate required fields and password length, and the role the
///    caller may grant
/// 2. Reject emails that are already registered (case-insensitive)
/// 3. Hash the password and insert the user
/// 4. For tenants and landlords without a supplied accounting id, link the
///    matching customer/vendor when an access token is available
///
/// A provider failure during step 4 does not fail the signup; the user is
/// left unlinked and the access chain reconciles on first dashboard visit.
///
/// # Errors
///
/// - `InvalidRequest`: missing fields or short password
/// - `Forbidden`: staff role or accounting id requested without a staff session
/// - `EmailTaken`: email already registered
/// - `Database`: database error occurred
pub async fn signup(
    pool: &DbPool,
    provider: &dyn AccountingProvider,
    access_token: Option<&str>,
    actor: Option<&User>,
    request: SignupRequest,
) -> Result<User, AppError> {
    validate_signup(&request)?;
    authorize_signup(&request, actor)?;
    let email = request.email.trim().to_string();

    if find_by_email(pool, &email).await?.is_some() {
        return Err(AppError::EmailTaken);
    }

    let password_hash = session_service::hash_password(&request.password)?;

    let user = sqlx::query_as::<_, User>(&format!(
        r#"
        INSERT INTO users (
            email, password_hash, first_name, last_name, phone_number,
            company_name, account_type, accounting_id, address
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(&email)
    .bind(&password_hash)
    .bind(request.first_name.trim())
    .bind(request.last_name.trim())
    .bind(&request.phone_number)
    .bind(&request.company_name)
    .bind(request.account_type)
    .bind(request.accounting_id.trim())
    .bind(request.address.map(Json))
    .fetch_one(pool)
    .await
    .map_err(|e| match e {
        // Lost a race with a concurrent signup for the same email.
        sqlx::Error::Database(ref db) if db.is_unique_violation() => AppError::EmailTaken,
        other => AppError::Database(other),
    })?;

    tracing::info!(user_id = %user.id, account_type = user.account_type.as_str(), "user registered");

    if user.is_linked() || !user.account_type.is_accounting_linked() {
        return Ok(user);
    }

    let Some(access_token) = access_token else {
        tracing::info!(user_id = %user.id, "no provider token at signup, leaving user unlinked");
        return Ok(user);
    };

    match link_accounting_entity(provider, access_token, &user).await {
        Ok(Some(accounting_id)) => {
            set_accounting_id(pool, user.id, &accounting_id).await?;
            Ok(User {
                accounting_id,
                ..user
            })
        }
        Ok(None) => Ok(user),
        Err(e) => {
            tracing::warn!(user_id = %user.id, error = %e, "could not link accounting entity at signup");
            Ok(user)
        }
    }
}

/// Check credentials and record the login time.
///
/// Unknown email and wrong password both yield `InvalidCredentials`.
pub async fn authenticate(pool: &DbPool, email: &str, password: &str) -> Result<User, AppError> {
    let user = find_by_email(pool, email.trim())
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    if !session_service::verify_password(password, &user.password_hash) {
        return Err(AppError::InvalidCredentials);
    }

    let user = sqlx::query_as::<_, User>(&format!(
        "UPDATE users SET last_login = NOW() WHERE id = $1 RETURNING {USER_COLUMNS}"
    ))
    .bind(user.id)
    .fetch_one(pool)
    .await?;

    tracing::info!(user_id = %user.id, "user logged in");
    Ok(user)
}

pub async fn find_user(pool: &DbPool, id: Uuid) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn find_by_email(pool: &DbPool, email: &str) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)"
    ))
    .bind(email)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

pub async fn set_accounting_id(pool: &DbPool, id: Uuid, accounting_id: &str) -> Result<(), AppError> {
    let updated = sqlx::query(
        "UPDATE users SET accounting_id = $1, updated_at = NOW() WHERE id = $2",
    )
    .bind(accounting_id)
    .bind(id)
    .execute(pool)
    .await?
    .rows_affected();

    if updated == 0 {
        return Err(AppError::UserNotFound);
    }
    tracing::info!(user_id = %id, accounting_id, "user linked to accounting entity");
    Ok(())
}

/// Apply the provided fields of `request` to a copy of `user`.
fn apply_update(user: &User, request: UpdateUserRequest) -> User {
    let mut updated = user.clone();
    if let Some(first_name) = request.first_name.filter(|s| !s.trim().is_empty()) {
        updated.first_name = first_name.trim().to_string();
    }
    if let Some(last_name) = request.last_name.filter(|s| !s.trim().is_empty()) {
        updated.last_name = last_name.trim().to_string();
    }
    if let Some(phone_number) = request.phone_number {
        updated.phone_number = Some(phone_number);
    }
    if let Some(company_name) = request.company_name {
        updated.company_name = Some(company_name);
    }
    if let Some(address) = request.address {
        updated.address = Some(Json(address));
    }
    updated.updated_at = Utc::now();
    updated
}

/// Update the session user's profile.
///
/// Linked tenants and landlords get a sparse update pushed to their customer
/// or vendor first, so a provider failure leaves the local record untouched.
/// Without an access token the local record is updated alone.
pub async fn update_profile(
    pool: &DbPool,
    provider: &dyn AccountingProvider,
    access_token: Option<&str>,
    user: &User,
    request: UpdateUserRequest,
) -> Result<User, AppError> {
    let updated = apply_update(user, request);

    if updated.is_linked() && updated.account_type.is_accounting_linked() {
        match access_token {
            Some(access_token) => push_profile(provider, access_token, &updated).await?,
            None => tracing::warn!(
                user_id = %user.id,
                "no provider token, profile change not pushed to accounting entity"
            ),
        }
    }

    let saved = sqlx::query_as::<_, User>(&format!(
        r#"
        UPDATE users
        SET first_name = $1,
            last_name = $2,
            phone_number = $3,
            company_name = $4,
            address = $5,
            updated_at = NOW()
        WHERE id = $6
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(&updated.first_name)
    .bind(&updated.last_name)
    .bind(&updated.phone_number)
    .bind(&updated.company_name)
    .bind(&updated.address)
    .bind(user.id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::UserNotFound)?;

    Ok(saved)
}

/// Push name, phone, company and address to the linked customer or vendor.
async fn push_profile(
    provider: &dyn AccountingProvider,
    access_token: &str,
    user: &User,
) -> Result<(), AppError> {
    match user.account_type {
        AccountType::Tenant => {
            let current = provider
                .list_customers(access_token)
                .await?
                .into_iter()
                .find(|c| c.id.as_deref() == Some(user.accounting_id.as_str()))
                .ok_or(AppError::EntityNotFound)?;

            let update = Customer {
                id: current.id,
                sync_token: current.sync_token,
                ..Customer::from_user(user)
            };
            provider.update_customer(access_token, &update).await?;
        }
        AccountType::Landlord => {
            let current = provider
                .list_vendors(access_token)
                .await?
                .into_iter()
                .find(|v| v.id.as_deref() == Some(user.accounting_id.as_str()))
                .ok_or(AppError::EntityNotFound)?;

            let update = Vendor {
                id: current.id,
                sync_token: current.sync_token,
                ..Vendor::from_user(user)
            };
            provider.update_vendor(access_token, &update).await?;
        }
        AccountType::Manager | AccountType::Admin => {}
    }
    Ok(())
}

/// Whether a remote entity with this email and display name is `user`.
fn email_matches(entity_email: Option<&str>, user: &User) -> bool {
    entity_email.is_some_and(|email| email.trim().eq_ignore_ascii_case(user.email.trim()))
}

fn name_matches(display_name: &str, user: &User) -> bool {
    display_name.trim().to_lowercase() == user.full_name().trim().to_lowercase()
}

/// Find or create the accounting entity mirroring `user`.
///
/// Tenants map to customers and landlords to vendors. Entities are matched by
/// primary email (case-insensitive) first, then by display name
/// `"first last"`; when nothing matches a new entity is created. Returns
/// `None` for roles that are never linked.
pub async fn link_accounting_entity(
    provider: &dyn AccountingProvider,
    access_token: &str,
    user: &User,
) -> Result<Option<String>, AccountingError> {
    match user.account_type {
        AccountType::Tenant => {
            let customers = provider.list_customers(access_token).await?;
            let existing = customers
                .iter()
                .find(|c| email_matches(c.email(), user))
                .or_else(|| customers.iter().find(|c| name_matches(&c.display_name, user)))
                .and_then(|c| c.id.clone());

            if let Some(id) = existing {
                return Ok(Some(id));
            }

            let created = provider
                .create_customer(access_token, &Customer::from_user(user))
                .await?;
            tracing::info!(user_id = %user.id, customer_id = ?created.id, "accounting customer created");
            created
                .id
                .map(Some)
                .ok_or_else(|| AccountingError::Decode("created customer has no Id".to_string()))
        }
        AccountType::Landlord => {
            let vendors = provider.list_vendors(access_token).await?;
            let existing = vendors
                .iter()
                .find(|v| email_matches(v.email(), user))
                .or_else(|| vendors.iter().find(|v| name_matches(&v.display_name, user)))
                .and_then(|v| v.id.clone());

            if let Some(id) = existing {
                return Ok(Some(id));
            }

            let created = provider
                .create_vendor(access_token, &Vendor::from_user(user))
                .await?;
            tracing::info!(user_id = %user.id, vendor_id = ?created.id, "accounting vendor created");
            created
                .id
                .map(Some)
                .ok_or_else(|| AccountingError::Decode("created vendor has no Id".to_string()))
        }
        AccountType::Manager | AccountType::Admin => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{
            accounting::EmailAddress,
            user::{Address, sample_user},
        },
        services::accounting::mock::{MockProvider, MockState},
    };

    fn signup_request(password: &str) -> SignupRequest {
        serde_json::from_value(serde_json::json!({
            "email": "amy@example.com",
            "password": password,
            "firstName": "Amy",
            "lastName": "Lauterbach"
        }))
        .unwrap()
    }

    fn customer(id: &str, name: &str, email: Option<&str>) -> Customer {
        Customer {
            id: Some(id.to_string()),
            sync_token: Some("1".to_string()),
            display_name: name.to_string(),
            primary_email_addr: email.map(|address| EmailAddress {
                address: address.to_string(),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn signup_validation() {
        assert!(validate_signup(&signup_request("long-enough")).is_ok());
        assert!(matches!(
            validate_signup(&signup_request("short")),
            Err(AppError::InvalidRequest(_))
        ));

        let mut request = signup_request("long-enough");
        request.last_name = "  ".to_string();
        assert!(validate_signup(&request).is_err());

        let mut request = signup_request("long-enough");
        request.email = "not-an-email".to_string();
        assert!(validate_signup(&request).is_err());
    }

    #[test]
    fn public_signup_cannot_grant_staff_roles_or_identities() {
        let mut admin = signup_request("long-enough");
        admin.account_type = AccountType::Admin;
        assert!(matches!(authorize_signup(&admin, None), Err(AppError::Forbidden)));

        let mut manager = signup_request("long-enough");
        manager.account_type = AccountType::Manager;
        let tenant_actor = sample_user(AccountType::Tenant, "58");
        assert!(matches!(
            authorize_signup(&manager, Some(&tenant_actor)),
            Err(AppError::Forbidden)
        ));

        let mut pinned = signup_request("long-enough");
        pinned.accounting_id = "59".to_string();
        assert!(matches!(authorize_signup(&pinned, None), Err(AppError::Forbidden)));

        let mut landlord = signup_request("long-enough");
        landlord.account_type = AccountType::Landlord;
        assert!(authorize_signup(&landlord, None).is_ok());
        assert!(authorize_signup(&signup_request("long-enough"), None).is_ok());
    }

    #[test]
    fn staff_may_create_any_account() {
        let admin_actor = sample_user(AccountType::Admin, "");

        let mut manager = signup_request("long-enough");
        manager.account_type = AccountType::Manager;
        assert!(authorize_signup(&manager, Some(&admin_actor)).is_ok());

        let mut pinned = signup_request("long-enough");
        pinned.accounting_id = "59".to_string();
        assert!(authorize_signup(&pinned, Some(&admin_actor)).is_ok());
    }

    #[tokio::test]
    async fn tenant_links_to_customer_by_email_ignoring_case() {
        let provider = MockProvider::with_state(MockState {
            customers: vec![
                customer("1", "Someone Else", Some("other@example.com")),
                customer("58", "A. Lauterbach", Some("amy.lauterbach@EXAMPLE.com")),
            ],
            ..Default::default()
        });
        let user = sample_user(AccountType::Tenant, "");

        let linked = link_accounting_entity(&provider, "token", &user).await.unwrap();

        assert_eq!(linked.as_deref(), Some("58"));
        assert_eq!(provider.state.lock().unwrap().created_customers, 0);
    }

    #[tokio::test]
    async fn tenant_falls_back_to_display_name() {
        let provider = MockProvider::with_state(MockState {
            customers: vec![customer("7", "Amy Lauterbach", None)],
            ..Default::default()
        });
        let user = sample_user(AccountType::Tenant, "");

        let linked = link_accounting_entity(&provider, "token", &user).await.unwrap();

        assert_eq!(linked.as_deref(), Some("7"));
    }

    #[tokio::test]
    async fn display_name_match_ignores_case_and_padding() {
        let provider = MockProvider::with_state(MockState {
            customers: vec![customer("7", " amy LAUTERBACH ", None)],
            ..Default::default()
        });
        let user = sample_user(AccountType::Tenant, "");

        let linked = link_accounting_entity(&provider, "token", &user).await.unwrap();

        assert_eq!(linked.as_deref(), Some("7"));
        assert_eq!(provider.state.lock().unwrap().created_customers, 0);
    }

    #[tokio::test]
    async fn landlord_without_match_gets_new_vendor() {
        let provider = MockProvider::with_state(MockState {
            customers: vec![customer("58", "Amy Lauterbach", Some("amy.lauterbach@example.com"))],
            ..Default::default()
        });
        let user = sample_user(AccountType::Landlord, "");

        let linked = link_accounting_entity(&provider, "token", &user).await.unwrap();

        // Customers are never consulted for landlords.
        assert_eq!(linked.as_deref(), Some("v100"));
        let state = provider.state.lock().unwrap();
        assert_eq!(state.created_vendors, 1);
        assert_eq!(state.vendors[0].email(), Some(user.email.as_str()));
    }

    #[tokio::test]
    async fn staff_are_never_linked() {
        let provider = MockProvider::default();
        for account_type in [AccountType::Manager, AccountType::Admin] {
            let user = sample_user(account_type, "");
            let linked = link_accounting_entity(&provider, "token", &user).await.unwrap();
            assert!(linked.is_none());
        }
        let state = provider.state.lock().unwrap();
        assert_eq!(state.created_customers + state.created_vendors, 0);
    }

    #[tokio::test]
    async fn profile_push_uses_current_sync_token() {
        let provider = MockProvider::with_state(MockState {
            customers: vec![customer("58", "Amy Lauterbach", None)],
            ..Default::default()
        });
        let user = sample_user(AccountType::Tenant, "58");
        let updated = apply_update(
            &user,
            UpdateUserRequest {
                last_name: Some("Finch".to_string()),
                address: Some(Address {
                    line1: "12 Ocean Dr".to_string(),
                    city: "Half Moon Bay".to_string(),
                    postal_code: "94213".to_string(),
                    country_sub_division_code: "CA".to_string(),
                    country: None,
                }),
                ..Default::default()
            },
        );

        push_profile(&provider, "token", &updated).await.unwrap();

        let state = provider.state.lock().unwrap();
        let pushed = &state.updated_customers[0];
        assert_eq!(pushed.id.as_deref(), Some("58"));
        assert_eq!(pushed.sync_token.as_deref(), Some("1"));
        assert_eq!(pushed.display_name, "Amy Finch");
        assert_eq!(pushed.bill_addr.as_ref().unwrap().city, "Half Moon Bay");
    }

    #[tokio::test]
    async fn profile_push_for_unknown_entity_fails() {
        let provider = MockProvider::default();
        let user = sample_user(AccountType::Landlord, "99");

        let result = push_profile(&provider, "token", &user).await;

        assert!(matches!(result, Err(AppError::EntityNotFound)));
    }

    #[test]
    fn blank_names_are_ignored_on_update() {
        let user = sample_user(AccountType::Tenant, "");
        let updated = apply_update(
            &user,
            UpdateUserRequest {
                first_name: Some(" ".to_string()),
                phone_number: Some("555-0199".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(updated.first_name, "Amy");
        assert_eq!(updated.phone_number.as_deref(), Some("555-0199"));
    }
}
