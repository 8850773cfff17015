//! Accounting provider boundary.
//!
//! Everything the service needs from the external accounting system sits
//! behind [`AccountingProvider`], so the access chain and handlers can be
//! exercised against an in-memory implementation.

pub mod quickbooks;

use async_trait::async_trait;

use crate::{
    error::AccountingError,
    models::{
        accounting::{Customer, Invoice, Vendor},
        token::TokenGrant,
    },
};

pub use quickbooks::QuickBooksClient;

#[async_trait]
pub trait AccountingProvider: Send + Sync {
    /// Company (realm) the provider is configured for.
    fn realm_id(&self) -> &str;

    /// URL the browser is sent to for the consent screen.
    fn authorize_url(&self, state: &str) -> String;

    /// Exchange an authorization code for a token pair.
    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, AccountingError>;

    /// Trade a refresh token for a new token pair.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, AccountingError>;

    async fn list_customers(&self, access_token: &str) -> Result<Vec<Customer>, AccountingError>;

    async fn create_customer(
        &self,
        access_token: &str,
        customer: &Customer,
    ) -> Result<Customer, AccountingError>;

    /// Sparse update; `customer` must carry `id` and `sync_token`.
    async fn update_customer(
        &self,
        access_token: &str,
        customer: &Customer,
    ) -> Result<Customer, AccountingError>;

    async fn list_vendors(&self, access_token: &str) -> Result<Vec<Vendor>, AccountingError>;

    async fn create_vendor(
        &self,
        access_token: &str,
        vendor: &Vendor,
    ) -> Result<Vendor, AccountingError>;

    /// Sparse update; `vendor` must carry `id` and `sync_token`.
    async fn update_vendor(
        &self,
        access_token: &str,
        vendor: &Vendor,
    ) -> Result<Vendor, AccountingError>;

    async fn list_invoices(&self, access_token: &str) -> Result<Vec<Invoice>, AccountingError>;
}

/// In-memory provider used by service, middleware and router tests.
#[cfg(test)]
pub(crate) mod mock {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    pub struct MockState {
        pub customers: Vec<Customer>,
        pub vendors: Vec<Vendor>,
        pub invoices: Vec<Invoice>,
        pub refresh_calls: Vec<String>,
        pub created_customers: usize,
        pub created_vendors: usize,
        pub updated_customers: Vec<Customer>,
        pub updated_vendors: Vec<Vendor>,
        pub fail_refresh: bool,
        pub reject_access_token: Option<String>,
    }

    #[derive(Default)]
    pub struct MockProvider {
        pub state: Mutex<MockState>,
    }

    impl MockProvider {
        pub fn with_state(state: MockState) -> Self {
            Self {
                state: Mutex::new(state),
            }
        }

        fn check(&self, access_token: &str) -> Result<(), AccountingError> {
            let state = self.state.lock().unwrap();
            match &state.reject_access_token {
                Some(rejected) if rejected == access_token => Err(AccountingError::Unauthorized),
                _ => Ok(()),
            }
        }
    }

    fn grant(suffix: &str) -> TokenGrant {
        TokenGrant {
            access_token: format!("access-{suffix}"),
            refresh_token: format!("refresh-{suffix}"),
            token_type: "bearer".to_string(),
            expires_in: 3600,
            x_refresh_token_expires_in: 8_726_400,
        }
    }

    #[async_trait]
    impl AccountingProvider for MockProvider {
        fn realm_id(&self) -> &str {
            "4620816365"
        }

        fn authorize_url(&self, state: &str) -> String {
            format!("https://provider.test/authorize?state={state}")
        }

        async fn exchange_code(&self, code: &str) -> Result<TokenGrant, AccountingError> {
            if code == "bad" {
                return Err(AccountingError::Unauthorized);
            }
            Ok(grant("exchanged"))
        }

        async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, AccountingError> {
            let mut state = self.state.lock().unwrap();
            state.refresh_calls.push(refresh_token.to_string());
            if state.fail_refresh {
                return Err(AccountingError::Unauthorized);
            }
            Ok(grant("refreshed"))
        }

        async fn list_customers(&self, access_token: &str) -> Result<Vec<Customer>, AccountingError> {
            self.check(access_token)?;
            Ok(self.state.lock().unwrap().customers.clone())
        }

        async fn create_customer(
            &self,
            access_token: &str,
            customer: &Customer,
        ) -> Result<Customer, AccountingError> {
            self.check(access_token)?;
            let mut state = self.state.lock().unwrap();
            state.created_customers += 1;
            let created = Customer {
                id: Some(format!("c{}", 100 + state.customers.len())),
                sync_token: Some("0".to_string()),
                ..customer.clone()
            };
            state.customers.push(created.clone());
            Ok(created)
        }

        async fn update_customer(
            &self,
            access_token: &str,
            customer: &Customer,
        ) -> Result<Customer, AccountingError> {
            self.check(access_token)?;
            let mut state = self.state.lock().unwrap();
            state.updated_customers.push(customer.clone());
            Ok(customer.clone())
        }

        async fn list_vendors(&self, access_token: &str) -> Result<Vec<Vendor>, AccountingError> {
            self.check(access_token)?;
            Ok(self.state.lock().unwrap().vendors.clone())
        }

        async fn create_vendor(
            &self,
            access_token: &str,
            vendor: &Vendor,
        ) -> Result<Vendor, AccountingError> {
            self.check(access_token)?;
            let mut state = self.state.lock().unwrap();
            state.created_vendors += 1;
            let created = Vendor {
                id: Some(format!("v{}", 100 + state.vendors.len())),
                sync_token: Some("0".to_string()),
                ..vendor.clone()
            };
            state.vendors.push(created.clone());
            Ok(created)
        }

        async fn update_vendor(
            &self,
            access_token: &str,
            vendor: &Vendor,
        ) -> Result<Vendor, AccountingError> {
            self.check(access_token)?;
            let mut state = self.state.lock().unwrap();
            state.updated_vendors.push(vendor.clone());
            Ok(vendor.clone())
        }

        async fn list_invoices(&self, access_token: &str) -> Result<Vec<Invoice>, AccountingError> {
            self.check(access_token)?;
            Ok(self.state.lock().unwrap().invoices.clone())
        }
    }
}
