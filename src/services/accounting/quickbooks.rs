//! QuickBooks Online client.
//!
//! Talks to the Intuit OAuth2 endpoints and the v3 accounting API over
//! reqwest. Every call takes the access token explicitly; deciding when to
//! refresh is the access chain's job, not the client's.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Serialize, de::DeserializeOwned};
use url::Url;

use crate::{
    config::Config,
    error::AccountingError,
    models::{
        accounting::{
            Customer, CustomerEnvelope, Invoice, QueryEnvelope, QueryResponse, Vendor,
            VendorEnvelope,
        },
        token::TokenGrant,
    },
};

use super::AccountingProvider;

const AUTHORIZE_ENDPOINT: &str = "https://appcenter.intuit.com/connect/oauth2";
const TOKEN_ENDPOINT: &str = "https://oauth.platform.intuit.com/oauth2/v1/tokens/bearer";
const ACCOUNTING_SCOPE: &str = "com.intuit.quickbooks.accounting";
const MINOR_VERSION: &str = "75";
/// Upper bound the API accepts for a single query page.
const MAX_RESULTS: u32 = 1000;

pub struct QuickBooksClient {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    realm_id: String,
    redirect_uri: String,
    api_base: String,
    authorize_endpoint: Url,
}

impl QuickBooksClient {
    pub fn new(config: &Config) -> Result<Self, AccountingError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()?;

        let authorize_endpoint = Url::parse(AUTHORIZE_ENDPOINT)
            .map_err(|e| AccountingError::Decode(format!("authorize endpoint: {e}")))?;

        Ok(Self {
            http,
            client_id: config.quickbooks_client_id.clone(),
            client_secret: config.quickbooks_client_secret.clone(),
            realm_id: config.quickbooks_realm_id.clone(),
            redirect_uri: config.oauth_redirect_uri(),
            api_base: config.quickbooks_environment.api_base_url().to_string(),
            authorize_endpoint,
        })
    }

    fn company_url(&self, resource: &str) -> String {
        format!("{}/v3/company/{}/{}", self.api_base, self.realm_id, resource)
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<TokenGrant, AccountingError> {
        let res = self
            .http
            .post(TOKEN_ENDPOINT)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .header(reqwest::header::ACCEPT, "application/json")
            .form(form)
            .send()
            .await?;

        let status = res.status();
        // invalid_grant comes back as 400; both mean the pair is unusable.
        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED {
            let body = res.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), body = %body, "token endpoint rejected grant");
            return Err(AccountingError::Unauthorized);
        }

        read_json(res).await
    }

    async fn query(&self, access_token: &str, entity: &str) -> Result<QueryResponse, AccountingError> {
        let res = self
            .http
            .get(self.company_url("query"))
            .bearer_auth(access_token)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(&query_params(entity))
            .send()
            .await?;

        let envelope: QueryEnvelope = read_json(res).await?;
        Ok(envelope.query_response)
    }

    async fn write<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        access_token: &str,
        resource: &str,
        body: &B,
    ) -> Result<T, AccountingError> {
        let res = self
            .http
            .post(self.company_url(resource))
            .bearer_auth(access_token)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(&[("minorversion", MINOR_VERSION)])
            .json(body)
            .send()
            .await?;

        read_json(res).await
    }
}

fn query_params(entity: &str) -> [(&'static str, String); 2] {
    [
        ("query", format!("select * from {entity} MAXRESULTS {MAX_RESULTS}")),
        ("minorversion", MINOR_VERSION.to_string()),
    ]
}

/// Maps a non-success status to the matching error.
fn status_error(status: StatusCode, body: String) -> AccountingError {
    if status == StatusCode::UNAUTHORIZED {
        return AccountingError::Unauthorized;
    }
    AccountingError::Rejected {
        status: status.as_u16(),
        body,
    }
}

async fn read_json<T: DeserializeOwned>(res: reqwest::Response) -> Result<T, AccountingError> {
    let status = res.status();
    if !status.is_success() {
        let body = res.text().await.unwrap_or_default();
        tracing::warn!(status = status.as_u16(), body = %body, "accounting API call failed");
        return Err(status_error(status, body));
    }

    res.json::<T>()
        .await
        .map_err(|e| AccountingError::Decode(e.to_string()))
}

/// Sparse updates must name the entity and its current sync token.
fn require_sync_token(id: Option<&String>, sync_token: Option<&String>) -> Result<(), AccountingError> {
    match (id, sync_token) {
        (Some(_), Some(_)) => Ok(()),
        _ => Err(AccountingError::Decode(
            "sparse update needs Id and SyncToken".to_string(),
        )),
    }
}

#[async_trait]
impl AccountingProvider for QuickBooksClient {
    fn realm_id(&self) -> &str {
        &self.realm_id
    }

    fn authorize_url(&self, state: &str) -> String {
        let mut url = self.authorize_endpoint.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("response_type", "code")
            .append_pair("scope", ACCOUNTING_SCOPE)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("state", state);
        url.into()
    }

    #[tracing::instrument(skip_all)]
    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, AccountingError> {
        let grant = self
            .token_request(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", &self.redirect_uri),
            ])
            .await?;
        tracing::info!("authorization code exchanged");
        Ok(grant)
    }

    #[tracing::instrument(skip_all)]
    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, AccountingError> {
        let grant = self
            .token_request(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .await?;
        tracing::info!("access token refreshed");
        Ok(grant)
    }

    async fn list_customers(&self, access_token: &str) -> Result<Vec<Customer>, AccountingError> {
        Ok(self.query(access_token, "Customer").await?.customer)
    }

    async fn create_customer(
        &self,
        access_token: &str,
        customer: &Customer,
    ) -> Result<Customer, AccountingError> {
        let envelope: CustomerEnvelope = self.write(access_token, "customer", customer).await?;
        Ok(envelope.customer)
    }

    async fn update_customer(
        &self,
        access_token: &str,
        customer: &Customer,
    ) -> Result<Customer, AccountingError> {
        require_sync_token(customer.id.as_ref(), customer.sync_token.as_ref())?;
        let body = Customer {
            sparse: Some(true),
            ..customer.clone()
        };
        let envelope: CustomerEnvelope = self.write(access_token, "customer", &body).await?;
        Ok(envelope.customer)
    }

    async fn list_vendors(&self, access_token: &str) -> Result<Vec<Vendor>, AccountingError> {
        Ok(self.query(access_token, "Vendor").await?.vendor)
    }

    async fn create_vendor(
        &self,
        access_token: &str,
        vendor: &Vendor,
    ) -> Result<Vendor, AccountingError> {
        let envelope: VendorEnvelope = self.write(access_token, "vendor", vendor).await?;
        Ok(envelope.vendor)
    }

    async fn update_vendor(
        &self,
        access_token: &str,
        vendor: &Vendor,
    ) -> Result<Vendor, AccountingError> {
        require_sync_token(vendor.id.as_ref(), vendor.sync_token.as_ref())?;
        let body = Vendor {
            sparse: Some(true),
            ..vendor.clone()
        };
        let envelope: VendorEnvelope = self.write(access_token, "vendor", &body).await?;
        Ok(envelope.vendor)
    }

    async fn list_invoices(&self, access_token: &str) -> Result<Vec<Invoice>, AccountingError> {
        Ok(self.query(access_token, "Invoice").await?.invoice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> QuickBooksClient {
        QuickBooksClient::new(&Config::for_tests()).unwrap()
    }

    #[test]
    fn authorize_url_carries_client_scope_and_state() {
        let url = Url::parse(&client().authorize_url("nonce.sig")).unwrap();
        let pairs: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();

        assert_eq!(url.host_str(), Some("appcenter.intuit.com"));
        assert_eq!(pairs["client_id"], "client-id");
        assert_eq!(pairs["response_type"], "code");
        assert_eq!(pairs["scope"], ACCOUNTING_SCOPE);
        assert_eq!(pairs["state"], "nonce.sig");
        assert_eq!(
            pairs["redirect_uri"],
            "http://localhost:3000/api/quickbooks/callback"
        );
    }

    #[test]
    fn company_urls_target_configured_realm_and_host() {
        assert_eq!(
            client().company_url("query"),
            "https://sandbox-quickbooks.api.intuit.com/v3/company/4620816365/query"
        );
    }

    #[test]
    fn query_selects_entity_with_minor_version() {
        let params = query_params("Vendor");
        assert_eq!(params[0].1, "select * from Vendor MAXRESULTS 1000");
        assert_eq!(params[1], ("minorversion", "75".to_string()));
    }

    #[test]
    fn status_mapping() {
        assert!(matches!(
            status_error(StatusCode::UNAUTHORIZED, String::new()),
            AccountingError::Unauthorized
        ));
        assert!(matches!(
            status_error(StatusCode::BAD_REQUEST, "Stale object".to_string()),
            AccountingError::Rejected { status: 400, .. }
        ));
    }

    #[test]
    fn sparse_update_requires_sync_token() {
        let customer = Customer {
            id: Some("58".to_string()),
            ..Default::default()
        };
        assert!(require_sync_token(customer.id.as_ref(), customer.sync_token.as_ref()).is_err());

        let customer = Customer {
            sync_token: Some("3".to_string()),
            ..customer
        };
        assert!(require_sync_token(customer.id.as_ref(), customer.sync_token.as_ref()).is_ok());
    }
}
