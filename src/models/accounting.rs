//! Accounting provider entities.
//!
//! These mirror the QuickBooks Online JSON shapes (PascalCase keys). They are
//! never stored locally; users only keep the remote id in `accounting_id`.

use serde::{Deserialize, Serialize};

use crate::models::user::{Address, User};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EmailAddress {
    #[serde(default)]
    pub address: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PhoneNumber {
    #[serde(default)]
    pub free_form_number: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PhysicalAddress {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub line1: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub country_sub_division_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl From<&Address> for PhysicalAddress {
    fn from(address: &Address) -> Self {
        Self {
            id: None,
            line1: address.line1.clone(),
            city: address.city.clone(),
            postal_code: address.postal_code.clone(),
            country_sub_division_code: address.country_sub_division_code.clone(),
            country: address.country.clone(),
        }
    }
}

/// Reference to another entity, e.g. an invoice's customer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// A customer record; tenants are mirrored as customers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Customer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync_token: Option<String>,
    #[serde(default)]
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fully_qualified_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_email_addr: Option<EmailAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_phone: Option<PhoneNumber>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bill_addr: Option<PhysicalAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(rename = "sparse", skip_serializing_if = "Option::is_none")]
    pub sparse: Option<bool>,
}

impl Customer {
    /// Creation payload for a tenant.
    pub fn from_user(user: &User) -> Self {
        let name = user.full_name();
        Self {
            display_name: name.clone(),
            fully_qualified_name: Some(name),
            given_name: Some(user.first_name.clone()),
            family_name: Some(user.last_name.clone()),
            company_name: user.company_name.clone(),
            primary_email_addr: Some(EmailAddress {
                address: user.email.clone(),
            }),
            primary_phone: user.phone_number.clone().map(|free_form_number| PhoneNumber {
                free_form_number,
            }),
            bill_addr: user.address.as_ref().map(|a| PhysicalAddress::from(&a.0)),
            ..Default::default()
        }
    }

    pub fn email(&self) -> Option<&str> {
        self.primary_email_addr.as_ref().map(|e| e.address.as_str())
    }
}

/// A vendor record; landlords are mirrored as vendors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Vendor {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync_token: Option<String>,
    #[serde(default)]
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub print_on_check_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acct_num: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_email_addr: Option<EmailAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_phone: Option<PhoneNumber>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bill_addr: Option<PhysicalAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(rename = "sparse", skip_serializing_if = "Option::is_none")]
    pub sparse: Option<bool>,
}

impl Vendor {
    /// Creation payload for a landlord. Companies display under their
    /// company name, individuals under their full name.
    pub fn from_user(user: &User) -> Self {
        let display_name = user
            .company_name
            .clone()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| user.full_name());
        Self {
            display_name: display_name.clone(),
            given_name: Some(user.first_name.clone()),
            family_name: Some(user.last_name.clone()),
            company_name: user.company_name.clone(),
            print_on_check_name: Some(display_name),
            primary_email_addr: Some(EmailAddress {
                address: user.email.clone(),
            }),
            primary_phone: user.phone_number.clone().map(|free_form_number| PhoneNumber {
                free_form_number,
            }),
            bill_addr: user.address.as_ref().map(|a| PhysicalAddress::from(&a.0)),
            ..Default::default()
        }
    }

    pub fn email(&self) -> Option<&str> {
        self.primary_email_addr.as_ref().map(|e| e.address.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InvoiceLine {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub detail_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InvoiceStatus {
    Paid,
    Due,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Invoice {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub txn_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default)]
    pub balance: f64,
    #[serde(default)]
    pub total_amt: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bill_email: Option<EmailAddress>,
    pub customer_ref: Reference,
    #[serde(default)]
    pub line: Vec<InvoiceLine>,
}

impl Invoice {
    pub fn status(&self) -> InvoiceStatus {
        if self.balance <= 0.0 {
            InvoiceStatus::Paid
        } else {
            InvoiceStatus::Due
        }
    }

    pub fn belongs_to(&self, customer_id: &str) -> bool {
        self.customer_ref.value == customer_id
    }
}

/// `{"QueryResponse": {...}, "time": ...}` envelope returned by query calls.
#[derive(Debug, Deserialize)]
pub struct QueryEnvelope {
    #[serde(rename = "QueryResponse", default)]
    pub query_response: QueryResponse,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct QueryResponse {
    #[serde(default)]
    pub customer: Vec<Customer>,
    #[serde(default)]
    pub vendor: Vec<Vendor>,
    #[serde(default)]
    pub invoice: Vec<Invoice>,
}

/// `{"Customer": {...}}` envelope returned by customer writes.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CustomerEnvelope {
    pub customer: Customer,
}

/// `{"Vendor": {...}}` envelope returned by vendor writes.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VendorEnvelope {
    pub vendor: Vendor,
}

/// Invoice with its derived payment status, as served to dashboards.
#[derive(Debug, Serialize)]
pub struct InvoiceView {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub status: InvoiceStatus,
}

impl From<Invoice> for InvoiceView {
    fn from(invoice: Invoice) -> Self {
        let status = invoice.status();
        Self { invoice, status }
    }
}
