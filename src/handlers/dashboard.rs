//! Dashboard view models.
//!
//! Every route here sits behind the access middleware, so the handler always
//! has a `SessionUser` and a live `ProviderToken`, and tenants and landlords
//! only ever reach their own subtree (plus shared invoice pages).

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use chrono::Utc;
use serde::Serialize;

use crate::{
    error::AppError,
    handlers::quickbooks::{filter_invoices, find_visible_invoice},
    middleware::access::ProviderToken,
    models::{
        accounting::{Customer, InvoiceStatus, InvoiceView, Vendor},
        property::{ListPropertiesQuery, PaginatedProperties, PortfolioSummary, PropertyResponse},
        session::SessionUser,
        user::{AccountType, User},
    },
    services::property_service,
    state::AppState,
};

/// Who is looking at the dashboard.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewer {
    pub name: String,
    pub initials: String,
    pub email: String,
    pub account_type: AccountType,
}

impl From<&User> for Viewer {
    fn from(user: &User) -> Self {
        Self {
            name: user.full_name(),
            initials: user.initials(),
            email: user.email.clone(),
            account_type: user.account_type,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffOverview {
    pub viewer: Viewer,
    pub portfolio: PortfolioSummary,
    pub tenant_count: usize,
    pub landlord_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantDirectory {
    pub viewer: Viewer,
    pub tenants: Vec<Customer>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LandlordDirectory {
    pub viewer: Viewer,
    pub landlords: Vec<Vendor>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantDashboard {
    pub viewer: Viewer,
    pub customer: Customer,
    pub invoices: Vec<InvoiceView>,
    pub open_invoices: usize,
    pub balance_due: f64,
    pub homes: Vec<PropertyResponse>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LandlordDashboard {
    pub viewer: Viewer,
    pub vendor: Vendor,
    pub portfolio: PortfolioSummary,
    pub properties: Vec<PropertyResponse>,
}

fn open_balance(invoices: &[InvoiceView]) -> (usize, f64) {
    invoices
        .iter()
        .filter(|v| v.status == InvoiceStatus::Due)
        .fold((0, 0.0), |(count, total), v| (count + 1, total + v.invoice.balance))
}

/// `GET /dashboard`: portfolio overview for managers and admins.
///
/// Tenants and landlords never reach it; the access chain redirects them.
pub async fn overview(
    State(state): State<AppState>,
    Extension(session): Extension<SessionUser>,
    Extension(ProviderToken(access_token)): Extension<ProviderToken>,
) -> Result<Json<StaffOverview>, AppError> {
    let properties = property_service::list_all(&state.pool).await?;
    let tenant_count = state.accounting.list_customers(&access_token).await?.len();
    let landlord_count = state.accounting.list_vendors(&access_token).await?.len();

    Ok(Json(StaffOverview {
        viewer: Viewer::from(&session.user),
        portfolio: PortfolioSummary::from_properties(&properties, Utc::now().date_naive()),
        tenant_count,
        landlord_count,
    }))
}

/// `GET /dashboard/tenant`: every accounting customer.
pub async fn tenants(
    State(state): State<AppState>,
    Extension(session): Extension<SessionUser>,
    Extension(ProviderToken(access_token)): Extension<ProviderToken>,
) -> Result<Json<TenantDirectory>, AppError> {
    let tenants = state.accounting.list_customers(&access_token).await?;
    Ok(Json(TenantDirectory {
        viewer: Viewer::from(&session.user),
        tenants,
    }))
}

/// `GET /dashboard/tenant/{id}`: one tenant's invoices, balance and home.
pub async fn tenant(
    State(state): State<AppState>,
    Extension(session): Extension<SessionUser>,
    Extension(ProviderToken(access_token)): Extension<ProviderToken>,
    Path(customer_id): Path<String>,
) -> Result<Json<TenantDashboard>, AppError> {
    let customer = state
        .accounting
        .list_customers(&access_token)
        .await?
        .into_iter()
        .find(|c| c.id.as_deref() == Some(customer_id.as_str()))
        .ok_or(AppError::EntityNotFound)?;

    let invoices = filter_invoices(
        state.accounting.list_invoices(&access_token).await?,
        Some(&customer_id),
    );
    let (open_invoices, balance_due) = open_balance(&invoices);

    let homes = property_service::list_for_tenant(&state.pool, &customer_id).await?;

    Ok(Json(TenantDashboard {
        viewer: Viewer::from(&session.user),
        customer,
        invoices,
        open_invoices,
        balance_due,
        homes: homes.into_iter().map(Into::into).collect(),
    }))
}

/// `GET /dashboard/landlord`: every accounting vendor.
pub async fn landlords(
    State(state): State<AppState>,
    Extension(session): Extension<SessionUser>,
    Extension(ProviderToken(access_token)): Extension<ProviderToken>,
) -> Result<Json<LandlordDirectory>, AppError> {
    let landlords = state.accounting.list_vendors(&access_token).await?;
    Ok(Json(LandlordDirectory {
        viewer: Viewer::from(&session.user),
        landlords,
    }))
}

/// `GET /dashboard/landlord/{id}`: one landlord's portfolio.
pub async fn landlord(
    State(state): State<AppState>,
    Extension(session): Extension<SessionUser>,
    Extension(ProviderToken(access_token)): Extension<ProviderToken>,
    Path(vendor_id): Path<String>,
) -> Result<Json<LandlordDashboard>, AppError> {
    let vendor = state
        .accounting
        .list_vendors(&access_token)
        .await?
        .into_iter()
        .find(|v| v.id.as_deref() == Some(vendor_id.as_str()))
        .ok_or(AppError::EntityNotFound)?;

    let properties = property_service::list_by_landlord(&state.pool, &vendor_id).await?;
    let portfolio = PortfolioSummary::from_properties(&properties, Utc::now().date_naive());

    Ok(Json(LandlordDashboard {
        viewer: Viewer::from(&session.user),
        vendor,
        portfolio,
        properties: properties.into_iter().map(Into::into).collect(),
    }))
}

/// `GET /dashboard/landlord/{id}/properties`
pub async fn landlord_properties(
    State(state): State<AppState>,
    Path(vendor_id): Path<String>,
) -> Result<Json<Vec<PropertyResponse>>, AppError> {
    let properties = property_service::list_by_landlord(&state.pool, &vendor_id).await?;
    Ok(Json(properties.into_iter().map(Into::into).collect()))
}

/// `GET /dashboard/properties`: paginated list for staff.
pub async fn properties(
    State(state): State<AppState>,
    Query(query): Query<ListPropertiesQuery>,
) -> Result<Json<PaginatedProperties>, AppError> {
    Ok(Json(property_service::list_properties(&state.pool, &query).await?))
}

/// `GET /dashboard/invoices/{id}`: tenants only see their own invoices.
pub async fn invoice(
    State(state): State<AppState>,
    Extension(session): Extension<SessionUser>,
    Extension(ProviderToken(access_token)): Extension<ProviderToken>,
    Path(invoice_id): Path<String>,
) -> Result<Json<InvoiceView>, AppError> {
    let invoices = state.accounting.list_invoices(&access_token).await?;
    Ok(Json(find_visible_invoice(invoices, &session.user, &invoice_id)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::accounting::{Invoice, Reference};

    #[test]
    fn open_balance_counts_only_due_invoices() {
        let views: Vec<InvoiceView> = [(0.0, "1"), (25.5, "2"), (10.0, "3")]
            .into_iter()
            .map(|(balance, id)| {
                InvoiceView::from(Invoice {
                    id: id.to_string(),
                    balance,
                    customer_ref: Reference {
                        value: "58".to_string(),
                        name: None,
                    },
                    ..Default::default()
                })
            })
            .collect();

        let (count, total) = open_balance(&views);
        assert_eq!(count, 2);
        assert!((total - 35.5).abs() < 1e-9);
    }
}
