//! Property data models, derived metrics, and API request/response types.
//!
//! This module defines:
//! - `Property`: Database entity representing a rental property
//! - Nested JSONB documents (address, features, financials, units)
//! - Derived metrics (occupancy, income, expenses, cap rate)
//! - Request/response bodies for the property endpoints
//!
//! # Money
//!
//! All amounts are stored as `i64` cents, the same as the rest of the
//! service, so rent rolls add up exactly.

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use uuid::Uuid;

/// Property classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(type_name = "text", rename_all = "kebab-case")]
pub enum PropertyType {
    SingleFamily,
    Duplex,
    Triplex,
    Quadplex,
    MultiFamily,
    Condo,
    Townhouse,
    ApartmentBuilding,
    Commercial,
}

impl PropertyType {
    /// Classification implied by the number of units.
    pub fn from_unit_count(units: usize) -> Self {
        match units {
            0 | 1 => PropertyType::SingleFamily,
            2 => PropertyType::Duplex,
            3 => PropertyType::Triplex,
            4 => PropertyType::Quadplex,
            _ => PropertyType::MultiFamily,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyAddress {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    #[serde(default)]
    pub country: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyFeatures {
    #[serde(default)]
    pub square_feet: u32,
    pub year_built: Option<u16>,
    #[serde(default)]
    pub has_parking: bool,
    #[serde(default, rename = "hasAC")]
    pub has_ac: bool,
    #[serde(default)]
    pub has_heating: bool,
    #[serde(default)]
    pub pets_allowed: bool,
    #[serde(default)]
    pub amenities: Vec<String>,
}

/// Yearly figures, in cents. `maintenance_reserve_cents` is monthly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyFinancials {
    pub purchase_price_cents: Option<i64>,
    pub current_value_cents: Option<i64>,
    pub property_taxes_cents: Option<i64>,
    pub insurance_cost_cents: Option<i64>,
    pub maintenance_reserve_cents: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyTenant {
    /// Accounting customer id of the tenant.
    pub tenant_id: String,
    pub lease_start_date: NaiveDate,
    pub lease_end_date: NaiveDate,
    pub rent_due_day: u8,
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LeaseType {
    MonthToMonth,
    #[default]
    Lease,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyUnit {
    pub unit_number: String,
    #[serde(default)]
    pub bedrooms: u32,
    #[serde(default)]
    pub bathrooms: f32,
    #[serde(default)]
    pub square_feet: u32,
    #[serde(default)]
    pub monthly_rent_cents: i64,
    #[serde(default)]
    pub security_deposit_cents: i64,
    #[serde(default)]
    pub lease_term_months: u32,
    #[serde(default)]
    pub lease_type: LeaseType,
    pub current_tenant: Option<PropertyTenant>,
    #[serde(default)]
    pub previous_tenants: Vec<PropertyTenant>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl PropertyUnit {
    pub fn is_occupied(&self) -> bool {
        self.current_tenant.as_ref().is_some_and(|t| t.is_active)
    }
}

fn default_true() -> bool {
    true
}

/// Partial update of a single unit.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitUpdate {
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<f32>,
    pub square_feet: Option<u32>,
    pub monthly_rent_cents: Option<i64>,
    pub security_deposit_cents: Option<i64>,
    pub lease_term_months: Option<u32>,
    pub lease_type: Option<LeaseType>,
    pub current_tenant: Option<PropertyTenant>,
    pub is_active: Option<bool>,
}

/// Represents a property record from the database.
///
/// # Database Table
///
/// Maps to the `properties` table. Each property belongs to exactly one
/// landlord, identified by the landlord's accounting (vendor) id.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Property {
    pub id: Uuid,
    pub landlord_id: String,
    pub address: Json<PropertyAddress>,
    pub features: Json<PropertyFeatures>,
    pub financials: Json<PropertyFinancials>,
    pub units: Json<Vec<PropertyUnit>>,
    pub property_type: PropertyType,
    pub images: Vec<String>,
    pub documents: Vec<String>,
    pub notes: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Largest amount accepted for a single rent, deposit or financial figure
/// ($10 billion).
pub const MAX_AMOUNT_CENTS: i64 = 1_000_000_000_000;

/// Sum of cent amounts, clamped at the `i64` bounds.
fn sum_cents(amounts: impl Iterator<Item = i64>) -> i64 {
    amounts.fold(0, i64::saturating_add)
}

impl Property {
    pub fn full_address(&self) -> String {
        let a = &self.address.0;
        format!("{}, {}, {} {}", a.street, a.city, a.state, a.zip_code)
    }

    pub fn total_units(&self) -> usize {
        self.units.0.len()
    }

    pub fn occupied_units(&self) -> usize {
        self.units.0.iter().filter(|u| u.is_occupied()).count()
    }

    pub fn vacant_units(&self) -> usize {
        self.total_units() - self.occupied_units()
    }

    /// Percentage of units with an active tenant; 0 with no units.
    pub fn occupancy_rate(&self) -> f64 {
        if self.total_units() == 0 {
            return 0.0;
        }
        self.occupied_units() as f64 / self.total_units() as f64 * 100.0
    }

    pub fn monthly_gross_income_cents(&self) -> i64 {
        sum_cents(self.units.0.iter().map(|u| u.monthly_rent_cents))
    }

    pub fn potential_monthly_income_cents(&self) -> i64 {
        sum_cents(
            self.units
                .0
                .iter()
                .filter(|u| u.is_active)
                .map(|u| u.monthly_rent_cents),
        )
    }

    pub fn annual_gross_income_cents(&self) -> i64 {
        self.monthly_gross_income_cents().saturating_mul(12)
    }

    /// Taxes and insurance spread over twelve months, plus the monthly reserve.
    pub fn estimated_monthly_expenses_cents(&self) -> i64 {
        let f = &self.financials.0;
        let yearly = f
            .property_taxes_cents
            .unwrap_or(0)
            .saturating_add(f.insurance_cost_cents.unwrap_or(0));
        ((yearly as f64 / 12.0).round() as i64).saturating_add(f.maintenance_reserve_cents.unwrap_or(0))
    }

    pub fn estimated_monthly_net_income_cents(&self) -> i64 {
        self.monthly_gross_income_cents()
            .saturating_sub(self.estimated_monthly_expenses_cents())
    }

    pub fn estimated_annual_net_income_cents(&self) -> i64 {
        self.estimated_monthly_net_income_cents().saturating_mul(12)
    }

    /// Annual net income over current value, as a percentage.
    pub fn cap_rate(&self) -> Option<f64> {
        match self.financials.0.current_value_cents {
            Some(value) if value != 0 => {
                Some(self.estimated_annual_net_income_cents() as f64 / value as f64 * 100.0)
            }
            _ => None,
        }
    }

    /// Occupied units whose lease ends within 30 days of `today`.
    pub fn units_with_expiring_leases(&self, today: NaiveDate) -> Vec<&PropertyUnit> {
        let horizon = today.checked_add_days(Days::new(30)).unwrap_or(today);
        self.units
            .0
            .iter()
            .filter(|u| {
                u.current_tenant
                    .as_ref()
                    .is_some_and(|t| t.is_active && t.lease_end_date <= horizon)
            })
            .collect()
    }

    pub fn unit(&self, unit_number: &str) -> Option<&PropertyUnit> {
        self.units.0.iter().find(|u| u.unit_number == unit_number)
    }

    /// Adds a unit and reclassifies the property by unit count.
    pub fn add_unit(&mut self, unit: PropertyUnit, now: DateTime<Utc>) {
        self.units.0.push(unit);
        self.property_type = PropertyType::from_unit_count(self.total_units());
        self.updated_at = now;
    }

    /// Returns false when no unit has this number.
    pub fn update_unit(&mut self, unit_number: &str, update: UnitUpdate, now: DateTime<Utc>) -> bool {
        let Some(unit) = self.units.0.iter_mut().find(|u| u.unit_number == unit_number) else {
            return false;
        };

        if let Some(v) = update.bedrooms {
            unit.bedrooms = v;
        }
        if let Some(v) = update.bathrooms {
            unit.bathrooms = v;
        }
        if let Some(v) = update.square_feet {
            unit.square_feet = v;
        }
        if let Some(v) = update.monthly_rent_cents {
            unit.monthly_rent_cents = v;
        }
        if let Some(v) = update.security_deposit_cents {
            unit.security_deposit_cents = v;
        }
        if let Some(v) = update.lease_term_months {
            unit.lease_term_months = v;
        }
        if let Some(v) = update.lease_type {
            unit.lease_type = v;
        }
        if let Some(tenant) = update.current_tenant {
            // The outgoing tenant moves to the history.
            if let Some(previous) = unit.current_tenant.replace(tenant) {
                unit.previous_tenants.push(PropertyTenant {
                    is_active: false,
                    ..previous
                });
            }
        }
        if let Some(v) = update.is_active {
            unit.is_active = v;
        }

        self.updated_at = now;
        true
    }

    /// Removes a unit and reclassifies. Returns false when nothing was removed.
    pub fn remove_unit(&mut self, unit_number: &str, now: DateTime<Utc>) -> bool {
        let before = self.units.0.len();
        self.units.0.retain(|u| u.unit_number != unit_number);
        if self.units.0.len() == before {
            return false;
        }
        self.property_type = PropertyType::from_unit_count(self.total_units());
        self.updated_at = now;
        true
    }
}

/// Request body for `POST /api/properties`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePropertyRequest {
    /// Defaults to the caller's own accounting id for landlords.
    pub landlord_id: Option<String>,
    pub address: PropertyAddress,
    #[serde(default)]
    pub features: PropertyFeatures,
    #[serde(default)]
    pub financials: PropertyFinancials,
    #[serde(default)]
    pub units: Vec<PropertyUnit>,
    pub property_type: Option<PropertyType>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub documents: Vec<String>,
    #[serde(default)]
    pub notes: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// Request body for `PUT /api/properties/{id}`. Only provided fields change.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePropertyRequest {
    pub address: Option<PropertyAddress>,
    pub features: Option<PropertyFeatures>,
    pub financials: Option<PropertyFinancials>,
    pub units: Option<Vec<PropertyUnit>>,
    pub property_type: Option<PropertyType>,
    pub images: Option<Vec<String>>,
    pub documents: Option<Vec<String>>,
    pub notes: Option<String>,
    pub is_active: Option<bool>,
}

/// Query string for paginated property listings.
#[derive(Debug, Deserialize)]
pub struct ListPropertiesQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    10
}

impl Default for ListPropertiesQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

impl Pagination {
    pub fn new(total: i64, page: i64, limit: i64) -> Self {
        let total_pages = if limit > 0 { (total + limit - 1) / limit } else { 0 };
        Self {
            total,
            page,
            limit,
            total_pages,
        }
    }
}

/// Computed figures shown alongside each property.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertySummary {
    pub full_address: String,
    pub total_units: usize,
    pub occupied_units: usize,
    pub vacant_units: usize,
    pub occupancy_rate: f64,
    pub monthly_gross_income_cents: i64,
    pub potential_monthly_income_cents: i64,
    pub annual_gross_income_cents: i64,
    pub estimated_monthly_expenses_cents: i64,
    pub estimated_monthly_net_income_cents: i64,
    pub estimated_annual_net_income_cents: i64,
    pub cap_rate: Option<f64>,
    pub expiring_leases: Vec<String>,
}

/// Response body for property endpoints.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyResponse {
    pub id: Uuid,
    pub landlord_id: String,
    pub address: PropertyAddress,
    pub features: PropertyFeatures,
    pub financials: PropertyFinancials,
    pub units: Vec<PropertyUnit>,
    pub property_type: PropertyType,
    pub images: Vec<String>,
    pub documents: Vec<String>,
    pub notes: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub summary: PropertySummary,
}

impl From<Property> for PropertyResponse {
    fn from(property: Property) -> Self {
        let summary = PropertySummary {
            full_address: property.full_address(),
            total_units: property.total_units(),
            occupied_units: property.occupied_units(),
            vacant_units: property.vacant_units(),
            occupancy_rate: property.occupancy_rate(),
            monthly_gross_income_cents: property.monthly_gross_income_cents(),
            potential_monthly_income_cents: property.potential_monthly_income_cents(),
            annual_gross_income_cents: property.annual_gross_income_cents(),
            estimated_monthly_expenses_cents: property.estimated_monthly_expenses_cents(),
            estimated_monthly_net_income_cents: property.estimated_monthly_net_income_cents(),
            estimated_annual_net_income_cents: property.estimated_annual_net_income_cents(),
            cap_rate: property.cap_rate(),
            expiring_leases: property
                .units_with_expiring_leases(Utc::now().date_naive())
                .into_iter()
                .map(|u| u.unit_number.clone())
                .collect(),
        };

        Self {
            id: property.id,
            landlord_id: property.landlord_id,
            address: property.address.0,
            features: property.features.0,
            financials: property.financials.0,
            units: property.units.0,
            property_type: property.property_type,
            images: property.images,
            documents: property.documents,
            notes: property.notes,
            is_active: property.is_active,
            created_at: property.created_at,
            updated_at: property.updated_at,
            summary,
        }
    }
}

/// Totals across several properties, for dashboards.
#[derive(Debug, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSummary {
    pub total_properties: usize,
    pub total_units: usize,
    pub occupied_units: usize,
    pub occupancy_rate: f64,
    pub monthly_gross_income_cents: i64,
    pub estimated_monthly_net_income_cents: i64,
    pub expiring_leases: usize,
}

impl PortfolioSummary {
    pub fn from_properties(properties: &[Property], today: NaiveDate) -> Self {
        let mut summary = Self {
            total_properties: properties.len(),
            ..Default::default()
        };
        for property in properties {
            summary.total_units += property.total_units();
            summary.occupied_units += property.occupied_units();
            summary.monthly_gross_income_cents = summary
                .monthly_gross_income_cents
                .saturating_add(property.monthly_gross_income_cents());
            summary.estimated_monthly_net_income_cents = summary
                .estimated_monthly_net_income_cents
                .saturating_add(property.estimated_monthly_net_income_cents());
            summary.expiring_leases += property.units_with_expiring_leases(today).len();
        }
        if summary.total_units > 0 {
            summary.occupancy_rate =
                summary.occupied_units as f64 / summary.total_units as f64 * 100.0;
        }
        summary
    }
}

#[derive(Debug, Serialize)]
pub struct PaginatedProperties {
    pub properties: Vec<PropertyResponse>,
    pub pagination: Pagination,
}

#[cfg(test)]
pub(crate) fn sample_unit(number: &str, rent_cents: i64, tenant_lease_end: Option<NaiveDate>) -> PropertyUnit {
    PropertyUnit {
        unit_number: number.to_string(),
        bedrooms: 2,
        bathrooms: 1.0,
        square_feet: 850,
        monthly_rent_cents: rent_cents,
        security_deposit_cents: rent_cents,
        lease_term_months: 12,
        lease_type: LeaseType::Lease,
        current_tenant: tenant_lease_end.map(|end| PropertyTenant {
            tenant_id: format!("tenant-{number}"),
            lease_start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            lease_end_date: end,
            rent_due_day: 1,
            is_active: true,
        }),
        previous_tenants: Vec::new(),
        is_active: true,
    }
}

#[cfg(test)]
pub(crate) fn sample_property(units: Vec<PropertyUnit>) -> Property {
    let now = Utc::now();
    Property {
        id: Uuid::new_v4(),
        landlord_id: "56".to_string(),
        address: Json(PropertyAddress {
            street: "4581 Finch St.".to_string(),
            city: "Bayshore".to_string(),
            state: "CA".to_string(),
            zip_code: "94326".to_string(),
            country: "US".to_string(),
        }),
        features: Json(PropertyFeatures::default()),
        financials: Json(PropertyFinancials::default()),
        property_type: PropertyType::from_unit_count(units.len()),
        units: Json(units),
        images: Vec::new(),
        documents: Vec::new(),
        notes: String::new(),
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn classifies_by_unit_count() {
        assert_eq!(PropertyType::from_unit_count(0), PropertyType::SingleFamily);
        assert_eq!(PropertyType::from_unit_count(1), PropertyType::SingleFamily);
        assert_eq!(PropertyType::from_unit_count(2), PropertyType::Duplex);
        assert_eq!(PropertyType::from_unit_count(3), PropertyType::Triplex);
        assert_eq!(PropertyType::from_unit_count(4), PropertyType::Quadplex);
        assert_eq!(PropertyType::from_unit_count(9), PropertyType::MultiFamily);
    }

    #[test]
    fn occupancy_and_income() {
        let mut vacant = sample_unit("B", 120_000, None);
        vacant.is_active = false;
        let property = sample_property(vec![
            sample_unit("A", 150_000, Some(date(2030, 1, 1))),
            vacant,
        ]);

        assert_eq!(property.total_units(), 2);
        assert_eq!(property.occupied_units(), 1);
        assert_eq!(property.vacant_units(), 1);
        assert_eq!(property.occupancy_rate(), 50.0);
        assert_eq!(property.monthly_gross_income_cents(), 270_000);
        assert_eq!(property.potential_monthly_income_cents(), 150_000);
        assert_eq!(property.annual_gross_income_cents(), 3_240_000);
    }

    #[test]
    fn empty_property_has_zero_occupancy() {
        let property = sample_property(Vec::new());
        assert_eq!(property.occupancy_rate(), 0.0);
        assert_eq!(property.full_address(), "4581 Finch St., Bayshore, CA 94326");
    }

    #[test]
    fn expenses_net_income_and_cap_rate() {
        let mut property = sample_property(vec![sample_unit("A", 200_000, None)]);
        property.financials = Json(PropertyFinancials {
            property_taxes_cents: Some(1_200_000),
            insurance_cost_cents: Some(600_000),
            maintenance_reserve_cents: Some(10_000),
            current_value_cents: Some(30_000_000),
            ..Default::default()
        });

        assert_eq!(property.estimated_monthly_expenses_cents(), 160_000);
        assert_eq!(property.estimated_monthly_net_income_cents(), 40_000);
        assert_eq!(property.estimated_annual_net_income_cents(), 480_000);
        let cap_rate = property.cap_rate().unwrap();
        assert!((cap_rate - 1.6).abs() < 1e-9);

        property.financials.0.current_value_cents = Some(0);
        assert_eq!(property.cap_rate(), None);
    }

    #[test]
    fn expiring_leases_within_thirty_days() {
        let today = date(2025, 6, 1);
        let property = sample_property(vec![
            sample_unit("soon", 100, Some(date(2025, 6, 20))),
            sample_unit("edge", 100, Some(date(2025, 7, 1))),
            sample_unit("later", 100, Some(date(2025, 9, 1))),
            sample_unit("empty", 100, None),
        ]);

        let expiring: Vec<_> = property
            .units_with_expiring_leases(today)
            .into_iter()
            .map(|u| u.unit_number.as_str())
            .collect();

        assert_eq!(expiring, vec!["soon", "edge"]);
    }

    #[test]
    fn unit_changes_reclassify_the_property() {
        let now = Utc::now();
        let mut property = sample_property(vec![sample_unit("1", 100, None)]);
        assert_eq!(property.property_type, PropertyType::SingleFamily);

        property.add_unit(sample_unit("2", 100, None), now);
        assert_eq!(property.property_type, PropertyType::Duplex);

        assert!(!property.remove_unit("9", now));
        assert!(property.remove_unit("1", now));
        assert_eq!(property.property_type, PropertyType::SingleFamily);
        assert!(property.unit("2").is_some());
    }

    #[test]
    fn replacing_a_tenant_archives_the_previous_one() {
        let now = Utc::now();
        let mut property = sample_property(vec![sample_unit("1", 100, Some(date(2025, 1, 1)))]);

        let updated = property.update_unit(
            "1",
            UnitUpdate {
                monthly_rent_cents: Some(125_000),
                current_tenant: Some(PropertyTenant {
                    tenant_id: "77".to_string(),
                    lease_start_date: date(2025, 1, 2),
                    lease_end_date: date(2026, 1, 1),
                    rent_due_day: 5,
                    is_active: true,
                }),
                ..Default::default()
            },
            now,
        );

        assert!(updated);
        let unit = property.unit("1").unwrap();
        assert_eq!(unit.monthly_rent_cents, 125_000);
        assert_eq!(unit.current_tenant.as_ref().unwrap().tenant_id, "77");
        assert_eq!(unit.previous_tenants.len(), 1);
        assert!(!unit.previous_tenants[0].is_active);
        assert!(!property.update_unit("missing", UnitUpdate::default(), now));
    }

    #[test]
    fn metrics_saturate_on_extreme_amounts() {
        let mut property = sample_property(vec![
            sample_unit("A", i64::MAX / 6, None),
            sample_unit("B", i64::MAX / 2, None),
        ]);
        property.financials = Json(PropertyFinancials {
            property_taxes_cents: Some(i64::MAX),
            insurance_cost_cents: Some(i64::MAX),
            current_value_cents: Some(1),
            ..Default::default()
        });

        assert_eq!(property.annual_gross_income_cents(), i64::MAX);
        assert!(property.estimated_monthly_expenses_cents() > 0);

        let response = PropertyResponse::from(property.clone());
        assert_eq!(response.summary.annual_gross_income_cents, i64::MAX);
        assert!(response.summary.cap_rate.is_some());

        let summary = PortfolioSummary::from_properties(
            &[property.clone(), property],
            date(2025, 1, 1),
        );
        assert_eq!(summary.monthly_gross_income_cents, i64::MAX);
    }

    #[test]
    fn portfolio_totals_span_properties() {
        let today = date(2025, 6, 1);
        let properties = vec![
            sample_property(vec![
                sample_unit("A", 100_000, Some(date(2025, 6, 15))),
                sample_unit("B", 100_000, None),
            ]),
            sample_property(vec![sample_unit("1", 200_000, Some(date(2027, 1, 1)))]),
        ];

        let summary = PortfolioSummary::from_properties(&properties, today);

        assert_eq!(summary.total_properties, 2);
        assert_eq!(summary.total_units, 3);
        assert_eq!(summary.occupied_units, 2);
        assert_eq!(summary.monthly_gross_income_cents, 400_000);
        assert_eq!(summary.expiring_leases, 1);
        assert!((summary.occupancy_rate - 200.0 / 3.0).abs() < 1e-9);

        assert_eq!(
            PortfolioSummary::from_properties(&[], today),
            PortfolioSummary::default()
        );
    }

    #[test]
    fn pagination_rounds_pages_up() {
        assert_eq!(Pagination::new(21, 1, 10).total_pages, 3);
        assert_eq!(Pagination::new(20, 1, 10).total_pages, 2);
        assert_eq!(Pagination::new(0, 1, 10).total_pages, 0);
    }

    #[test]
    fn create_request_defaults() {
        let request: CreatePropertyRequest = serde_json::from_value(serde_json::json!({
            "address": {"street": "1 Main", "city": "X", "state": "CA", "zipCode": "90000"},
            "features": {"squareFeet": 1200, "hasAC": true}
        }))
        .unwrap();

        assert!(request.is_active);
        assert!(request.units.is_empty());
        assert!(request.features.has_ac);
        assert!(request.landlord_id.is_none());
    }
}
