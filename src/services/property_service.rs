//! Property service - CRUD, ownership checks and unit management.
//!
//! # Ownership
//!
//! A property belongs to exactly one landlord, identified by the landlord's
//! accounting (vendor) id. Landlords may only create and modify their own
//! properties, managers and admins may modify any, tenants none.

use std::collections::HashSet;

use chrono::Utc;
use sqlx::types::Json;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        property::{
            CreatePropertyRequest, ListPropertiesQuery, MAX_AMOUNT_CENTS, PaginatedProperties,
            Pagination, Property, PropertyFinancials, PropertyType, PropertyUnit, UnitUpdate,
            UpdatePropertyRequest,
        },
        user::{AccountType, User},
    },
};

const PROPERTY_COLUMNS: &str = "id, landlord_id, address, features, financials, units, \
     property_type, images, documents, notes, is_active, created_at, updated_at";

pub const MAX_PAGE_LIMIT: i64 = 100;

/// Landlord id a new property will be filed under for this actor.
fn owner_for_new_property(actor: &User, requested: Option<&str>) -> Result<String, AppError> {
    let requested = requested.map(str::trim).filter(|id| !id.is_empty());
    match actor.account_type {
        AccountType::Tenant => Err(AppError::Forbidden),
        AccountType::Landlord => {
            if !actor.is_linked() {
                return Err(AppError::InvalidRequest(
                    "landlord account is not linked to the accounting provider yet".to_string(),
                ));
            }
            match requested {
                Some(id) if id != actor.accounting_id => Err(AppError::Forbidden),
                _ => Ok(actor.accounting_id.clone()),
            }
        }
        AccountType::Manager | AccountType::Admin => requested
            .map(str::to_string)
            .ok_or_else(|| AppError::InvalidRequest("landlordId is required".to_string())),
    }
}

/// Whether `actor` may modify `property`.
pub fn ensure_can_manage(actor: &User, property: &Property) -> Result<(), AppError> {
    match actor.account_type {
        AccountType::Manager | AccountType::Admin => Ok(()),
        AccountType::Landlord if actor.is_linked() && actor.accounting_id == property.landlord_id => {
            Ok(())
        }
        _ => Err(AppError::Forbidden),
    }
}

fn validate_units(units: &[PropertyUnit]) -> Result<(), AppError> {
    let mut seen = HashSet::new();
    for unit in units {
        if unit.unit_number.trim().is_empty() {
            return Err(AppError::InvalidRequest("unitNumber is required".to_string()));
        }
        if !seen.insert(unit.unit_number.as_str()) {
            return Err(AppError::InvalidRequest(format!(
                "duplicate unit number {}",
                unit.unit_number
            )));
        }
        validate_amount("monthlyRentCents", unit.monthly_rent_cents)?;
        validate_amount("securityDepositCents", unit.security_deposit_cents)?;
    }
    Ok(())
}

fn validate_amount(field: &str, cents: i64) -> Result<(), AppError> {
    if !(0..=MAX_AMOUNT_CENTS).contains(&cents) {
        return Err(AppError::InvalidRequest(format!(
            "{field} must be between 0 and {MAX_AMOUNT_CENTS}"
        )));
    }
    Ok(())
}

fn validate_financials(financials: &PropertyFinancials) -> Result<(), AppError> {
    [
        ("purchasePriceCents", financials.purchase_price_cents),
        ("currentValueCents", financials.current_value_cents),
        ("propertyTaxesCents", financials.property_taxes_cents),
        ("insuranceCostCents", financials.insurance_cost_cents),
        ("maintenanceReserveCents", financials.maintenance_reserve_cents),
    ]
    .into_iter()
    .filter_map(|(field, cents)| cents.map(|c| (field, c)))
    .try_for_each(|(field, cents)| validate_amount(field, cents))
}

/// Row offset of the requested page, after checking its bounds.
fn page_offset(query: &ListPropertiesQuery) -> Result<i64, AppError> {
    if query.page < 1 {
        return Err(AppError::InvalidRequest("page must be at least 1".to_string()));
    }
    if !(1..=MAX_PAGE_LIMIT).contains(&query.limit) {
        return Err(AppError::InvalidRequest(format!(
            "limit must be between 1 and {MAX_PAGE_LIMIT}"
        )));
    }
    (query.page - 1)
        .checked_mul(query.limit)
        .ok_or_else(|| AppError::InvalidRequest("page is out of range".to_string()))
}

/// Create a property.
///
/// The property type is derived from the unit count unless given.
pub async fn create_property(
    pool: &DbPool,
    actor: &User,
    request: CreatePropertyRequest,
) -> Result<Property, AppError> {
    let landlord_id = owner_for_new_property(actor, request.landlord_id.as_deref())?;

    let address = &request.address;
    if address.street.trim().is_empty() || address.city.trim().is_empty() {
        return Err(AppError::InvalidRequest(
            "address street and city are required".to_string(),
        ));
    }
    validate_units(&request.units)?;
    validate_financials(&request.financials)?;

    let property_type = request
        .property_type
        .unwrap_or_else(|| PropertyType::from_unit_count(request.units.len()));

    let property = sqlx::query_as::<_, Property>(&format!(
        r#"
        INSERT INTO properties (
            landlord_id, address, features, financials, units, property_type,
            images, documents, notes, is_active
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING {PROPERTY_COLUMNS}
        "#
    ))
    .bind(&landlord_id)
    .bind(Json(request.address))
    .bind(Json(request.features))
    .bind(Json(request.financials))
    .bind(Json(request.units))
    .bind(property_type)
    .bind(request.images)
    .bind(request.documents)
    .bind(request.notes)
    .bind(request.is_active)
    .fetch_one(pool)
    .await?;

    tracing::info!(property_id = %property.id, landlord_id = %landlord_id, "property created");
    Ok(property)
}

pub async fn get_property(pool: &DbPool, id: Uuid) -> Result<Property, AppError> {
    sqlx::query_as::<_, Property>(&format!(
        "SELECT {PROPERTY_COLUMNS} FROM properties WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::PropertyNotFound)
}

/// Write every mutable column of `property` back.
async fn save(pool: &DbPool, property: &Property) -> Result<Property, AppError> {
    sqlx::query_as::<_, Property>(&format!(
        r#"
        UPDATE properties
        SET address = $1,
            features = $2,
            financials = $3,
            units = $4,
            property_type = $5,
            images = $6,
            documents = $7,
            notes = $8,
            is_active = $9,
            updated_at = NOW()
        WHERE id = $10
        RETURNING {PROPERTY_COLUMNS}
        "#
    ))
    .bind(&property.address)
    .bind(&property.features)
    .bind(&property.financials)
    .bind(&property.units)
    .bind(property.property_type)
    .bind(&property.images)
    .bind(&property.documents)
    .bind(&property.notes)
    .bind(property.is_active)
    .bind(property.id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::PropertyNotFound)
}

fn apply_update(property: &mut Property, request: UpdatePropertyRequest) -> Result<(), AppError> {
    if let Some(address) = request.address {
        property.address = Json(address);
    }
    if let Some(features) = request.features {
        property.features = Json(features);
    }
    if let Some(financials) = request.financials {
        validate_financials(&financials)?;
        property.financials = Json(financials);
    }
    if let Some(units) = request.units {
        validate_units(&units)?;
        property.units = Json(units);
        if request.property_type.is_none() {
            property.property_type = PropertyType::from_unit_count(property.total_units());
        }
    }
    if let Some(property_type) = request.property_type {
        property.property_type = property_type;
    }
    if let Some(images) = request.images {
        property.images = images;
    }
    if let Some(documents) = request.documents {
        property.documents = documents;
    }
    if let Some(notes) = request.notes {
        property.notes = notes;
    }
    if let Some(is_active) = request.is_active {
        property.is_active = is_active;
    }
    property.updated_at = Utc::now();
    Ok(())
}

/// Partially update a property the actor manages.
pub async fn update_property(
    pool: &DbPool,
    actor: &User,
    id: Uuid,
    request: UpdatePropertyRequest,
) -> Result<Property, AppError> {
    let mut property = get_property(pool, id).await?;
    ensure_can_manage(actor, &property)?;

    apply_update(&mut property, request)?;
    save(pool, &property).await
}

pub async fn delete_property(pool: &DbPool, actor: &User, id: Uuid) -> Result<(), AppError> {
    let property = get_property(pool, id).await?;
    ensure_can_manage(actor, &property)?;

    sqlx::query("DELETE FROM properties WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    tracing::info!(property_id = %id, "property deleted");
    Ok(())
}

/// List all properties, newest first.
pub async fn list_properties(
    pool: &DbPool,
    query: &ListPropertiesQuery,
) -> Result<PaginatedProperties, AppError> {
    let offset = page_offset(query)?;

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM properties")
        .fetch_one(pool)
        .await?;

    let properties = sqlx::query_as::<_, Property>(&format!(
        r#"
        SELECT {PROPERTY_COLUMNS}
        FROM properties
        ORDER BY created_at DESC
        LIMIT $1 OFFSET $2
        "#
    ))
    .bind(query.limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(PaginatedProperties {
        properties: properties.into_iter().map(Into::into).collect(),
        pagination: Pagination::new(total, query.page, query.limit),
    })
}

/// Every property, for portfolio-wide totals.
pub async fn list_all(pool: &DbPool) -> Result<Vec<Property>, AppError> {
    let properties = sqlx::query_as::<_, Property>(&format!(
        "SELECT {PROPERTY_COLUMNS} FROM properties ORDER BY created_at DESC"
    ))
    .fetch_all(pool)
    .await?;
    Ok(properties)
}

pub async fn list_by_landlord(pool: &DbPool, landlord_id: &str) -> Result<Vec<Property>, AppError> {
    let properties = sqlx::query_as::<_, Property>(&format!(
        r#"
        SELECT {PROPERTY_COLUMNS}
        FROM properties
        WHERE landlord_id = $1
        ORDER BY created_at DESC
        "#
    ))
    .bind(landlord_id)
    .fetch_all(pool)
    .await?;
    Ok(properties)
}

/// Active properties with a unit currently let to `tenant_id`.
pub async fn list_for_tenant(pool: &DbPool, tenant_id: &str) -> Result<Vec<Property>, AppError> {
    let properties = sqlx::query_as::<_, Property>(&format!(
        r#"
        SELECT {PROPERTY_COLUMNS}
        FROM properties
        WHERE units @> jsonb_build_array(
            jsonb_build_object('currentTenant', jsonb_build_object('tenantId', $1::text))
        )
        ORDER BY created_at DESC
        "#
    ))
    .bind(tenant_id)
    .fetch_all(pool)
    .await?;

    Ok(properties
        .into_iter()
        .filter(|p| {
            p.units.0.iter().any(|u| {
                u.is_occupied()
                    && u.current_tenant
                        .as_ref()
                        .is_some_and(|t| t.tenant_id == tenant_id)
            })
        })
        .collect())
}

pub async fn add_unit(
    pool: &DbPool,
    actor: &User,
    id: Uuid,
    unit: PropertyUnit,
) -> Result<Property, AppError> {
    let mut property = get_property(pool, id).await?;
    ensure_can_manage(actor, &property)?;

    if property.unit(&unit.unit_number).is_some() {
        return Err(AppError::InvalidRequest(format!(
            "unit {} already exists",
            unit.unit_number
        )));
    }
    validate_units(std::slice::from_ref(&unit))?;

    property.add_unit(unit, Utc::now());
    save(pool, &property).await
}

pub async fn update_unit(
    pool: &DbPool,
    actor: &User,
    id: Uuid,
    unit_number: &str,
    update: UnitUpdate,
) -> Result<Property, AppError> {
    let mut property = get_property(pool, id).await?;
    ensure_can_manage(actor, &property)?;

    if !property.update_unit(unit_number, update, Utc::now()) {
        return Err(AppError::InvalidRequest(format!("no unit {unit_number}")));
    }
    validate_units(&property.units.0)?;
    save(pool, &property).await
}

pub async fn remove_unit(
    pool: &DbPool,
    actor: &User,
    id: Uuid,
    unit_number: &str,
) -> Result<Property, AppError> {
    let mut property = get_property(pool, id).await?;
    ensure_can_manage(actor, &property)?;

    if !property.remove_unit(unit_number, Utc::now()) {
        return Err(AppError::InvalidRequest(format!("no unit {unit_number}")));
    }
    save(pool, &property).await
}
