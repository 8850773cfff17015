//! Property HTTP handlers.
//!
//! - POST /api/properties - Create property
//! - GET /api/properties - List properties (paginated)
//! - GET /api/properties/{id} - Get property
//! - PUT /api/properties/{id} - Partially update property
//! - DELETE /api/properties/{id} - Delete property
//! - GET /api/landlords/{landlord_id}/properties - List a landlord's properties
//! - POST /api/properties/{id}/units - Add unit
//! - PUT /api/properties/{id}/units/{unit_number} - Update unit
//! - DELETE /api/properties/{id}/units/{unit_number} - Remove unit

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        property::{
            CreatePropertyRequest, ListPropertiesQuery, PaginatedProperties, PropertyResponse,
            PropertyUnit, UnitUpdate, UpdatePropertyRequest,
        },
        session::SessionUser,
    },
    services::property_service,
};

/// Create a new property.
///
/// # Endpoint
///
/// `POST /api/properties`
///
/// # Request Body
///
/// ```json
/// {
///   "address": {"street": "4581 Finch St.", "city": "Bayshore", "state": "CA", "zipCode": "94326"},
///   "features": {"squareFeet": 1800, "hasParking": true},
///   "units": [{"unitNumber": "A", "monthlyRentCents": 150000}]
/// }
/// ```
///
/// Landlords create under their own accounting id; managers and admins must
/// pass `landlordId`.
///
/// # Response
///
/// - **Success (201 Created)**: the property with its computed summary
/// - **Error (400)**: invalid address or units
/// - **Error (403)**: tenant, or landlord naming another landlord
pub async fn create_property(
    State(pool): State<DbPool>,
    Extension(session): Extension<SessionUser>,
    Json(request): Json<CreatePropertyRequest>,
) -> Result<(StatusCode, Json<PropertyResponse>), AppError> {
    let property = property_service::create_property(&pool, &session.user, request).await?;
    Ok((StatusCode::CREATED, Json(property.into())))
}

/// List properties, newest first.
///
/// # Query
///
/// - `page` (default 1, at least 1)
/// - `limit` (default 10, 1 to 100)
pub async fn list_properties(
    State(pool): State<DbPool>,
    Query(query): Query<ListPropertiesQuery>,
) -> Result<Json<PaginatedProperties>, AppError> {
    Ok(Json(property_service::list_properties(&pool, &query).await?))
}

pub async fn get_property(
    State(pool): State<DbPool>,
    Path(property_id): Path<Uuid>,
) -> Result<Json<PropertyResponse>, AppError> {
    let property = property_service::get_property(&pool, property_id).await?;
    Ok(Json(property.into()))
}

/// Partially update a property. Only the owner landlord or staff may.
pub async fn update_property(
    State(pool): State<DbPool>,
    Extension(session): Extension<SessionUser>,
    Path(property_id): Path<Uuid>,
    Json(request): Json<UpdatePropertyRequest>,
) -> Result<Json<PropertyResponse>, AppError> {
    let property =
        property_service::update_property(&pool, &session.user, property_id, request).await?;
    Ok(Json(property.into()))
}

pub async fn delete_property(
    State(pool): State<DbPool>,
    Extension(session): Extension<SessionUser>,
    Path(property_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    property_service::delete_property(&pool, &session.user, property_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_landlord_properties(
    State(pool): State<DbPool>,
    Path(landlord_id): Path<String>,
) -> Result<Json<Vec<PropertyResponse>>, AppError> {
    let properties = property_service::list_by_landlord(&pool, &landlord_id).await?;
    Ok(Json(properties.into_iter().map(Into::into).collect()))
}

pub async fn add_unit(
    State(pool): State<DbPool>,
    Extension(session): Extension<SessionUser>,
    Path(property_id): Path<Uuid>,
    Json(unit): Json<PropertyUnit>,
) -> Result<(StatusCode, Json<PropertyResponse>), AppError> {
    let property = property_service::add_unit(&pool, &session.user, property_id, unit).await?;
    Ok((StatusCode::CREATED, Json(property.into())))
}

/// Update one unit. Setting `currentTenant` moves the previous tenant into
/// the unit's history.
pub async fn update_unit(
    State(pool): State<DbPool>,
    Extension(session): Extension<SessionUser>,
    Path((property_id, unit_number)): Path<(Uuid, String)>,
    Json(update): Json<UnitUpdate>,
) -> Result<Json<PropertyResponse>, AppError> {
    let property =
        property_service::update_unit(&pool, &session.user, property_id, &unit_number, update)
            .await?;
    Ok(Json(property.into()))
}

pub async fn remove_unit(
    State(pool): State<DbPool>,
    Extension(session): Extension<SessionUser>,
    Path((property_id, unit_number)): Path<(Uuid, String)>,
) -> Result<Json<PropertyResponse>, AppError> {
    let property =
        property_service::remove_unit(&pool, &session.user, property_id, &unit_number).await?;
    Ok(Json(property.into()))
}
