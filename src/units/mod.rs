//! Custom measurement units.
//!
//! Units are soft-deleted (`is_active = false`) so inventory items keep a
//! resolvable reference; an inactive unit just cannot be attached to new
//! inventory.

use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::shared::error::ServiceError;
use crate::shared::state::AppState;
use crate::shared::store::Documents;
use crate::shared::validate::ensure_name;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomUnit {
    pub id: Uuid,
    pub name: String,
    pub symbol: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateUnitRequest {
    pub name: String,
    pub symbol: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUnitRequest {
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct UnitFilter {
    pub include_inactive: Option<bool>,
}

pub fn create_unit(docs: &mut Documents, req: CreateUnitRequest) -> Result<CustomUnit, ServiceError> {
    ensure_name(&req.name)?;
    if req.symbol.trim().is_empty() {
        return Err(ServiceError::Validation("symbol must not be empty".into()));
    }
    let now = Utc::now();
    let unit = CustomUnit {
        id: Uuid::new_v4(),
        name: req.name,
        symbol: req.symbol,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    docs.units.insert(unit.id, unit.clone());
    Ok(unit)
}

pub fn update_unit(
    docs: &mut Documents,
    unit_id: Uuid,
    req: UpdateUnitRequest,
) -> Result<CustomUnit, ServiceError> {
    if let Some(ref name) = req.name {
        ensure_name(name)?;
    }
    let unit = docs.custom_unit_mut(unit_id)?;
    if let Some(name) = req.name {
        unit.name = name;
    }
    if let Some(symbol) = req.symbol {
        if symbol.trim().is_empty() {
            return Err(ServiceError::Validation("symbol must not be empty".into()));
        }
        unit.symbol = symbol;
    }
    if let Some(is_active) = req.is_active {
        unit.is_active = is_active;
    }
    unit.updated_at = Utc::now();
    Ok(unit.clone())
}

pub fn deactivate_unit(docs: &mut Documents, unit_id: Uuid) -> Result<CustomUnit, ServiceError> {
    let unit = docs.custom_unit_mut(unit_id)?;
    unit.is_active = false;
    unit.updated_at = Utc::now();
    Ok(unit.clone())
}

async fn create_unit_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateUnitRequest>,
) -> Result<Json<CustomUnit>, ServiceError> {
    let mut docs = state.store.write().await;
    let unit = create_unit(&mut docs, req)?;
    Ok(Json(unit))
}

async fn list_units_handler(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<UnitFilter>,
) -> Result<Json<Vec<CustomUnit>>, ServiceError> {
    let docs = state.store.read().await;
    let include_inactive = filter.include_inactive.unwrap_or(false);
    let mut units: Vec<CustomUnit> = docs
        .units
        .values()
        .filter(|u| include_inactive || u.is_active)
        .cloned()
        .collect();
    units.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(Json(units))
}

async fn get_unit_handler(
    State(state): State<Arc<AppState>>,
    Path(unit_id): Path<Uuid>,
) -> Result<Json<CustomUnit>, ServiceError> {
    let docs = state.store.read().await;
    Ok(Json(docs.custom_unit(unit_id)?.clone()))
}

async fn update_unit_handler(
    State(state): State<Arc<AppState>>,
    Path(unit_id): Path<Uuid>,
    Json(req): Json<UpdateUnitRequest>,
) -> Result<Json<CustomUnit>, ServiceError> {
    let mut docs = state.store.write().await;
    let unit = update_unit(&mut docs, unit_id, req)?;
    Ok(Json(unit))
}

async fn delete_unit_handler(
    State(state): State<Arc<AppState>>,
    Path(unit_id): Path<Uuid>,
) -> Result<Json<CustomUnit>, ServiceError> {
    let mut docs = state.store.write().await;
    let unit = deactivate_unit(&mut docs, unit_id)?;
    Ok(Json(unit))
}

pub fn configure() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/units", post(create_unit_handler))
        .route("/api/units", get(list_units_handler))
        .route("/api/units/:unit_id", get(get_unit_handler))
        .route("/api/units/:unit_id", put(update_unit_handler))
        .route("/api/units/:unit_id", delete(delete_unit_handler))
}
