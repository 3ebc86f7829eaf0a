//! Inventory items and the stock ledger.
//!
//! `remaining_value` tracks unallocated stock: it starts at `unit_value`,
//! is decremented when an allocation reserves stock and restored when an
//! allocation releases its unconsumed portion. The reserve check and the
//! decrement happen under the caller's write guard, so two concurrent
//! allocations can never both pass the check on the same stale value.

use axum::{
    extract::{Path, State},
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::allocations::InventoryAllocation;
use crate::shared::error::ServiceError;
use crate::shared::state::AppState;
use crate::shared::store::Documents;
use crate::shared::validate::{ensure_name, ensure_non_negative};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: Uuid,
    pub name: String,
    pub unit: MeasureUnit,
    pub unit_value: f64,
    pub price_per_unit: f64,
    pub total_price: f64,
    pub remaining_value: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Either one of the built-in units or a reference to a custom unit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum MeasureUnit {
    Standard(StandardUnit),
    Custom { custom_unit_id: Uuid },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum StandardUnit {
    Piece,
    Kilogram,
    Ton,
    Meter,
    SquareMeter,
    CubicMeter,
    Liter,
    Bag,
    Roll,
}

#[derive(Debug, Deserialize)]
pub struct CreateInventoryRequest {
    pub name: String,
    pub unit: MeasureUnit,
    pub unit_value: f64,
    pub price_per_unit: f64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateInventoryRequest {
    pub name: Option<String>,
    pub unit: Option<MeasureUnit>,
    pub unit_value: Option<f64>,
    pub price_per_unit: Option<f64>,
}

fn ensure_unit_usable(docs: &Documents, unit: MeasureUnit) -> Result<(), ServiceError> {
    if let MeasureUnit::Custom { custom_unit_id } = unit {
        let custom = docs.custom_unit(custom_unit_id)?;
        if !custom.is_active {
            return Err(ServiceError::Validation(format!(
                "Custom unit {custom_unit_id} is inactive"
            )));
        }
    }
    Ok(())
}

pub fn create_inventory_item(
    docs: &mut Documents,
    req: CreateInventoryRequest,
) -> Result<InventoryItem, ServiceError> {
    ensure_name(&req.name)?;
    ensure_non_negative("unit_value", req.unit_value)?;
    ensure_non_negative("price_per_unit", req.price_per_unit)?;
    ensure_unit_usable(docs, req.unit)?;

    let now = Utc::now();
    let item = InventoryItem {
        id: Uuid::new_v4(),
        name: req.name,
        unit: req.unit,
        unit_value: req.unit_value,
        price_per_unit: req.price_per_unit,
        total_price: req.unit_value * req.price_per_unit,
        remaining_value: req.unit_value,
        created_at: now,
        updated_at: now,
    };
    docs.inventory.insert(item.id, item.clone());
    Ok(item)
}

pub fn update_inventory_item(
    docs: &mut Documents,
    inventory_id: Uuid,
    req: UpdateInventoryRequest,
) -> Result<InventoryItem, ServiceError> {
    if let Some(ref name) = req.name {
        ensure_name(name)?;
    }
    if let Some(unit_value) = req.unit_value {
        ensure_non_negative("unit_value", unit_value)?;
    }
    if let Some(price) = req.price_per_unit {
        ensure_non_negative("price_per_unit", price)?;
    }
    if let Some(unit) = req.unit {
        ensure_unit_usable(docs, unit)?;
    }

    let item = docs.inventory_item_mut(inventory_id)?;
    if let Some(name) = req.name {
        item.name = name;
    }
    if let Some(unit) = req.unit {
        item.unit = unit;
    }
    if let Some(unit_value) = req.unit_value {
        // Stock on hand moves with the delta; outstanding allocations stay
        // reserved, so the result must not drop below zero.
        let delta = unit_value - item.unit_value;
        let remaining = item.remaining_value + delta;
        if remaining < 0.0 {
            return Err(ServiceError::Validation(format!(
                "unit_value {unit_value} is below the outstanding allocations of item {inventory_id}"
            )));
        }
        item.unit_value = unit_value;
        item.remaining_value = remaining;
    }
    if let Some(price) = req.price_per_unit {
        item.price_per_unit = price;
    }
    item.total_price = item.unit_value * item.price_per_unit;
    item.updated_at = Utc::now();
    Ok(item.clone())
}

/// Deleting an inventory item with live allocations is rejected.
pub fn delete_inventory_item(docs: &mut Documents, inventory_id: Uuid) -> Result<(), ServiceError> {
    docs.inventory_item(inventory_id)?;
    let dependents = docs.count_allocations_of_inventory(inventory_id);
    if dependents > 0 {
        return Err(ServiceError::Conflict(format!(
            "Inventory item {inventory_id} still has {dependents} allocation(s)"
        )));
    }
    docs.inventory.remove(&inventory_id);
    Ok(())
}

/// Reserve `amount` of unallocated stock. The check and the decrement are
/// one step under the caller's write guard; on `InsufficientStock` nothing
/// is changed.
pub fn reserve(docs: &mut Documents, inventory_id: Uuid, amount: f64) -> Result<(), ServiceError> {
    let item = docs.inventory_item_mut(inventory_id)?;
    if amount > item.remaining_value {
        return Err(ServiceError::InsufficientStock(format!(
            "Requested {amount} of {}, only {} remaining",
            item.name, item.remaining_value
        )));
    }
    item.remaining_value -= amount;
    item.updated_at = Utc::now();
    Ok(())
}

/// Return previously reserved stock to the ledger. Clamped so rounding in
/// the callers can never push `remaining_value` past `unit_value`.
pub fn release(docs: &mut Documents, inventory_id: Uuid, amount: f64) -> Result<(), ServiceError> {
    let item = docs.inventory_item_mut(inventory_id)?;
    item.remaining_value = (item.remaining_value + amount).min(item.unit_value);
    item.updated_at = Utc::now();
    Ok(())
}

async fn create_inventory_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateInventoryRequest>,
) -> Result<Json<InventoryItem>, ServiceError> {
    let mut docs = state.store.write().await;
    let item = create_inventory_item(&mut docs, req)?;
    Ok(Json(item))
}

async fn list_inventory_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<InventoryItem>>, ServiceError> {
    let docs = state.store.read().await;
    let mut items: Vec<InventoryItem> = docs.inventory.values().cloned().collect();
    items.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(Json(items))
}

async fn get_inventory_handler(
    State(state): State<Arc<AppState>>,
    Path(inventory_id): Path<Uuid>,
) -> Result<Json<InventoryItem>, ServiceError> {
    let docs = state.store.read().await;
    Ok(Json(docs.inventory_item(inventory_id)?.clone()))
}

async fn update_inventory_handler(
    State(state): State<Arc<AppState>>,
    Path(inventory_id): Path<Uuid>,
    Json(req): Json<UpdateInventoryRequest>,
) -> Result<Json<InventoryItem>, ServiceError> {
    let mut docs = state.store.write().await;
    let item = update_inventory_item(&mut docs, inventory_id, req)?;
    Ok(Json(item))
}

async fn delete_inventory_handler(
    State(state): State<Arc<AppState>>,
    Path(inventory_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let mut docs = state.store.write().await;
    delete_inventory_item(&mut docs, inventory_id)?;
    Ok(Json(serde_json::json!({"success": true})))
}

async fn list_item_allocations_handler(
    State(state): State<Arc<AppState>>,
    Path(inventory_id): Path<Uuid>,
) -> Result<Json<Vec<InventoryAllocation>>, ServiceError> {
    let docs = state.store.read().await;
    docs.inventory_item(inventory_id)?;
    let allocations = docs
        .allocations
        .values()
        .filter(|a| a.inventory_id == inventory_id)
        .cloned()
        .collect();
    Ok(Json(allocations))
}

pub fn configure() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/inventory", post(create_inventory_handler))
        .route("/api/inventory", get(list_inventory_handler))
        .route("/api/inventory/:inventory_id", get(get_inventory_handler))
        .route(
            "/api/inventory/:inventory_id",
            put(update_inventory_handler),
        )
        .route(
            "/api/inventory/:inventory_id",
            delete(delete_inventory_handler),
        )
        .route(
            "/api/inventory/:inventory_id/allocations",
            get(list_item_allocations_handler),
        )
}
