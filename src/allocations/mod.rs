//! Inventory allocations: a reservation of stock against a task.
//!
//! An allocation carries the full task/phase/project/customer id chain,
//! resolved from the live hierarchy at creation (the store has no joins).
//! Every ledger adjustment and its record write happen under one write
//! guard, so a failed reserve leaves the record untouched.

use axum::{
    extract::{Path, State},
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::inventory;
use crate::shared::error::ServiceError;
use crate::shared::state::AppState;
use crate::shared::store::Documents;
use crate::shared::validate::ensure_non_negative;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryAllocation {
    pub id: Uuid,
    pub task_id: Uuid,
    pub phase_id: Uuid,
    pub project_id: Uuid,
    pub customer_id: Uuid,
    pub inventory_id: Uuid,
    pub allocated_value: f64,
    pub consumed_value: f64,
    pub remaining_value: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct AllocateRequest {
    pub inventory_id: Uuid,
    pub allocated_value: f64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAllocationRequest {
    pub allocated_value: f64,
}

#[derive(Debug, Deserialize)]
pub struct ConsumeRequest {
    pub consumed_value: f64,
}

pub fn allocate(
    docs: &mut Documents,
    task_id: Uuid,
    req: AllocateRequest,
) -> Result<InventoryAllocation, ServiceError> {
    ensure_non_negative("allocated_value", req.allocated_value)?;
    if req.allocated_value == 0.0 {
        return Err(ServiceError::Validation(
            "allocated_value must be greater than zero".into(),
        ));
    }

    let task = docs.task(task_id)?;
    let phase_id = task.phase_id;
    let phase = docs.phase(phase_id)?;
    let project_id = phase.project_id;
    let project = docs.project(project_id)?;
    let customer_id = project.customer_id;
    docs.customer(customer_id)?;
    docs.inventory_item(req.inventory_id)?;

    inventory::reserve(docs, req.inventory_id, req.allocated_value)?;

    let now = Utc::now();
    let allocation = InventoryAllocation {
        id: Uuid::new_v4(),
        task_id,
        phase_id,
        project_id,
        customer_id,
        inventory_id: req.inventory_id,
        allocated_value: req.allocated_value,
        consumed_value: 0.0,
        remaining_value: req.allocated_value,
        created_at: now,
        updated_at: now,
    };
    docs.allocations.insert(allocation.id, allocation.clone());
    tracing::debug!(
        allocation_id = %allocation.id,
        %task_id,
        inventory_id = %req.inventory_id,
        allocated = req.allocated_value,
        "inventory allocated"
    );
    Ok(allocation)
}

/// Change the allocated quantity. A growth reserves the difference (and
/// fails whole on insufficient stock); a shrink releases it. The new value
/// cannot undercut what has already been consumed.
pub fn update_allocation(
    docs: &mut Documents,
    allocation_id: Uuid,
    new_allocated_value: f64,
) -> Result<InventoryAllocation, ServiceError> {
    ensure_non_negative("allocated_value", new_allocated_value)?;
    let current = docs.allocation(allocation_id)?;
    if new_allocated_value < current.consumed_value {
        return Err(ServiceError::Validation(format!(
            "allocated_value {new_allocated_value} is below the {} already consumed",
            current.consumed_value
        )));
    }
    let inventory_id = current.inventory_id;
    let diff = new_allocated_value - current.allocated_value;

    if diff > 0.0 {
        inventory::reserve(docs, inventory_id, diff)?;
    } else if diff < 0.0 {
        inventory::release(docs, inventory_id, -diff)?;
    }

    let allocation = docs.allocation_mut(allocation_id)?;
    allocation.allocated_value = new_allocated_value;
    allocation.remaining_value = allocation.allocated_value - allocation.consumed_value;
    allocation.updated_at = Utc::now();
    Ok(allocation.clone())
}

/// Record consumption out of the allocated quantity. Consumption never
/// touches the ledger: the stock was already reserved at allocation time.
pub fn consume(
    docs: &mut Documents,
    allocation_id: Uuid,
    consumed_value: f64,
) -> Result<InventoryAllocation, ServiceError> {
    ensure_non_negative("consumed_value", consumed_value)?;
    let allocation = docs.allocation_mut(allocation_id)?;
    if consumed_value > allocation.allocated_value {
        return Err(ServiceError::InvalidConsumption(format!(
            "consumed_value {consumed_value} exceeds allocated_value {}",
            allocation.allocated_value
        )));
    }
    allocation.consumed_value = consumed_value;
    allocation.remaining_value = allocation.allocated_value - allocation.consumed_value;
    allocation.updated_at = Utc::now();
    Ok(allocation.clone())
}

/// Delete the allocation, returning its unconsumed portion to the ledger.
pub fn delete_allocation(docs: &mut Documents, allocation_id: Uuid) -> Result<(), ServiceError> {
    let allocation = docs.allocation(allocation_id)?;
    let inventory_id = allocation.inventory_id;
    let unconsumed = allocation.allocated_value - allocation.consumed_value;
    inventory::release(docs, inventory_id, unconsumed)?;
    docs.allocations.remove(&allocation_id);
    tracing::debug!(%allocation_id, %inventory_id, released = unconsumed, "allocation deleted");
    Ok(())
}

async fn allocate_handler(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<Uuid>,
    Json(req): Json<AllocateRequest>,
) -> Result<Json<InventoryAllocation>, ServiceError> {
    let mut docs = state.store.write().await;
    let allocation = allocate(&mut docs, task_id, req)?;
    Ok(Json(allocation))
}

async fn list_task_allocations_handler(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<Uuid>,
) -> Result<Json<Vec<InventoryAllocation>>, ServiceError> {
    let docs = state.store.read().await;
    docs.task(task_id)?;
    let allocations = docs
        .allocations_of_task(task_id)
        .into_iter()
        .cloned()
        .collect();
    Ok(Json(allocations))
}

async fn get_allocation_handler(
    State(state): State<Arc<AppState>>,
    Path(allocation_id): Path<Uuid>,
) -> Result<Json<InventoryAllocation>, ServiceError> {
    let docs = state.store.read().await;
    Ok(Json(docs.allocation(allocation_id)?.clone()))
}

async fn update_allocation_handler(
    State(state): State<Arc<AppState>>,
    Path(allocation_id): Path<Uuid>,
    Json(req): Json<UpdateAllocationRequest>,
) -> Result<Json<InventoryAllocation>, ServiceError> {
    let mut docs = state.store.write().await;
    let allocation = update_allocation(&mut docs, allocation_id, req.allocated_value)?;
    Ok(Json(allocation))
}

async fn consume_handler(
    State(state): State<Arc<AppState>>,
    Path(allocation_id): Path<Uuid>,
    Json(req): Json<ConsumeRequest>,
) -> Result<Json<InventoryAllocation>, ServiceError> {
    let mut docs = state.store.write().await;
    let allocation = consume(&mut docs, allocation_id, req.consumed_value)?;
    Ok(Json(allocation))
}

async fn delete_allocation_handler(
    State(state): State<Arc<AppState>>,
    Path(allocation_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let mut docs = state.store.write().await;
    delete_allocation(&mut docs, allocation_id)?;
    Ok(Json(serde_json::json!({"success": true})))
}

pub fn configure() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/tasks/:task_id/allocations", post(allocate_handler))
        .route(
            "/api/tasks/:task_id/allocations",
            get(list_task_allocations_handler),
        )
        .route("/api/allocations/:allocation_id", get(get_allocation_handler))
        .route(
            "/api/allocations/:allocation_id",
            put(update_allocation_handler),
        )
        .route(
            "/api/allocations/:allocation_id/consume",
            put(consume_handler),
        )
        .route(
            "/api/allocations/:allocation_id",
            delete(delete_allocation_handler),
        )
}
