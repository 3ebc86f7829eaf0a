//! Tasks, the leaves of the project hierarchy.
//!
//! A task's type decides which phase cost bucket its estimated cost feeds:
//! construction -> labor, procurement -> material, inspection -> equipment.
//! Every task write triggers a full recompute of the owning phase and,
//! through it, the owning project.

use axum::{
    extract::{Path, State},
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::rollup;
use crate::shared::error::ServiceError;
use crate::shared::state::AppState;
use crate::shared::store::Documents;
use crate::shared::validate::{ensure_date_order, ensure_name, ensure_non_negative};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub phase_id: Uuid,
    pub name: String,
    pub task_type: TaskType,
    pub status: TaskStatus,
    pub estimated_cost: f64,
    pub assigned_to: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TaskType {
    Construction,
    Procurement,
    Inspection,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    NotStarted,
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    /// Canonical completion weight of a status. Phase completion is the
    /// rounded mean of these over the phase's tasks.
    pub fn completion_weight(self) -> u32 {
        match self {
            TaskStatus::NotStarted | TaskStatus::Pending => 0,
            TaskStatus::InProgress => 50,
            TaskStatus::Completed => 100,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub name: String,
    pub task_type: TaskType,
    pub estimated_cost: f64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: Option<TaskStatus>,
    pub assigned_to: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTaskRequest {
    pub name: Option<String>,
    pub task_type: Option<TaskType>,
    pub status: Option<TaskStatus>,
    pub estimated_cost: Option<f64>,
    pub assigned_to: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

pub fn create_task(
    docs: &mut Documents,
    phase_id: Uuid,
    req: CreateTaskRequest,
) -> Result<Task, ServiceError> {
    ensure_name(&req.name)?;
    ensure_non_negative("estimated_cost", req.estimated_cost)?;
    ensure_date_order(req.start_date, req.end_date)?;
    docs.phase(phase_id)?;

    let now = Utc::now();
    let task = Task {
        id: Uuid::new_v4(),
        phase_id,
        name: req.name,
        task_type: req.task_type,
        status: req.status.unwrap_or(TaskStatus::NotStarted),
        estimated_cost: req.estimated_cost,
        assigned_to: req.assigned_to,
        start_date: req.start_date,
        end_date: req.end_date,
        created_at: now,
        updated_at: now,
    };
    docs.tasks.insert(task.id, task.clone());
    rollup::recompute_phase(docs, phase_id)?;
    Ok(task)
}

pub fn update_task(
    docs: &mut Documents,
    task_id: Uuid,
    req: UpdateTaskRequest,
) -> Result<Task, ServiceError> {
    if let Some(ref name) = req.name {
        ensure_name(name)?;
    }
    if let Some(cost) = req.estimated_cost {
        ensure_non_negative("estimated_cost", cost)?;
    }
    let current = docs.task(task_id)?;
    let start = req.start_date.unwrap_or(current.start_date);
    let end = req.end_date.unwrap_or(current.end_date);
    ensure_date_order(start, end)?;

    let task = docs.task_mut(task_id)?;
    if let Some(name) = req.name {
        task.name = name;
    }
    if let Some(task_type) = req.task_type {
        task.task_type = task_type;
    }
    if let Some(status) = req.status {
        task.status = status;
    }
    if let Some(cost) = req.estimated_cost {
        task.estimated_cost = cost;
    }
    if let Some(assigned_to) = req.assigned_to {
        task.assigned_to = Some(assigned_to);
    }
    task.start_date = start;
    task.end_date = end;
    task.updated_at = Utc::now();
    let phase_id = task.phase_id;

    rollup::recompute_phase(docs, phase_id)?;
    Ok(docs.task(task_id)?.clone())
}

/// Deleting a task with live inventory allocations is rejected; the
/// allocations must be deleted first so their unconsumed stock returns to
/// the ledger.
pub fn delete_task(docs: &mut Documents, task_id: Uuid) -> Result<(), ServiceError> {
    let task = docs.task(task_id)?;
    let phase_id = task.phase_id;
    let dependents = docs.allocations_of_task(task_id).len();
    if dependents > 0 {
        return Err(ServiceError::Conflict(format!(
            "Task {task_id} still has {dependents} inventory allocation(s)"
        )));
    }
    docs.tasks.remove(&task_id);
    rollup::recompute_phase(docs, phase_id)
}

async fn create_task_handler(
    State(state): State<Arc<AppState>>,
    Path(phase_id): Path<Uuid>,
    Json(req): Json<CreateTaskRequest>,
) -> Result<Json<Task>, ServiceError> {
    let mut docs = state.store.write().await;
    let task = create_task(&mut docs, phase_id, req)?;
    Ok(Json(task))
}

async fn list_tasks_handler(
    State(state): State<Arc<AppState>>,
    Path(phase_id): Path<Uuid>,
) -> Result<Json<Vec<Task>>, ServiceError> {
    let docs = state.store.read().await;
    docs.phase(phase_id)?;
    let tasks = docs.tasks_of_phase(phase_id).into_iter().cloned().collect();
    Ok(Json(tasks))
}

async fn get_task_handler(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<Uuid>,
) -> Result<Json<Task>, ServiceError> {
    let docs = state.store.read().await;
    Ok(Json(docs.task(task_id)?.clone()))
}

async fn update_task_handler(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<Uuid>,
    Json(req): Json<UpdateTaskRequest>,
) -> Result<Json<Task>, ServiceError> {
    let mut docs = state.store.write().await;
    let task = update_task(&mut docs, task_id, req)?;
    Ok(Json(task))
}

async fn delete_task_handler(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let mut docs = state.store.write().await;
    delete_task(&mut docs, task_id)?;
    Ok(Json(serde_json::json!({"success": true})))
}

pub fn configure() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/phases/:phase_id/tasks", post(create_task_handler))
        .route("/api/phases/:phase_id/tasks", get(list_tasks_handler))
        .route("/api/tasks/:task_id", get(get_task_handler))
        .route("/api/tasks/:task_id", put(update_task_handler))
        .route("/api/tasks/:task_id", delete(delete_task_handler))
}
