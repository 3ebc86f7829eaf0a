//! Project phases.
//!
//! A phase's cost buckets (labor/material/equipment), completion and task
//! count are derived from its tasks by the rollup module; actual_cost and
//! budget_variance follow from those. Dependencies between phases of the
//! same project are validated for acyclicity before they are persisted.

pub mod dependencies;

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
pub struct Phase {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub status: PhaseStatus,
    pub estimated_budget: f64,
    pub labor_cost: f64,
    pub material_cost: f64,
    pub equipment_cost: f64,
    pub actual_cost: f64,
    pub budget_variance: f64,
    pub completion: u8,
    pub task_count: usize,
    pub dependencies: Vec<Uuid>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum PhaseStatus {
    NotStarted,
    InProgress,
    Completed,
    OnHold,
    Cancelled,
}

#[derive(Debug, Deserialize)]
pub struct CreatePhaseRequest {
    pub name: String,
    pub estimated_budget: f64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: Option<PhaseStatus>,
    pub dependencies: Option<Vec<Uuid>>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePhaseRequest {
    pub name: Option<String>,
    pub estimated_budget: Option<f64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: Option<PhaseStatus>,
}

#[derive(Debug, Deserialize)]
pub struct SetDependenciesRequest {
    pub dependencies: Vec<Uuid>,
}

pub fn create_phase(
    docs: &mut Documents,
    project_id: Uuid,
    req: CreatePhaseRequest,
) -> Result<Phase, ServiceError> {
    ensure_name(&req.name)?;
    ensure_non_negative("estimated_budget", req.estimated_budget)?;
    ensure_date_order(req.start_date, req.end_date)?;
    docs.project(project_id)?;

    let deps = req.dependencies.unwrap_or_default();
    for &dep in &deps {
        match docs.phases.get(&dep) {
            Some(p) if p.project_id == project_id => {}
            _ => {
                return Err(ServiceError::InvalidDependency(format!(
                    "Phase {dep} is not part of project {project_id}"
                )))
            }
        }
    }

    let now = Utc::now();
    let phase = Phase {
        id: Uuid::new_v4(),
        project_id,
        name: req.name,
        status: req.status.unwrap_or(PhaseStatus::NotStarted),
        estimated_budget: req.estimated_budget,
        labor_cost: 0.0,
        material_cost: 0.0,
        equipment_cost: 0.0,
        actual_cost: 0.0,
        budget_variance: -req.estimated_budget,
        completion: 0,
        task_count: 0,
        dependencies: deps,
        start_date: req.start_date,
        end_date: req.end_date,
        created_at: now,
        updated_at: now,
    };
    docs.phases.insert(phase.id, phase.clone());
    rollup::recompute_project(docs, project_id)?;
    Ok(docs.phase(phase.id)?.clone())
}

pub fn update_phase(
    docs: &mut Documents,
    phase_id: Uuid,
    req: UpdatePhaseRequest,
) -> Result<Phase, ServiceError> {
    if let Some(ref name) = req.name {
        ensure_name(name)?;
    }
    if let Some(budget) = req.estimated_budget {
        ensure_non_negative("estimated_budget", budget)?;
    }
    let current = docs.phase(phase_id)?;
    let start = req.start_date.unwrap_or(current.start_date);
    let end = req.end_date.unwrap_or(current.end_date);
    ensure_date_order(start, end)?;

    let phase = docs.phase_mut(phase_id)?;
    if let Some(name) = req.name {
        phase.name = name;
    }
    if let Some(budget) = req.estimated_budget {
        phase.estimated_budget = budget;
    }
    phase.start_date = start;
    phase.end_date = end;
    if let Some(status) = req.status {
        phase.status = status;
    }
    phase.updated_at = Utc::now();
    let project_id = phase.project_id;

    rollup::recompute_project(docs, project_id)?;
    Ok(docs.phase(phase_id)?.clone())
}

/// Deleting a phase with live tasks is rejected. Other phases of the
/// project drop the deleted id from their dependency lists.
pub fn delete_phase(docs: &mut Documents, phase_id: Uuid) -> Result<(), ServiceError> {
    let phase = docs.phase(phase_id)?;
    let project_id = phase.project_id;
    let dependents = docs.tasks_of_phase(phase_id).len();
    if dependents > 0 {
        return Err(ServiceError::Conflict(format!(
            "Phase {phase_id} still has {dependents} task(s)"
        )));
    }
    docs.phases.remove(&phase_id);
    for other in docs.phases.values_mut() {
        other.dependencies.retain(|&d| d != phase_id);
    }
    rollup::recompute_project(docs, project_id)
}

pub fn set_dependencies(
    docs: &mut Documents,
    phase_id: Uuid,
    candidates: Vec<Uuid>,
) -> Result<Phase, ServiceError> {
    dependencies::validate(docs, phase_id, &candidates)?;
    let phase = docs.phase_mut(phase_id)?;
    phase.dependencies = candidates;
    phase.updated_at = Utc::now();
    Ok(phase.clone())
}

async fn create_phase_handler(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<Uuid>,
    Json(req): Json<CreatePhaseRequest>,
) -> Result<Json<Phase>, ServiceError> {
    let mut docs = state.store.write().await;
    let phase = create_phase(&mut docs, project_id, req)?;
    Ok(Json(phase))
}

async fn list_phases_handler(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Vec<Phase>>, ServiceError> {
    let docs = state.store.read().await;
    docs.project(project_id)?;
    let phases = docs
        .phases_of_project(project_id)
        .into_iter()
        .cloned()
        .collect();
    Ok(Json(phases))
}

async fn get_phase_handler(
    State(state): State<Arc<AppState>>,
    Path(phase_id): Path<Uuid>,
) -> Result<Json<Phase>, ServiceError> {
    let docs = state.store.read().await;
    Ok(Json(docs.phase(phase_id)?.clone()))
}

async fn update_phase_handler(
    State(state): State<Arc<AppState>>,
    Path(phase_id): Path<Uuid>,
    Json(req): Json<UpdatePhaseRequest>,
) -> Result<Json<Phase>, ServiceError> {
    let mut docs = state.store.write().await;
    let phase = update_phase(&mut docs, phase_id, req)?;
    Ok(Json(phase))
}

async fn delete_phase_handler(
    State(state): State<Arc<AppState>>,
    Path(phase_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let mut docs = state.store.write().await;
    delete_phase(&mut docs, phase_id)?;
    Ok(Json(serde_json::json!({"success": true})))
}

async fn set_dependencies_handler(
    State(state): State<Arc<AppState>>,
    Path(phase_id): Path<Uuid>,
    Json(req): Json<SetDependenciesRequest>,
) -> Result<Json<Phase>, ServiceError> {
    let mut docs = state.store.write().await;
    let phase = set_dependencies(&mut docs, phase_id, req.dependencies)?;
    Ok(Json(phase))
}

pub fn configure() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/projects/:project_id/phases",
            post(create_phase_handler),
        )
        .route("/api/projects/:project_id/phases", get(list_phases_handler))
        .route("/api/phases/:phase_id", get(get_phase_handler))
        .route("/api/phases/:phase_id", put(update_phase_handler))
        .route("/api/phases/:phase_id", delete(delete_phase_handler))
        .route(
            "/api/phases/:phase_id/dependencies",
            put(set_dependencies_handler),
        )
}
