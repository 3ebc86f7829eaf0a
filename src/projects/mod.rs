//! Projects and their read-side aggregate views.
//!
//! Derived fields (actual_cost, completion, phase_count, task_count,
//! budget_variance) are maintained by the rollup module; the stats and
//! timeline endpoints only read them back.

use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::phases::Phase;
use crate::rollup;
use crate::shared::error::ServiceError;
use crate::shared::state::AppState;
use crate::shared::store::Documents;
use crate::shared::validate::{ensure_date_order, ensure_name, ensure_non_negative};
use crate::tasks::Task;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub estimated_budget: f64,
    pub actual_cost: f64,
    pub budget_variance: f64,
    pub completion: u8,
    pub phase_count: usize,
    pub task_count: usize,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectStatus {
    NotStarted,
    Ongoing,
    Completed,
    OnHold,
    Cancelled,
}

const ALL_STATUSES: [ProjectStatus; 5] = [
    ProjectStatus::NotStarted,
    ProjectStatus::Ongoing,
    ProjectStatus::Completed,
    ProjectStatus::OnHold,
    ProjectStatus::Cancelled,
];

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub customer_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub estimated_budget: f64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: Option<ProjectStatus>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProjectRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub estimated_budget: Option<f64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: Option<ProjectStatus>,
}

#[derive(Debug, Deserialize)]
pub struct ProjectFilter {
    pub customer_id: Option<Uuid>,
    pub status: Option<ProjectStatus>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectStats {
    pub count: usize,
    pub total_budget: f64,
    pub total_actual_cost: f64,
    pub average_completion: u8,
    pub by_status: Vec<StatusCount>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusCount {
    pub status: ProjectStatus,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectTimeline {
    pub project: Project,
    pub phases: Vec<TimelinePhase>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimelinePhase {
    #[serde(flatten)]
    pub phase: Phase,
    pub tasks: Vec<Task>,
}

pub fn create_project(
    docs: &mut Documents,
    req: CreateProjectRequest,
) -> Result<Project, ServiceError> {
    ensure_name(&req.name)?;
    ensure_non_negative("estimated_budget", req.estimated_budget)?;
    ensure_date_order(req.start_date, req.end_date)?;
    docs.customer(req.customer_id)?;

    let now = Utc::now();
    let project = Project {
        id: Uuid::new_v4(),
        customer_id: req.customer_id,
        name: req.name,
        description: req.description,
        status: req.status.unwrap_or(ProjectStatus::NotStarted),
        estimated_budget: req.estimated_budget,
        actual_cost: 0.0,
        budget_variance: -req.estimated_budget,
        completion: 0,
        phase_count: 0,
        task_count: 0,
        start_date: req.start_date,
        end_date: req.end_date,
        created_at: now,
        updated_at: now,
    };
    docs.projects.insert(project.id, project.clone());
    Ok(project)
}

pub fn update_project(
    docs: &mut Documents,
    project_id: Uuid,
    req: UpdateProjectRequest,
) -> Result<Project, ServiceError> {
    if let Some(ref name) = req.name {
        ensure_name(name)?;
    }
    if let Some(budget) = req.estimated_budget {
        ensure_non_negative("estimated_budget", budget)?;
    }
    let current = docs.project(project_id)?;
    let start = req.start_date.unwrap_or(current.start_date);
    let end = req.end_date.unwrap_or(current.end_date);
    ensure_date_order(start, end)?;

    let project = docs.project_mut(project_id)?;
    if let Some(name) = req.name {
        project.name = name;
    }
    if let Some(description) = req.description {
        project.description = Some(description);
    }
    if let Some(budget) = req.estimated_budget {
        project.estimated_budget = budget;
    }
    project.start_date = start;
    project.end_date = end;
    if let Some(status) = req.status {
        project.status = status;
    }
    project.updated_at = Utc::now();

    rollup::recompute_project(docs, project_id)?;
    Ok(docs.project(project_id)?.clone())
}

/// Deleting a project with live phases is rejected.
pub fn delete_project(docs: &mut Documents, project_id: Uuid) -> Result<(), ServiceError> {
    docs.project(project_id)?;
    let dependents = docs.phases_of_project(project_id).len();
    if dependents > 0 {
        return Err(ServiceError::Conflict(format!(
            "Project {project_id} still has {dependents} phase(s)"
        )));
    }
    docs.projects.remove(&project_id);
    Ok(())
}

/// Aggregate figures over the stored rollup fields, never recomputed from
/// children here.
pub fn stats(docs: &Documents) -> ProjectStats {
    let count = docs.projects.len();
    let total_budget = docs.projects.values().map(|p| p.estimated_budget).sum();
    let total_actual_cost = docs.projects.values().map(|p| p.actual_cost).sum();
    let average_completion = if count == 0 {
        0
    } else {
        let sum: u32 = docs.projects.values().map(|p| p.completion as u32).sum();
        (sum as f64 / count as f64).round() as u8
    };
    let by_status = ALL_STATUSES
        .iter()
        .map(|&status| StatusCount {
            status,
            count: docs.projects.values().filter(|p| p.status == status).count(),
        })
        .collect();
    ProjectStats {
        count,
        total_budget,
        total_actual_cost,
        average_completion,
        by_status,
    }
}

pub fn timeline(docs: &Documents, project_id: Uuid) -> Result<ProjectTimeline, ServiceError> {
    let project = docs.project(project_id)?.clone();
    let phases = docs
        .phases_of_project(project_id)
        .into_iter()
        .map(|phase| {
            let tasks = docs.tasks_of_phase(phase.id).into_iter().cloned().collect();
            TimelinePhase {
                phase: phase.clone(),
                tasks,
            }
        })
        .collect();
    Ok(ProjectTimeline { project, phases })
}

async fn create_project_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateProjectRequest>,
) -> Result<Json<Project>, ServiceError> {
    let mut docs = state.store.write().await;
    let project = create_project(&mut docs, req)?;
    Ok(Json(project))
}

async fn list_projects_handler(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<ProjectFilter>,
) -> Result<Json<Vec<Project>>, ServiceError> {
    let docs = state.store.read().await;
    let mut projects: Vec<Project> = docs
        .projects
        .values()
        .filter(|p| filter.customer_id.map_or(true, |c| p.customer_id == c))
        .filter(|p| filter.status.map_or(true, |s| p.status == s))
        .cloned()
        .collect();
    projects.sort_by(|a, b| a.start_date.cmp(&b.start_date).then(a.name.cmp(&b.name)));
    Ok(Json(projects))
}

async fn get_project_handler(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Project>, ServiceError> {
    let docs = state.store.read().await;
    Ok(Json(docs.project(project_id)?.clone()))
}

async fn update_project_handler(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<Uuid>,
    Json(req): Json<UpdateProjectRequest>,
) -> Result<Json<Project>, ServiceError> {
    let mut docs = state.store.write().await;
    let project = update_project(&mut docs, project_id, req)?;
    Ok(Json(project))
}

async fn delete_project_handler(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let mut docs = state.store.write().await;
    delete_project(&mut docs, project_id)?;
    Ok(Json(serde_json::json!({"success": true})))
}

async fn project_stats_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ProjectStats>, ServiceError> {
    let docs = state.store.read().await;
    Ok(Json(stats(&docs)))
}

async fn project_timeline_handler(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<ProjectTimeline>, ServiceError> {
    let docs = state.store.read().await;
    Ok(Json(timeline(&docs, project_id)?))
}

pub fn configure() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/projects", post(create_project_handler))
        .route("/api/projects", get(list_projects_handler))
        .route("/api/projects/stats", get(project_stats_handler))
        .route("/api/projects/:project_id", get(get_project_handler))
        .route("/api/projects/:project_id", put(update_project_handler))
        .route("/api/projects/:project_id", delete(delete_project_handler))
        .route(
            "/api/projects/:project_id/timeline",
            get(project_timeline_handler),
        )
}
