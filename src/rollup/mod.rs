//! Cascading rollups: Task -> Phase -> Project.
//!
//! Both aggregators are full recomputes from the child collections, never
//! incremental deltas, so re-running either on unchanged data is a no-op.
//! Callers hold the store's write guard for the whole cascade, which makes
//! the triggering write and every recompute one atomic unit.

use uuid::Uuid;

use crate::shared::error::ServiceError;
use crate::shared::store::Documents;
use crate::tasks::TaskType;

/// Recompute the derived fields of a phase from its tasks, then roll the
/// result up into the owning project.
pub fn recompute_phase(docs: &mut Documents, phase_id: Uuid) -> Result<(), ServiceError> {
    let mut task_count = 0usize;
    let mut weight_sum = 0u64;
    let mut labor_cost = 0.0f64;
    let mut material_cost = 0.0f64;
    let mut equipment_cost = 0.0f64;

    for task in docs.tasks.values().filter(|t| t.phase_id == phase_id) {
        task_count += 1;
        weight_sum += u64::from(task.status.completion_weight());
        match task.task_type {
            TaskType::Construction => labor_cost += task.estimated_cost,
            TaskType::Procurement => material_cost += task.estimated_cost,
            TaskType::Inspection => equipment_cost += task.estimated_cost,
        }
    }

    let completion = if task_count == 0 {
        0
    } else {
        (weight_sum as f64 / task_count as f64).round() as u8
    };

    let phase = docs.phase_mut(phase_id)?;
    phase.task_count = task_count;
    phase.completion = completion;
    phase.labor_cost = labor_cost;
    phase.material_cost = material_cost;
    phase.equipment_cost = equipment_cost;
    phase.actual_cost = labor_cost + material_cost + equipment_cost;
    phase.budget_variance = phase.actual_cost - phase.estimated_budget;
    let project_id = phase.project_id;

    tracing::debug!(
        %phase_id,
        task_count,
        completion,
        actual_cost = phase.actual_cost,
        "phase rollup recomputed"
    );

    recompute_project(docs, project_id)
}

/// Recompute a project's rollups from its phases. Each phase's own derived
/// cost fields are refreshed first so the project sums never read stale
/// values.
pub fn recompute_project(docs: &mut Documents, project_id: Uuid) -> Result<(), ServiceError> {
    let mut phase_count = 0usize;
    let mut task_count = 0usize;
    let mut actual_cost = 0.0f64;
    let mut completion_sum = 0u64;

    for phase in docs
        .phases
        .values_mut()
        .filter(|p| p.project_id == project_id)
    {
        phase.actual_cost = phase.labor_cost + phase.material_cost + phase.equipment_cost;
        phase.budget_variance = phase.actual_cost - phase.estimated_budget;

        phase_count += 1;
        task_count += phase.task_count;
        actual_cost += phase.actual_cost;
        completion_sum += u64::from(phase.completion);
    }

    let completion = if phase_count == 0 {
        0
    } else {
        (completion_sum as f64 / phase_count as f64).round() as u8
    };

    let project = docs.project_mut(project_id)?;
    project.phase_count = phase_count;
    project.task_count = task_count;
    project.actual_cost = actual_cost;
    project.completion = completion;
    project.budget_variance = actual_cost - project.estimated_budget;

    tracing::debug!(
        %project_id,
        phase_count,
        task_count,
        completion,
        actual_cost,
        "project rollup recomputed"
    );

    Ok(())
}
