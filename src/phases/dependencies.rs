//! Phase dependency validation.
//!
//! Dependencies are restricted to phases of the same project and must
//! stay acyclic. Cycle detection is a DFS with explicit on-path marking;
//! the candidate list stands in for the edited phase's stored edges so a
//! rejected edit never observes its own proposal as persisted state.

use std::collections::HashMap;

use uuid::Uuid;

use crate::shared::error::ServiceError;
use crate::shared::store::Documents;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    OnPath,
    Done,
}

/// Validate a proposed dependency list for `phase_id`. The stored
/// dependencies are untouched; callers persist the candidates verbatim
/// (insertion order preserved) only after this returns `Ok`.
pub fn validate(
    docs: &Documents,
    phase_id: Uuid,
    candidates: &[Uuid],
) -> Result<(), ServiceError> {
    let phase = docs.phase(phase_id)?;
    let project_id = phase.project_id;

    for &dep in candidates {
        if dep == phase_id {
            return Err(ServiceError::CircularDependency(format!(
                "Phase {phase_id} cannot depend on itself"
            )));
        }
        match docs.phases.get(&dep) {
            Some(p) if p.project_id == project_id => {}
            _ => {
                return Err(ServiceError::InvalidDependency(format!(
                    "Phase {dep} is not part of project {project_id}"
                )))
            }
        }
    }

    let mut marks: HashMap<Uuid, Mark> = HashMap::new();
    if visit(docs, phase_id, candidates, phase_id, &mut marks) {
        return Err(ServiceError::CircularDependency(format!(
            "Proposed dependencies of phase {phase_id} close a cycle"
        )));
    }
    Ok(())
}

fn visit(
    docs: &Documents,
    edited: Uuid,
    candidates: &[Uuid],
    node: Uuid,
    marks: &mut HashMap<Uuid, Mark>,
) -> bool {
    match marks.get(&node) {
        Some(Mark::OnPath) => return true,
        Some(Mark::Done) => return false,
        None => {}
    }
    marks.insert(node, Mark::OnPath);

    let edges: &[Uuid] = if node == edited {
        candidates
    } else {
        docs.phases
            .get(&node)
            .map(|p| p.dependencies.as_slice())
            .unwrap_or(&[])
    };
    for &next in edges {
        if visit(docs, edited, candidates, next, marks) {
            return true;
        }
    }

    marks.insert(node, Mark::Done);
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::customers::{create_customer, CreateCustomerRequest};
    use crate::phases::{create_phase, CreatePhaseRequest};
    use crate::projects::{create_project, CreateProjectRequest};
    use chrono::NaiveDate;

    fn seed(docs: &mut Documents) -> (Uuid, Uuid, Uuid, Uuid) {
        let customer = create_customer(
            docs,
            CreateCustomerRequest {
                name: "Harbor Construction".into(),
                contact_person: None,
                email: None,
                phone: None,
                address: None,
                status: None,
            },
        )
        .unwrap();
        let project = create_project(
            docs,
            CreateProjectRequest {
                customer_id: customer.id,
                name: "Warehouse".into(),
                description: None,
                estimated_budget: 100_000.0,
                start_date: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
                end_date: NaiveDate::from_ymd_opt(2026, 9, 30).unwrap(),
                status: None,
            },
        )
        .unwrap();
        let mut ids = Vec::new();
        for name in ["Groundwork", "Framing", "Roofing"] {
            let phase = create_phase(
                docs,
                project.id,
                CreatePhaseRequest {
                    name: name.into(),
                    estimated_budget: 10_000.0,
                    start_date: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
                    end_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
                    status: None,
                    dependencies: None,
                },
            )
            .unwrap();
            ids.push(phase.id);
        }
        (project.id, ids[0], ids[1], ids[2])
    }

    #[test]
    fn test_rejects_self_reference() {
        let mut docs = Documents::default();
        let (_, a, _, _) = seed(&mut docs);
        let err = validate(&docs, a, &[a]).unwrap_err();
        assert!(matches!(err, ServiceError::CircularDependency(_)));
    }

    #[test]
    fn test_rejects_transitive_cycle() {
        let mut docs = Documents::default();
        let (_, a, b, c) = seed(&mut docs);
        // a -> b, b -> c
        validate(&docs, a, &[b]).unwrap();
        docs.phases.get_mut(&a).unwrap().dependencies = vec![b];
        validate(&docs, b, &[c]).unwrap();
        docs.phases.get_mut(&b).unwrap().dependencies = vec![c];
        // c -> a would close the loop
        let err = validate(&docs, c, &[a]).unwrap_err();
        assert!(matches!(err, ServiceError::CircularDependency(_)));
        assert!(docs.phases[&c].dependencies.is_empty());
    }

    #[test]
    fn test_rejects_foreign_phase() {
        let mut docs = Documents::default();
        let (_, a, _, _) = seed(&mut docs);
        let (_, other_a, _, _) = seed(&mut docs);
        let err = validate(&docs, a, &[other_a]).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidDependency(_)));
    }

    #[test]
    fn test_accepts_diamond() {
        let mut docs = Documents::default();
        let (_, a, b, c) = seed(&mut docs);
        docs.phases.get_mut(&b).unwrap().dependencies = vec![a];
        // c -> {b, a} reaches a along two paths without closing a cycle
        validate(&docs, c, &[b, a]).unwrap();
    }
}
