use buildserver::customers::{create_customer, CreateCustomerRequest};
use buildserver::phases::{create_phase, set_dependencies, CreatePhaseRequest};
use buildserver::projects::{create_project, CreateProjectRequest};
use buildserver::shared::error::ServiceError;
use buildserver::shared::store::Documents;
use chrono::NaiveDate;
use uuid::Uuid;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn seed_project(docs: &mut Documents) -> Uuid {
    let customer = create_customer(
        docs,
        CreateCustomerRequest {
            name: "Meridian Builders".into(),
            contact_person: None,
            email: None,
            phone: None,
            address: None,
            status: None,
        },
    )
    .unwrap();
    create_project(
        docs,
        CreateProjectRequest {
            customer_id: customer.id,
            name: "Office Block".into(),
            description: None,
            estimated_budget: 50_000.0,
            start_date: date(2026, 2, 1),
            end_date: date(2026, 12, 1),
            status: None,
        },
    )
    .unwrap()
    .id
}

fn seed_phase(docs: &mut Documents, project_id: Uuid, name: &str) -> Uuid {
    create_phase(
        docs,
        project_id,
        CreatePhaseRequest {
            name: name.into(),
            estimated_budget: 1_000.0,
            start_date: date(2026, 2, 1),
            end_date: date(2026, 4, 1),
            status: None,
            dependencies: None,
        },
    )
    .unwrap()
    .id
}

#[test]
fn test_chain_is_accepted_cycle_is_not() {
    let mut docs = Documents::default();
    let project_id = seed_project(&mut docs);
    let a = seed_phase(&mut docs, project_id, "Groundwork");
    let b = seed_phase(&mut docs, project_id, "Framing");
    let c = seed_phase(&mut docs, project_id, "Roofing");

    set_dependencies(&mut docs, a, vec![b]).unwrap();
    set_dependencies(&mut docs, b, vec![c]).unwrap();

    let err = set_dependencies(&mut docs, c, vec![a]).unwrap_err();
    assert!(matches!(err, ServiceError::CircularDependency(_)));
    assert!(docs.phases[&c].dependencies.is_empty());
}

#[test]
fn test_order_is_preserved_verbatim() {
    let mut docs = Documents::default();
    let project_id = seed_project(&mut docs);
    let a = seed_phase(&mut docs, project_id, "Groundwork");
    let b = seed_phase(&mut docs, project_id, "Framing");
    let c = seed_phase(&mut docs, project_id, "Roofing");
    let d = seed_phase(&mut docs, project_id, "Fit-out");

    let phase = set_dependencies(&mut docs, d, vec![c, a, b]).unwrap();
    assert_eq!(phase.dependencies, vec![c, a, b]);
    assert_eq!(docs.phases[&d].dependencies, vec![c, a, b]);
}

#[test]
fn test_cross_project_dependency_rejected() {
    let mut docs = Documents::default();
    let project_id = seed_project(&mut docs);
    let other_project_id = seed_project(&mut docs);
    let a = seed_phase(&mut docs, project_id, "Groundwork");
    let foreign = seed_phase(&mut docs, other_project_id, "Groundwork");

    let err = set_dependencies(&mut docs, a, vec![foreign]).unwrap_err();
    assert!(matches!(err, ServiceError::InvalidDependency(_)));
    assert!(docs.phases[&a].dependencies.is_empty());
}

#[test]
fn test_replacing_dependencies_can_break_cycle_risk() {
    let mut docs = Documents::default();
    let project_id = seed_project(&mut docs);
    let a = seed_phase(&mut docs, project_id, "Groundwork");
    let b = seed_phase(&mut docs, project_id, "Framing");

    set_dependencies(&mut docs, a, vec![b]).unwrap();
    // replacing a's list removes the old edge, so b -> a then becomes legal
    set_dependencies(&mut docs, a, vec![]).unwrap();
    set_dependencies(&mut docs, b, vec![a]).unwrap();
    assert_eq!(docs.phases[&b].dependencies, vec![a]);
}

#[test]
fn test_deleted_phase_is_dropped_from_lists() {
    let mut docs = Documents::default();
    let project_id = seed_project(&mut docs);
    let a = seed_phase(&mut docs, project_id, "Groundwork");
    let b = seed_phase(&mut docs, project_id, "Framing");

    set_dependencies(&mut docs, b, vec![a]).unwrap();
    buildserver::phases::delete_phase(&mut docs, a).unwrap();
    assert!(docs.phases[&b].dependencies.is_empty());
}
