use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use buildserver::api_router::configure_api_routes;
use buildserver::shared::state::AppState;

fn app() -> axum::Router {
    configure_api_routes().with_state(Arc::new(AppState::new()))
}

async fn request(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let request = match body {
        Some(b) => Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn seed_hierarchy(app: &axum::Router) -> (String, String, String) {
    let (status, customer) = request(
        app,
        "POST",
        "/api/customers",
        Some(json!({"name": "Meridian Builders"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let customer_id = customer["id"].as_str().unwrap().to_string();

    let (status, project) = request(
        app,
        "POST",
        "/api/projects",
        Some(json!({
            "customer_id": customer_id,
            "name": "Office Block",
            "estimated_budget": 50000.0,
            "start_date": "2026-02-01",
            "end_date": "2026-12-01"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let project_id = project["id"].as_str().unwrap().to_string();

    let (status, phase) = request(
        app,
        "POST",
        &format!("/api/projects/{project_id}/phases"),
        Some(json!({
            "name": "Foundation",
            "estimated_budget": 20000.0,
            "start_date": "2026-02-01",
            "end_date": "2026-04-01"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let phase_id = phase["id"].as_str().unwrap().to_string();

    (customer_id, project_id, phase_id)
}

#[tokio::test]
async fn test_task_write_is_visible_in_rollups_at_response_time() {
    let app = app();
    let (_, project_id, phase_id) = seed_hierarchy(&app).await;

    let (status, task) = request(
        &app,
        "POST",
        &format!("/api/phases/{phase_id}/tasks"),
        Some(json!({
            "name": "Pour slab",
            "task_type": "construction",
            "estimated_cost": 100.0,
            "status": "completed",
            "start_date": "2026-02-01",
            "end_date": "2026-03-01"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(task["task_type"], "construction");
    assert_eq!(task["status"], "completed");

    let (status, phase) = request(&app, "GET", &format!("/api/phases/{phase_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(phase["labor_cost"], 100.0);
    assert_eq!(phase["actual_cost"], 100.0);
    assert_eq!(phase["completion"], 100);
    assert_eq!(phase["task_count"], 1);

    let (status, project) =
        request(&app, "GET", &format!("/api/projects/{project_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(project["actual_cost"], 100.0);
    assert_eq!(project["status"], "not-started");
}

#[tokio::test]
async fn test_unknown_ids_return_404() {
    let app = app();
    let missing = uuid::Uuid::new_v4();

    let (status, body) = request(&app, "GET", &format!("/api/projects/{missing}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("not found"));

    let (status, _) = request(&app, "GET", &format!("/api/tasks/{missing}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_backwards_dates_return_400() {
    let app = app();
    let (customer_id, _, _) = seed_hierarchy(&app).await;

    let (status, body) = request(
        &app,
        "POST",
        "/api/projects",
        Some(json!({
            "customer_id": customer_id,
            "name": "Backwards",
            "estimated_budget": 1.0,
            "start_date": "2026-05-01",
            "end_date": "2026-04-01"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("precedes"));
}

#[tokio::test]
async fn test_dependency_cycle_rejected_over_http() {
    let app = app();
    let (_, project_id, phase_a) = seed_hierarchy(&app).await;

    let (_, phase) = request(
        &app,
        "POST",
        &format!("/api/projects/{project_id}/phases"),
        Some(json!({
            "name": "Framing",
            "estimated_budget": 1000.0,
            "start_date": "2026-04-01",
            "end_date": "2026-06-01"
        })),
    )
    .await;
    let phase_b = phase["id"].as_str().unwrap().to_string();

    let (status, _) = request(
        &app,
        "PUT",
        &format!("/api/phases/{phase_a}/dependencies"),
        Some(json!({"dependencies": [phase_b]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = request(
        &app,
        "PUT",
        &format!("/api/phases/{phase_b}/dependencies"),
        Some(json!({"dependencies": [phase_a]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("cycle"));
}

#[tokio::test]
async fn test_customer_delete_blocked_by_projects() {
    let app = app();
    let (customer_id, _, _) = seed_hierarchy(&app).await;

    let (status, body) = request(
        &app,
        "DELETE",
        &format!("/api/customers/{customer_id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("project"));
}

#[tokio::test]
async fn test_stats_and_timeline_views() {
    let app = app();
    let (_, project_id, phase_id) = seed_hierarchy(&app).await;

    request(
        &app,
        "POST",
        &format!("/api/phases/{phase_id}/tasks"),
        Some(json!({
            "name": "Pour slab",
            "task_type": "construction",
            "estimated_cost": 100.0,
            "status": "in-progress",
            "start_date": "2026-02-01",
            "end_date": "2026-03-01"
        })),
    )
    .await;

    let (status, stats) = request(&app, "GET", "/api/projects/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["count"], 1);
    assert_eq!(stats["total_actual_cost"], 100.0);
    assert_eq!(stats["average_completion"], 50);
    assert!(stats["by_status"].as_array().unwrap().len() == 5);

    let (status, timeline) = request(
        &app,
        "GET",
        &format!("/api/projects/{project_id}/timeline"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(timeline["project"]["id"], project_id.as_str());
    let phases = timeline["phases"].as_array().unwrap();
    assert_eq!(phases.len(), 1);
    assert_eq!(phases[0]["tasks"].as_array().unwrap().len(), 1);
    assert_eq!(phases[0]["completion"], 50);
}

#[tokio::test]
async fn test_allocation_flow_over_http() {
    let app = app();
    let (_, _, phase_id) = seed_hierarchy(&app).await;

    let (_, task) = request(
        &app,
        "POST",
        &format!("/api/phases/{phase_id}/tasks"),
        Some(json!({
            "name": "Pour slab",
            "task_type": "construction",
            "estimated_cost": 100.0,
            "start_date": "2026-02-01",
            "end_date": "2026-03-01"
        })),
    )
    .await;
    let task_id = task["id"].as_str().unwrap().to_string();

    let (status, item) = request(
        &app,
        "POST",
        "/api/inventory",
        Some(json!({
            "name": "Cement",
            "unit": "bag",
            "unit_value": 100.0,
            "price_per_unit": 12.5
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(item["unit"], "bag");
    assert_eq!(item["total_price"], 1250.0);
    let item_id = item["id"].as_str().unwrap().to_string();

    let (status, allocation) = request(
        &app,
        "POST",
        &format!("/api/tasks/{task_id}/allocations"),
        Some(json!({"inventory_id": item_id, "allocated_value": 40.0})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let allocation_id = allocation["id"].as_str().unwrap().to_string();

    let (status, item) = request(&app, "GET", &format!("/api/inventory/{item_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(item["remaining_value"], 60.0);

    let (status, body) = request(
        &app,
        "POST",
        &format!("/api/tasks/{task_id}/allocations"),
        Some(json!({"inventory_id": item_id, "allocated_value": 70.0})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("remaining"));

    let (status, allocation) = request(
        &app,
        "PUT",
        &format!("/api/allocations/{allocation_id}/consume"),
        Some(json!({"consumed_value": 40.0})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(allocation["remaining_value"], 0.0);

    let (status, _) = request(
        &app,
        "DELETE",
        &format!("/api/allocations/{allocation_id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, item) = request(&app, "GET", &format!("/api/inventory/{item_id}"), None).await;
    assert_eq!(item["remaining_value"], 60.0);
}
