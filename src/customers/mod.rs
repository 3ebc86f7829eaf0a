//! Customer accounts.
//!
//! A customer owns projects; the project back-references returned on read
//! are resolved by scan so no stored id set can drift out of sync.

use axum::{
    extract::{Path, State},
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
pub struct Customer {
    pub id: Uuid,
    pub name: String,
    pub contact_person: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub status: CustomerStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum CustomerStatus {
    New,
    Contracted,
    Pending,
    Inactive,
}

/// Customer plus the ids of the projects referencing it.
#[derive(Debug, Clone, Serialize)]
pub struct CustomerResponse {
    #[serde(flatten)]
    pub customer: Customer,
    pub project_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCustomerRequest {
    pub name: String,
    pub contact_person: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub status: Option<CustomerStatus>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCustomerRequest {
    pub name: Option<String>,
    pub contact_person: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub status: Option<CustomerStatus>,
}

pub fn create_customer(
    docs: &mut Documents,
    req: CreateCustomerRequest,
) -> Result<Customer, ServiceError> {
    ensure_name(&req.name)?;
    let now = Utc::now();
    let customer = Customer {
        id: Uuid::new_v4(),
        name: req.name,
        contact_person: req.contact_person,
        email: req.email,
        phone: req.phone,
        address: req.address,
        status: req.status.unwrap_or(CustomerStatus::New),
        created_at: now,
        updated_at: now,
    };
    docs.customers.insert(customer.id, customer.clone());
    Ok(customer)
}

pub fn update_customer(
    docs: &mut Documents,
    customer_id: Uuid,
    req: UpdateCustomerRequest,
) -> Result<Customer, ServiceError> {
    if let Some(ref name) = req.name {
        ensure_name(name)?;
    }
    let customer = docs.customer_mut(customer_id)?;
    if let Some(name) = req.name {
        customer.name = name;
    }
    if let Some(contact_person) = req.contact_person {
        customer.contact_person = Some(contact_person);
    }
    if let Some(email) = req.email {
        customer.email = Some(email);
    }
    if let Some(phone) = req.phone {
        customer.phone = Some(phone);
    }
    if let Some(address) = req.address {
        customer.address = Some(address);
    }
    if let Some(status) = req.status {
        customer.status = status;
    }
    customer.updated_at = Utc::now();
    Ok(customer.clone())
}

/// Deleting a customer with live projects is rejected; the caller must
/// remove or reassign the projects first.
pub fn delete_customer(docs: &mut Documents, customer_id: Uuid) -> Result<(), ServiceError> {
    docs.customer(customer_id)?;
    let dependents = docs.projects_of_customer(customer_id).len();
    if dependents > 0 {
        return Err(ServiceError::Conflict(format!(
            "Customer {customer_id} still has {dependents} project(s)"
        )));
    }
    docs.customers.remove(&customer_id);
    Ok(())
}

fn with_project_ids(docs: &Documents, customer: Customer) -> CustomerResponse {
    let project_ids = docs
        .projects_of_customer(customer.id)
        .iter()
        .map(|p| p.id)
        .collect();
    CustomerResponse {
        customer,
        project_ids,
    }
}

async fn create_customer_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateCustomerRequest>,
) -> Result<Json<Customer>, ServiceError> {
    let mut docs = state.store.write().await;
    let customer = create_customer(&mut docs, req)?;
    Ok(Json(customer))
}

async fn list_customers_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<CustomerResponse>>, ServiceError> {
    let docs = state.store.read().await;
    let mut customers: Vec<Customer> = docs.customers.values().cloned().collect();
    customers.sort_by(|a, b| a.name.cmp(&b.name));
    let responses = customers
        .into_iter()
        .map(|c| with_project_ids(&docs, c))
        .collect();
    Ok(Json(responses))
}

async fn get_customer_handler(
    State(state): State<Arc<AppState>>,
    Path(customer_id): Path<Uuid>,
) -> Result<Json<CustomerResponse>, ServiceError> {
    let docs = state.store.read().await;
    let customer = docs.customer(customer_id)?.clone();
    Ok(Json(with_project_ids(&docs, customer)))
}

async fn update_customer_handler(
    State(state): State<Arc<AppState>>,
    Path(customer_id): Path<Uuid>,
    Json(req): Json<UpdateCustomerRequest>,
) -> Result<Json<Customer>, ServiceError> {
    let mut docs = state.store.write().await;
    let customer = update_customer(&mut docs, customer_id, req)?;
    Ok(Json(customer))
}

async fn delete_customer_handler(
    State(state): State<Arc<AppState>>,
    Path(customer_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let mut docs = state.store.write().await;
    delete_customer(&mut docs, customer_id)?;
    Ok(Json(serde_json::json!({"success": true})))
}

pub fn configure() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/customers", post(create_customer_handler))
        .route("/api/customers", get(list_customers_handler))
        .route("/api/customers/:customer_id", get(get_customer_handler))
        .route("/api/customers/:customer_id", put(update_customer_handler))
        .route(
            "/api/customers/:customer_id",
            delete(delete_customer_handler),
        )
}
