//! In-memory document store.
//!
//! All collections live in a single `Documents` struct behind one
//! `RwLock`. A logical write (an entity mutation plus every cascading
//! recompute it triggers, or a ledger adjustment plus its allocation
//! record) runs under a single write guard, so partial commits are not
//! possible and quantity checks are check-and-decrement atomic.

use std::collections::HashMap;

use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use crate::allocations::InventoryAllocation;
use crate::customers::Customer;
use crate::inventory::InventoryItem;
use crate::phases::Phase;
use crate::projects::Project;
use crate::shared::error::ServiceError;
use crate::tasks::Task;
use crate::units::CustomUnit;

#[derive(Debug, Default)]
pub struct Documents {
    pub customers: HashMap<Uuid, Customer>,
    pub projects: HashMap<Uuid, Project>,
    pub phases: HashMap<Uuid, Phase>,
    pub tasks: HashMap<Uuid, Task>,
    pub inventory: HashMap<Uuid, InventoryItem>,
    pub allocations: HashMap<Uuid, InventoryAllocation>,
    pub units: HashMap<Uuid, CustomUnit>,
}

impl Documents {
    pub fn customer(&self, id: Uuid) -> Result<&Customer, ServiceError> {
        self.customers
            .get(&id)
            .ok_or_else(|| ServiceError::NotFound(format!("Customer {id} not found")))
    }

    pub fn customer_mut(&mut self, id: Uuid) -> Result<&mut Customer, ServiceError> {
        self.customers
            .get_mut(&id)
            .ok_or_else(|| ServiceError::NotFound(format!("Customer {id} not found")))
    }

    pub fn project(&self, id: Uuid) -> Result<&Project, ServiceError> {
        self.projects
            .get(&id)
            .ok_or_else(|| ServiceError::NotFound(format!("Project {id} not found")))
    }

    pub fn project_mut(&mut self, id: Uuid) -> Result<&mut Project, ServiceError> {
        self.projects
            .get_mut(&id)
            .ok_or_else(|| ServiceError::NotFound(format!("Project {id} not found")))
    }

    pub fn phase(&self, id: Uuid) -> Result<&Phase, ServiceError> {
        self.phases
            .get(&id)
            .ok_or_else(|| ServiceError::NotFound(format!("Phase {id} not found")))
    }

    pub fn phase_mut(&mut self, id: Uuid) -> Result<&mut Phase, ServiceError> {
        self.phases
            .get_mut(&id)
            .ok_or_else(|| ServiceError::NotFound(format!("Phase {id} not found")))
    }

    pub fn task(&self, id: Uuid) -> Result<&Task, ServiceError> {
        self.tasks
            .get(&id)
            .ok_or_else(|| ServiceError::NotFound(format!("Task {id} not found")))
    }

    pub fn task_mut(&mut self, id: Uuid) -> Result<&mut Task, ServiceError> {
        self.tasks
            .get_mut(&id)
            .ok_or_else(|| ServiceError::NotFound(format!("Task {id} not found")))
    }

    pub fn inventory_item(&self, id: Uuid) -> Result<&InventoryItem, ServiceError> {
        self.inventory
            .get(&id)
            .ok_or_else(|| ServiceError::NotFound(format!("Inventory item {id} not found")))
    }

    pub fn inventory_item_mut(&mut self, id: Uuid) -> Result<&mut InventoryItem, ServiceError> {
        self.inventory
            .get_mut(&id)
            .ok_or_else(|| ServiceError::NotFound(format!("Inventory item {id} not found")))
    }

    pub fn allocation(&self, id: Uuid) -> Result<&InventoryAllocation, ServiceError> {
        self.allocations
            .get(&id)
            .ok_or_else(|| ServiceError::NotFound(format!("Allocation {id} not found")))
    }

    pub fn allocation_mut(&mut self, id: Uuid) -> Result<&mut InventoryAllocation, ServiceError> {
        self.allocations
            .get_mut(&id)
            .ok_or_else(|| ServiceError::NotFound(format!("Allocation {id} not found")))
    }

    pub fn custom_unit(&self, id: Uuid) -> Result<&CustomUnit, ServiceError> {
        self.units
            .get(&id)
            .ok_or_else(|| ServiceError::NotFound(format!("Custom unit {id} not found")))
    }

    pub fn custom_unit_mut(&mut self, id: Uuid) -> Result<&mut CustomUnit, ServiceError> {
        self.units
            .get_mut(&id)
            .ok_or_else(|| ServiceError::NotFound(format!("Custom unit {id} not found")))
    }

    pub fn phases_of_project(&self, project_id: Uuid) -> Vec<&Phase> {
        let mut phases: Vec<&Phase> = self
            .phases
            .values()
            .filter(|p| p.project_id == project_id)
            .collect();
        phases.sort_by(|a, b| a.start_date.cmp(&b.start_date).then(a.name.cmp(&b.name)));
        phases
    }

    pub fn tasks_of_phase(&self, phase_id: Uuid) -> Vec<&Task> {
        let mut tasks: Vec<&Task> = self
            .tasks
            .values()
            .filter(|t| t.phase_id == phase_id)
            .collect();
        tasks.sort_by(|a, b| a.start_date.cmp(&b.start_date).then(a.name.cmp(&b.name)));
        tasks
    }

    pub fn projects_of_customer(&self, customer_id: Uuid) -> Vec<&Project> {
        let mut projects: Vec<&Project> = self
            .projects
            .values()
            .filter(|p| p.customer_id == customer_id)
            .collect();
        projects.sort_by(|a, b| a.start_date.cmp(&b.start_date).then(a.name.cmp(&b.name)));
        projects
    }

    pub fn allocations_of_task(&self, task_id: Uuid) -> Vec<&InventoryAllocation> {
        self.allocations
            .values()
            .filter(|a| a.task_id == task_id)
            .collect()
    }

    pub fn count_allocations_of_inventory(&self, inventory_id: Uuid) -> usize {
        self.allocations
            .values()
            .filter(|a| a.inventory_id == inventory_id)
            .count()
    }
}

pub struct Store {
    docs: RwLock<Documents>,
}

impl Store {
    pub fn new() -> Self {
        Self {
            docs: RwLock::new(Documents::default()),
        }
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, Documents> {
        self.docs.read().await
    }

    pub async fn write(&self) -> RwLockWriteGuard<'_, Documents> {
        self.docs.write().await
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}
