use std::sync::Arc;

use crate::shared::store::Store;

pub struct AppState {
    pub store: Arc<Store>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            store: Arc::new(Store::new()),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for AppState {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}
