//! API router.
//!
//! Combines the routers of every domain module into the application's
//! REST surface.

use axum::Router;
use std::sync::Arc;

use crate::shared::state::AppState;

pub fn configure_api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(crate::customers::configure())
        .merge(crate::projects::configure())
        .merge(crate::phases::configure())
        .merge(crate::tasks::configure())
        .merge(crate::units::configure())
        .merge(crate::inventory::configure())
        .merge(crate::allocations::configure())
}
