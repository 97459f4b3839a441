//! API routes

mod auth;
mod cors;
mod extract;
mod health;
pub mod metrics;
mod types;
mod users;
mod validation;

use std::sync::Arc;

use axum::Router;

use crate::state::{AppState, MetricsHandle};

pub use auth::{RequireAdmin, RequireAuth};
pub use cors::cors_layer;
pub use extract::{ApiJson, ApiPath, ApiQuery};
pub use types::{RoleResponse, UserResponse};

/// Create the main router
///
/// Authentication and user management live under `/api`; health and
/// metrics stay at the root for probes and scrapers.
pub fn create_router(state: AppState, metrics_handle: Option<Arc<MetricsHandle>>) -> Router {
    let api = Router::new().merge(auth::routes()).merge(users::routes());

    let mut router = Router::new()
        .merge(health::routes())
        .nest("/api", api)
        .with_state(state);

    if let Some(handle) = metrics_handle {
        router = router.merge(metrics::routes(handle));
    }

    router
}
