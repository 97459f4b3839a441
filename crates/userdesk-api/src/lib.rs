//! Userdesk REST API
//!
//! Axum router for login, token refresh and user management.

pub mod error;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{cors_layer, create_router};
pub use state::{AppState, MetricsHandle, Pagination};
