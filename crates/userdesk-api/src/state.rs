//! Application state

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;
use userdesk_auth::{AuthGuard, Authenticator, TokenManager};
use userdesk_db::Database;

/// Handle used to render the Prometheus scrape output
pub type MetricsHandle = PrometheusHandle;

/// Page size limits for list endpoints
#[derive(Debug, Clone, Copy)]
pub struct Pagination {
    pub default_page_size: i64,
    pub max_page_size: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            default_page_size: 100,
            max_page_size: 100,
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub tokens: Arc<TokenManager>,
    pub authenticator: Authenticator,
    pub guard: AuthGuard,
    pub pagination: Pagination,
}

impl AppState {
    pub fn new(db: Database, tokens: Arc<TokenManager>, pagination: Pagination) -> Self {
        Self {
            authenticator: Authenticator::new(db.clone(), tokens.clone()),
            guard: AuthGuard::new(db.clone(), tokens.clone()),
            db,
            tokens,
            pagination,
        }
    }
}
