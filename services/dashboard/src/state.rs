use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::time::Instant;

use budget_api::BudgetApi;
use budget_gateway::Gateway;
use metrics_exporter_prometheus::PrometheusHandle;

use crate::session::SessionTracker;

/// Shared application state accessible from all handlers
#[derive(Clone)]
pub struct AppState {
    pub api: BudgetApi,
    pub sessions: Arc<SessionTracker>,
    pub metrics: ServiceMetrics,
    pub prometheus: PrometheusHandle,
}

impl AppState {
    pub fn gateway(&self) -> &Gateway {
        self.api.gateway()
    }
}

/// Process-local counters behind `/health` and shutdown drain logging.
#[derive(Debug, Clone)]
pub struct ServiceMetrics {
    pub requests_total: Arc<AtomicU64>,
    pub errors_total: Arc<AtomicU64>,
    /// Requests currently being handled; reported if the drain deadline passes
    pub in_flight: Arc<AtomicU64>,
    pub started_at: Instant,
}

impl ServiceMetrics {
    pub fn new() -> Self {
        Self {
            requests_total: Arc::new(AtomicU64::new(0)),
            errors_total: Arc::new(AtomicU64::new(0)),
            in_flight: Arc::new(AtomicU64::new(0)),
            started_at: Instant::now(),
        }
    }
}
