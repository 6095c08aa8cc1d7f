//! Shared application state for the HTTP server.

use std::sync::Arc;

use forge::metrics::Metrics;
use forge::service::GenerationService;

/// Shared state accessible from all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<GenerationService>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(service: Arc<GenerationService>, metrics: Arc<Metrics>) -> Self {
        Self { service, metrics }
    }
}
