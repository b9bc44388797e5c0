//! Application state shared across handlers

use crate::config::AppConfig;
use crate::metrics::ServiceMetrics;
use crate::models::InferenceService;
use std::sync::Arc;

/// Read-only after startup; handlers receive it as `Arc<AppState>`.
pub struct AppState {
    pub service: Arc<InferenceService>,
    pub metrics: Arc<ServiceMetrics>,
    pub api_version: String,
    pub threshold: f64,
    pub description: String,
}

impl AppState {
    pub fn new(
        service: Arc<InferenceService>,
        metrics: Arc<ServiceMetrics>,
        config: &AppConfig,
    ) -> Self {
        Self {
            service,
            metrics,
            api_version: config.server.api_version.clone(),
            threshold: config.prediction.threshold,
            description: config.prediction.description.clone(),
        }
    }

    /// State with default configuration around `service`.
    pub fn with_service(service: InferenceService) -> Self {
        let config = AppConfig::default();
        let metrics = Arc::new(ServiceMetrics::new(config.prediction.threshold));
        Self::new(Arc::new(service), metrics, &config)
    }
}
