//! Application State
//!
//! Shared state across all handlers.

use metrics_exporter_prometheus::PrometheusHandle;
use parking_lot::RwLock;
use std::sync::Arc;

use dealscope_config::{load_settings, Settings};
use dealscope_insights::InsightOrchestrator;

use crate::ServerError;

/// Application state
#[derive(Clone)]
pub struct AppState {
    /// Configuration, swapped on reload
    pub config: Arc<RwLock<Settings>>,
    /// Rebuilt from settings on reload; handlers clone the inner `Arc`
    orchestrator: Arc<RwLock<Arc<InsightOrchestrator>>>,
    /// Prometheus render handle, absent when metrics are disabled
    metrics: Option<PrometheusHandle>,
    /// Environment name for config reload
    env: Option<String>,
}

impl AppState {
    pub fn new(config: Settings, orchestrator: InsightOrchestrator) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            orchestrator: Arc::new(RwLock::new(Arc::new(orchestrator))),
            metrics: None,
            env: None,
        }
    }

    /// Deterministic-only state, used by tests and when the LLM is disabled
    pub fn offline(config: Settings) -> Self {
        Self::new(config, InsightOrchestrator::offline())
    }

    pub fn with_env(mut self, env: Option<String>) -> Self {
        self.env = env;
        self
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    pub fn orchestrator(&self) -> Arc<InsightOrchestrator> {
        self.orchestrator.read().clone()
    }

    pub fn metrics_handle(&self) -> Option<&PrometheusHandle> {
        self.metrics.as_ref()
    }

    /// Get a read guard to the current configuration
    pub fn get_config(&self) -> parking_lot::RwLockReadGuard<'_, Settings> {
        self.config.read()
    }

    /// Reload settings from disk and rebuild the orchestrator
    ///
    /// Server settings (port, CORS) only apply at startup.
    pub fn reload_config(&self) -> Result<(), ServerError> {
        let settings = load_settings(self.env.as_deref())?;
        let orchestrator = InsightOrchestrator::from_settings(&settings)?;

        tracing::info!(
            ai_enabled = orchestrator.is_ai_enabled(),
            lead_rules = orchestrator.lead_rules().len(),
            "Configuration reloaded"
        );

        *self.orchestrator.write() = Arc::new(orchestrator);
        *self.config.write() = settings;
        Ok(())
    }
}
