//! Prometheus metrics

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use dealscope_config::constants::metrics as metric_names;

use crate::state::AppState;

/// Install the global Prometheus recorder
///
/// Returns `None` if a recorder is already installed.
pub fn init_metrics() -> Option<PrometheusHandle> {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            metrics::describe_counter!(
                metric_names::INSIGHT_REQUESTS_TOTAL,
                "Insight requests served, by kind and source"
            );
            metrics::describe_counter!(
                metric_names::INSIGHT_FALLBACKS_TOTAL,
                "LLM insight attempts answered deterministically, by kind and reason"
            );
            metrics::describe_histogram!(
                metric_names::INSIGHT_LATENCY_SECONDS,
                metrics::Unit::Seconds,
                "End-to-end insight latency"
            );
            Some(handle)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to install Prometheus recorder");
            None
        }
    }
}

/// GET /metrics
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.metrics_handle() {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::NOT_FOUND, "metrics disabled".to_string()),
    }
}
