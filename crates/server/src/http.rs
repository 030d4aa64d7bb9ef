//! HTTP Endpoints
//!
//! REST API for insights, qualification and customer health.

use axum::{
    extract::{Json, State},
    http::{HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use dealscope_core::{Customer, QualificationProfile, Record, ScoringRule};
use dealscope_insights::InsightRequest;
use dealscope_scoring::{
    ChurnAlert, CustomerHealthRecord, HealthScoringEngine, QualificationAssessment,
    QualificationAssessor, RenewalPrediction, StageGate, UpsellOpportunity,
};

use crate::metrics::metrics_handler;
use crate::state::AppState;
use crate::ServerError;

/// Response header naming the path that served an insight
pub const INSIGHT_SOURCE_HEADER: &str = "x-insight-source";

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let config = state.get_config();
    let cors_layer = build_cors_layer(&config.server.cors_origins, config.server.cors_enabled);
    let timeout = Duration::from_secs(config.server.timeout_seconds);
    drop(config);

    Router::new()
        // Insights (AI with deterministic fallback)
        .route("/api/insights/lead-score", post(lead_score))
        .route("/api/insights/deal-risk", post(deal_risk))
        .route("/api/insights/next-best-action", post(next_best_action))
        .route("/api/insights/champions", post(champions))
        .route("/api/insights/customer-health", post(customer_health))
        // Deterministic endpoints
        .route("/api/qualification/assess", post(assess_qualification))
        .route("/api/qualification/gate", post(gate_stage))
        .route("/api/health/renewal", post(predict_renewal))
        .route("/api/health/churn", post(churn_risk))
        .route("/api/health/upsell", post(upsell))
        .route("/api/rules", get(list_rules))
        // Health check
        .route("/health", get(health_check))
        // Prometheus metrics
        .route("/metrics", get(metrics_handler))
        // Admin
        .route("/admin/reload-config", post(reload_config))
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
}

/// Build CORS layer from configured origins
///
/// - disabled: no cross-origin access
/// - enabled with no origins: any origin
/// - otherwise the listed origins
fn build_cors_layer(origins: &[String], enabled: bool) -> CorsLayer {
    if !enabled {
        return CorsLayer::new();
    }

    let methods = [Method::GET, Method::POST, Method::OPTIONS];

    if origins.is_empty() {
        tracing::info!("No CORS origins configured, allowing any origin");
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any);
    }

    let parsed_origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!("Invalid CORS origin: {}", origin);
                None
            })
        })
        .collect();

    if parsed_origins.is_empty() {
        tracing::error!("All configured CORS origins are invalid, denying cross-origin requests");
        return CorsLayer::new();
    }

    tracing::info!("CORS configured with {} origins", parsed_origins.len());
    CorsLayer::new()
        .allow_origin(parsed_origins)
        .allow_methods(methods)
        .allow_headers(Any)
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Body carrying one record
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordBody {
    record: Record,
    /// Reference date for day counts; today when absent
    #[serde(default)]
    as_of: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LeadScoreBody {
    record: Record,
    #[serde(default)]
    rules: Option<Vec<ScoringRule>>,
}

#[derive(Debug, Deserialize)]
struct ContactsBody {
    contacts: Vec<Record>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GateBody {
    record: Record,
    target_stage: String,
}

async fn serve_insight(
    state: &AppState,
    request: InsightRequest,
    as_of: Option<NaiveDate>,
) -> Result<Response, ServerError> {
    let orchestrator = state.orchestrator();
    let insight = orchestrator
        .get_insight_as_of(&request, as_of.unwrap_or_else(today))
        .await?;

    Ok((
        [(INSIGHT_SOURCE_HEADER, insight.source.as_str())],
        Json(insight.body),
    )
        .into_response())
}

/// POST /api/insights/lead-score
async fn lead_score(
    State(state): State<AppState>,
    Json(body): Json<LeadScoreBody>,
) -> Result<Response, ServerError> {
    let request = InsightRequest::LeadScore {
        record: body.record,
        rules: body.rules,
    };
    serve_insight(&state, request, None).await
}

/// POST /api/insights/deal-risk
async fn deal_risk(
    State(state): State<AppState>,
    Json(body): Json<RecordBody>,
) -> Result<Response, ServerError> {
    let request = InsightRequest::DealRisk {
        record: body.record,
    };
    serve_insight(&state, request, body.as_of).await
}

/// POST /api/insights/next-best-action
async fn next_best_action(
    State(state): State<AppState>,
    Json(body): Json<RecordBody>,
) -> Result<Response, ServerError> {
    let request = InsightRequest::NextBestAction {
        record: body.record,
    };
    serve_insight(&state, request, body.as_of).await
}

/// POST /api/insights/champions
async fn champions(
    State(state): State<AppState>,
    Json(body): Json<ContactsBody>,
) -> Result<Response, ServerError> {
    let request = InsightRequest::Champions {
        contacts: body.contacts,
    };
    serve_insight(&state, request, None).await
}

/// POST /api/insights/customer-health
async fn customer_health(
    State(state): State<AppState>,
    Json(body): Json<RecordBody>,
) -> Result<Response, ServerError> {
    let request = InsightRequest::CustomerHealth {
        record: body.record,
    };
    serve_insight(&state, request, body.as_of).await
}

/// POST /api/qualification/assess
async fn assess_qualification(
    Json(body): Json<RecordBody>,
) -> Result<Json<QualificationAssessment>, ServerError> {
    let profile = QualificationProfile::from_record(&body.record)?;
    Ok(Json(QualificationAssessor::new().assess(&profile)))
}

/// POST /api/qualification/gate
async fn gate_stage(Json(body): Json<GateBody>) -> Result<Json<StageGate>, ServerError> {
    if body.target_stage.trim().is_empty() {
        return Err(ServerError::Validation {
            field: "targetStage".to_string(),
            message: "must not be blank".to_string(),
        });
    }
    let profile = QualificationProfile::from_record(&body.record)?;
    Ok(Json(
        QualificationAssessor::new().gate_stage(&profile, &body.target_stage),
    ))
}

fn scored_customer(record: &Record) -> Result<(Customer, CustomerHealthRecord), ServerError> {
    let customer = Customer::try_from(record)?;
    let health = HealthScoringEngine::new().score(&customer.metrics)?;
    Ok((customer, health))
}

/// POST /api/health/renewal
async fn predict_renewal(
    Json(body): Json<RecordBody>,
) -> Result<Json<RenewalPrediction>, ServerError> {
    let (customer, health) = scored_customer(&body.record)?;
    let prediction = HealthScoringEngine::new().predict_renewal(
        &health,
        &customer.contract,
        body.as_of.unwrap_or_else(today),
    )?;
    Ok(Json(prediction))
}

/// POST /api/health/churn
///
/// `null` when the customer is at low risk.
async fn churn_risk(Json(body): Json<RecordBody>) -> Result<Json<Option<ChurnAlert>>, ServerError> {
    let (_, health) = scored_customer(&body.record)?;
    Ok(Json(HealthScoringEngine::new().assess_churn_risk(&health)))
}

/// POST /api/health/upsell
async fn upsell(
    Json(body): Json<RecordBody>,
) -> Result<Json<Vec<UpsellOpportunity>>, ServerError> {
    let (customer, health) = scored_customer(&body.record)?;
    Ok(Json(
        HealthScoringEngine::new().find_upsell(&health, &customer.usage),
    ))
}

/// GET /api/rules
async fn list_rules(State(state): State<AppState>) -> Json<Vec<ScoringRule>> {
    Json(state.orchestrator().lead_rules().to_vec())
}

/// GET /health
async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    let orchestrator = state.orchestrator();

    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "checks": {
            "llm": {
                "status": if orchestrator.is_ai_enabled() { "enabled" } else { "disabled" },
                "model": orchestrator.model_name(),
            },
            "lead_rules": {
                "count": orchestrator.lead_rules().len(),
            },
            "metrics": {
                "status": if state.metrics_handle().is_some() { "ok" } else { "disabled" },
            },
        }
    }))
}

/// POST /admin/reload-config
///
/// Reloads settings and the lead rule catalogue, and rebuilds the LLM
/// backend. Server settings (port, CORS, timeout) only apply at startup.
async fn reload_config(State(state): State<AppState>) -> impl IntoResponse {
    match state.reload_config() {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "success",
                "message": "Configuration reloaded successfully"
            })),
        ),
        Err(e) => {
            tracing::error!("Config reload failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "status": "error",
                    "message": e.to_string()
                })),
            )
        }
    }
}
