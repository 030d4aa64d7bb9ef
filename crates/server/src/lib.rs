//! Deal Insight Server
//!
//! HTTP endpoints for lead, deal and customer insights, MEDDPICC
//! qualification and customer health advisories.

pub mod http;
pub mod metrics;
pub mod state;

pub use crate::http::create_router;
pub use crate::metrics::init_metrics;
pub use crate::state::AppState;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use dealscope_config::ConfigError;
use dealscope_insights::InsightError;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Validation error on '{field}': {message}")]
    Validation { field: String, message: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ServerError> for StatusCode {
    fn from(err: ServerError) -> Self {
        match err {
            ServerError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let field = match &self {
            ServerError::Validation { field, .. } => Some(field.clone()),
            _ => None,
        };
        let status = StatusCode::from(self);
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), "{}", message);
        }
        (
            status,
            Json(serde_json::json!({
                "error": message,
                "field": field,
            })),
        )
            .into_response()
    }
}

impl From<dealscope_core::Error> for ServerError {
    fn from(err: dealscope_core::Error) -> Self {
        match err {
            dealscope_core::Error::Validation { field, message } => {
                ServerError::Validation { field, message }
            }
            dealscope_core::Error::Configuration(message) => ServerError::Configuration(message),
            dealscope_core::Error::Serialization(e) => ServerError::InvalidRequest(e.to_string()),
        }
    }
}

impl From<InsightError> for ServerError {
    fn from(err: InsightError) -> Self {
        match err {
            InsightError::Validation { field, message } => ServerError::Validation { field, message },
            InsightError::Configuration(message) => ServerError::Configuration(message),
        }
    }
}

impl From<ConfigError> for ServerError {
    fn from(err: ConfigError) -> Self {
        ServerError::Configuration(err.to_string())
    }
}
