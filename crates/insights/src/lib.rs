//! Insight orchestration
//!
//! Features:
//! - Wire contracts shared by the AI and deterministic paths
//! - Reply validation before a model answer is accepted
//! - Deterministic fallback per insight type
//! - Request counters and latency histograms via `metrics`

pub mod contracts;
pub mod fallback;
pub mod orchestrator;
pub mod request;

pub use contracts::{
    parse_reply, ChampionInsight, ChurnRisk, ContractViolation, CustomerHealthInsight,
    DealRiskInsight, HealthFactorSummary, InsightBody, InsightContract, InsightKind,
    LeadScoreInsight, NextBestActionInsight, ReplyError, ScoringFactor,
};
pub use orchestrator::{InsightOrchestrator, InsightSource, StructuredInsight};
pub use request::InsightRequest;

use dealscope_config::ConfigError;
use dealscope_llm::LlmError;
use thiserror::Error;

/// Errors surfaced to callers; model failures never appear here
#[derive(Error, Debug)]
pub enum InsightError {
    #[error("Validation error on '{field}': {message}")]
    Validation { field: String, message: String },

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl InsightError {
    /// Qualify a validation error with its position in a list
    pub fn in_list(self, list: &str, index: usize) -> Self {
        match self {
            InsightError::Validation { field, message } => InsightError::Validation {
                field: format!("{}[{}].{}", list, index, field),
                message,
            },
            other => other,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, InsightError::Validation { .. })
    }
}

impl From<dealscope_core::Error> for InsightError {
    fn from(err: dealscope_core::Error) -> Self {
        match err {
            dealscope_core::Error::Validation { field, message } => {
                InsightError::Validation { field, message }
            }
            dealscope_core::Error::Configuration(message) => InsightError::Configuration(message),
            dealscope_core::Error::Serialization(e) => InsightError::Validation {
                field: "payload".to_string(),
                message: e.to_string(),
            },
        }
    }
}

impl From<LlmError> for InsightError {
    fn from(err: LlmError) -> Self {
        InsightError::Configuration(err.to_string())
    }
}

impl From<ConfigError> for InsightError {
    fn from(err: ConfigError) -> Self {
        InsightError::Configuration(err.to_string())
    }
}
