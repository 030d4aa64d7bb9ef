//! Core error type shared by the scoring and insight crates

use thiserror::Error;

/// Core errors
#[derive(Error, Debug)]
pub enum Error {
    /// Caller-supplied input that the deterministic path cannot score
    #[error("Validation error on '{field}': {message}")]
    Validation { field: String, message: String },

    /// Missing credential or endpoint for an external collaborator
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Build a validation error for a named field
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Whether this error was caused by caller input
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
