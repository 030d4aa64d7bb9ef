//! LLM collaborator integration
//!
//! Features:
//! - `LlmBackend` trait object injected into the insight orchestrator
//! - Claude (Anthropic Messages API) and OpenAI-compatible chat backends
//! - Provider factory driven by `LlmSettings`
//! - Prompt building for structured JSON replies

pub mod backend;
pub mod claude;
pub mod factory;
pub mod prompt;

pub use backend::{FinishReason, GenerationResult, LlmBackend, OpenAIBackend, OpenAIConfig};
pub use claude::{ClaudeBackend, ClaudeConfig};
pub use factory::{LlmFactory, LlmProvider, LlmProviderConfig};
pub use prompt::{strip_code_fence, Message, PromptBuilder, Role};

use thiserror::Error;

/// LLM errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout")]
    Timeout,

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Network(err.to_string())
        }
    }
}
