//! LLM Factory
//!
//! Creates the LLM backend named in settings. The backend is built once at
//! startup and handed to the orchestrator as a trait object.
//!
//! ## Supported Providers
//! - **Claude**: Anthropic Messages API
//! - **OpenAI**: OpenAI or any OpenAI-compatible chat completions server
//!
//! ## Example
//! ```ignore
//! let config = LlmProviderConfig::claude("your-api-key").with_model("haiku");
//! let llm = LlmFactory::create(&config)?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use dealscope_config::constants::{endpoints, llm, timeouts};
use dealscope_config::LlmSettings;

use crate::backend::{LlmBackend, OpenAIBackend, OpenAIConfig};
use crate::claude::{ClaudeBackend, ClaudeConfig};
use crate::LlmError;

/// LLM provider type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LlmProvider {
    #[default]
    Claude,
    OpenAI,
}

impl LlmProvider {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "claude" | "anthropic" => Some(LlmProvider::Claude),
            "openai" | "gpt" | "openai-compatible" => Some(LlmProvider::OpenAI),
            _ => None,
        }
    }

    fn key_env(&self) -> &'static str {
        match self {
            LlmProvider::Claude => llm::ANTHROPIC_KEY_ENV,
            LlmProvider::OpenAI => llm::OPENAI_KEY_ENV,
        }
    }
}

/// Unified LLM provider configuration
#[derive(Debug, Clone)]
pub struct LlmProviderConfig {
    pub provider: LlmProvider,
    /// Falls back to the provider's env var at build time
    pub api_key: Option<String>,
    pub endpoint: Option<String>,
    pub model: String,
    pub max_tokens: usize,
    pub temperature: f32,
    pub timeout: Duration,
}

impl Default for LlmProviderConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Claude,
            api_key: None,
            endpoint: None,
            model: llm::DEFAULT_CLAUDE_MODEL.to_string(),
            max_tokens: llm::DEFAULT_MAX_TOKENS,
            temperature: llm::DEFAULT_TEMPERATURE,
            timeout: Duration::from_millis(timeouts::LLM_INSIGHT_MS),
        }
    }
}

impl LlmProviderConfig {
    pub fn claude(api_key: impl Into<String>) -> Self {
        Self {
            provider: LlmProvider::Claude,
            api_key: Some(api_key.into()),
            ..Default::default()
        }
    }

    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: LlmProvider::OpenAI,
            api_key: Some(api_key.into()),
            model: model.into(),
            ..Default::default()
        }
    }

    /// Build from the `llm` settings section
    pub fn from_settings(settings: &LlmSettings) -> Result<Self, LlmError> {
        let provider = LlmProvider::from_str(&settings.provider).ok_or_else(|| {
            LlmError::Configuration(format!("Unknown LLM provider '{}'", settings.provider))
        })?;

        Ok(Self {
            provider,
            api_key: settings.resolved_api_key(),
            endpoint: settings.endpoint.clone(),
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            timeout: settings.timeout(),
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn api_key_or_env(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(self.provider.key_env()).ok())
            .filter(|k| !k.trim().is_empty())
    }
}

/// Factory for creating LLM backends
pub struct LlmFactory;

impl LlmFactory {
    pub fn create(config: &LlmProviderConfig) -> Result<Arc<dyn LlmBackend>, LlmError> {
        let backend: Arc<dyn LlmBackend> = match config.provider {
            LlmProvider::Claude => {
                let api_key = config.api_key_or_env().ok_or_else(|| {
                    LlmError::Configuration(format!(
                        "Claude requires {}",
                        llm::ANTHROPIC_KEY_ENV
                    ))
                })?;

                let claude_config = ClaudeConfig::new(api_key)
                    .with_model(&config.model)
                    .with_max_tokens(config.max_tokens)
                    .with_temperature(config.temperature)
                    .with_timeout(config.timeout)
                    .with_endpoint(
                        config
                            .endpoint
                            .clone()
                            .unwrap_or_else(|| endpoints::ANTHROPIC_DEFAULT.to_string()),
                    );

                Arc::new(ClaudeBackend::new(claude_config)?)
            }
            LlmProvider::OpenAI => {
                let openai_config = OpenAIConfig {
                    endpoint: config
                        .endpoint
                        .clone()
                        .unwrap_or_else(|| endpoints::OPENAI_DEFAULT.to_string()),
                    api_key: config.api_key_or_env().unwrap_or_default(),
                    model: config.model.clone(),
                    max_tokens: config.max_tokens,
                    temperature: config.temperature,
                    timeout: config.timeout,
                    organization: None,
                };

                Arc::new(OpenAIBackend::new(openai_config)?)
            }
        };

        tracing::info!(
            provider = ?config.provider,
            model = backend.model_name(),
            timeout_ms = config.timeout.as_millis() as u64,
            "LLM backend created"
        );

        Ok(backend)
    }

    /// Backend for the settings, or `None` when the LLM is disabled
    pub fn from_settings(settings: &LlmSettings) -> Result<Option<Arc<dyn LlmBackend>>, LlmError> {
        if !settings.enabled {
            tracing::info!("LLM disabled, insights will be served deterministically");
            return Ok(None);
        }
        let config = LlmProviderConfig::from_settings(settings)?;
        Self::create(&config).map(Some)
    }
}
