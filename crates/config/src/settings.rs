//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::constants::{env, llm, timeouts};
use crate::ConfigError;

/// Runtime environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    /// Development mode - relaxed validation, warnings only
    #[default]
    Development,
    Staging,
    /// Production mode - all validations enforced
    Production,
}

impl RuntimeEnvironment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    /// Check if strict validation should be applied
    pub fn is_strict(&self) -> bool {
        matches!(self, Self::Production | Self::Staging)
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    #[serde(default)]
    pub server: ServerConfig,

    /// LLM collaborator
    #[serde(default)]
    pub llm: LlmSettings,

    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Deterministic scoring inputs
    #[serde(default)]
    pub scoring: ScoringSettings,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_llm()?;
        self.validate_scoring()?;
        Ok(())
    }

    fn validate_server(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::invalid("server.port", "Port cannot be 0"));
        }
        if self.server.timeout_seconds == 0 {
            return Err(ConfigError::invalid(
                "server.timeout_seconds",
                "Request timeout cannot be 0",
            ));
        }
        Ok(())
    }

    fn validate_llm(&self) -> Result<(), ConfigError> {
        let llm = &self.llm;

        if !(timeouts::LLM_MIN_MS..=timeouts::LLM_MAX_MS).contains(&llm.timeout_ms) {
            return Err(ConfigError::invalid(
                "llm.timeout_ms",
                format!(
                    "Must be between {} and {} ms, got {}",
                    timeouts::LLM_MIN_MS,
                    timeouts::LLM_MAX_MS,
                    llm.timeout_ms
                ),
            ));
        }

        if !(0.0..=2.0).contains(&llm.temperature) {
            return Err(ConfigError::invalid(
                "llm.temperature",
                format!("Must be between 0.0 and 2.0, got {}", llm.temperature),
            ));
        }

        if llm.max_tokens == 0 {
            return Err(ConfigError::invalid("llm.max_tokens", "Must be greater than 0"));
        }

        if llm.enabled && llm.model.trim().is_empty() {
            return Err(ConfigError::MissingField("llm.model".to_string()));
        }

        // Missing keys only matter once a backend is built; staging and
        // production refuse to start without one.
        if llm.enabled && llm.api_key.is_none() && self.environment.is_strict() {
            let var = llm.api_key_env();
            if std::env::var(var).is_err() {
                return Err(ConfigError::MissingField(format!("llm.api_key (or {})", var)));
            }
        }

        Ok(())
    }

    fn validate_scoring(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.scoring.rules_path {
            if path.trim().is_empty() {
                return Err(ConfigError::invalid(
                    "scoring.rules_path",
                    "Must not be blank when set",
                ));
            }
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// CORS allowed origins; empty means any origin
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_timeout() -> u64 {
    timeouts::HTTP_REQUEST_SECS
}
fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            timeout_seconds: default_timeout(),
            cors_enabled: true,
            cors_origins: Vec::new(),
        }
    }
}

/// LLM collaborator settings
///
/// With `enabled = false` no backend is built and every insight is served
/// by the deterministic path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    #[serde(default)]
    pub enabled: bool,

    /// `claude` / `anthropic` or `openai`
    #[serde(default = "default_provider")]
    pub provider: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Overrides the provider's public endpoint
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Falls back to the provider's conventional env var when unset
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Hard bound on one insight call
    #[serde(default = "default_llm_timeout")]
    pub timeout_ms: u64,
}

fn default_provider() -> String {
    llm::DEFAULT_PROVIDER.to_string()
}
fn default_model() -> String {
    llm::DEFAULT_CLAUDE_MODEL.to_string()
}
fn default_max_tokens() -> usize {
    llm::DEFAULT_MAX_TOKENS
}
fn default_temperature() -> f32 {
    llm::DEFAULT_TEMPERATURE
}
fn default_llm_timeout() -> u64 {
    timeouts::LLM_INSIGHT_MS
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: default_provider(),
            model: default_model(),
            endpoint: None,
            api_key: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_ms: default_llm_timeout(),
        }
    }
}

impl LlmSettings {
    /// Conventional API key variable for the configured provider
    pub fn api_key_env(&self) -> &'static str {
        match self.provider.to_lowercase().as_str() {
            "openai" | "gpt" => llm::OPENAI_KEY_ENV,
            _ => llm::ANTHROPIC_KEY_ENV,
        }
    }

    /// Configured key, else the provider's env var
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var(self.api_key_env()).ok())
            .filter(|k| !k.trim().is_empty())
    }

    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.timeout_ms)
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_json: bool,

    /// Install the Prometheus recorder and serve `/metrics`
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
            metrics_enabled: true,
        }
    }
}

/// Deterministic scoring inputs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoringSettings {
    /// YAML lead-scoring rule catalogue; built-in rules when unset
    #[serde(default)]
    pub rules_path: Option<String>,
}

/// Load settings from `config/default`, `config/{env}` and `DEALSCOPE__*`
/// environment variables, in that order of precedence.
pub fn load_settings(env_name: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name("config/default").required(false));

    if let Some(env_name) = env_name {
        builder =
            builder.add_source(File::with_name(&format!("config/{}", env_name)).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix(env::PREFIX)
            .separator(env::SEPARATOR)
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;

    tracing::debug!(
        environment = ?settings.environment,
        llm_enabled = settings.llm.enabled,
        provider = %settings.llm.provider,
        "Settings loaded"
    );

    Ok(settings)
}
