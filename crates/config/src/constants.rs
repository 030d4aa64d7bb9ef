//! Centralized constants for the insight engine
//!
//! Default values shared by settings, the LLM backends and the server.

/// Service endpoints
pub mod endpoints {
    pub const ANTHROPIC_DEFAULT: &str = "https://api.anthropic.com";
    pub const OPENAI_DEFAULT: &str = "https://api.openai.com/v1";

    /// Anthropic API version header value
    pub const ANTHROPIC_API_VERSION: &str = "2023-06-01";
}

/// Timeouts
pub mod timeouts {
    /// Hard bound on one LLM insight call
    pub const LLM_INSIGHT_MS: u64 = 5_000;

    /// Accepted range for `llm.timeout_ms`
    pub const LLM_MIN_MS: u64 = 100;
    pub const LLM_MAX_MS: u64 = 60_000;

    /// HTTP request timeout for the server
    pub const HTTP_REQUEST_SECS: u64 = 30;
}

/// LLM defaults
pub mod llm {
    pub const DEFAULT_PROVIDER: &str = "claude";
    pub const DEFAULT_CLAUDE_MODEL: &str = "claude-3-5-sonnet-20241022";
    pub const DEFAULT_MAX_TOKENS: usize = 1024;
    pub const DEFAULT_TEMPERATURE: f32 = 0.2;

    pub const ANTHROPIC_KEY_ENV: &str = "ANTHROPIC_API_KEY";
    pub const OPENAI_KEY_ENV: &str = "OPENAI_API_KEY";
}

/// Settings loading
pub mod env {
    /// Prefix for environment overrides, e.g. `DEALSCOPE__SERVER__PORT`
    pub const PREFIX: &str = "DEALSCOPE";
    pub const SEPARATOR: &str = "__";
    /// Selects `config/{env}` on top of `config/default`
    pub const ENV_NAME_VAR: &str = "DEALSCOPE_ENV";
}

/// Metric names
pub mod metrics {
    pub const INSIGHT_REQUESTS_TOTAL: &str = "insight_requests_total";
    pub const INSIGHT_LATENCY_SECONDS: &str = "insight_latency_seconds";
    pub const INSIGHT_FALLBACKS_TOTAL: &str = "insight_fallbacks_total";
}
