//! Claude Backend
//!
//! Implements the Anthropic Messages API for single-shot insight replies.
//! The system message is lifted into the request's `system` field; all
//! other messages are sent in order.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use dealscope_config::constants::{endpoints, llm, timeouts};

use crate::backend::{FinishReason, GenerationResult, LlmBackend};
use crate::prompt::{Message, Role};
use crate::LlmError;

/// Short aliases accepted in settings, resolved to full model ids
fn resolve_model_id(model: &str) -> String {
    match model.to_lowercase().as_str() {
        "sonnet" => "claude-3-5-sonnet-20241022".to_string(),
        "haiku" => "claude-3-5-haiku-20241022".to_string(),
        "opus" => "claude-3-opus-20240229".to_string(),
        _ => model.to_string(),
    }
}

/// Configuration for Claude backend
#[derive(Debug, Clone)]
pub struct ClaudeConfig {
    pub api_key: String,
    /// Full model id
    pub model: String,
    pub max_tokens: usize,
    /// Temperature (0.0 - 1.0)
    pub temperature: f32,
    pub timeout: Duration,
    /// API endpoint (for testing or proxy)
    pub endpoint: String,
}

impl Default for ClaudeConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: llm::DEFAULT_CLAUDE_MODEL.to_string(),
            max_tokens: llm::DEFAULT_MAX_TOKENS,
            temperature: llm::DEFAULT_TEMPERATURE,
            timeout: Duration::from_millis(timeouts::LLM_INSIGHT_MS),
            endpoint: endpoints::ANTHROPIC_DEFAULT.to_string(),
        }
    }
}

impl ClaudeConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    /// Set model by id or alias (`sonnet`, `haiku`, `opus`)
    pub fn with_model(mut self, model: &str) -> Self {
        self.model = resolve_model_id(model);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Claude accepts 0.0 - 1.0
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature.clamp(0.0, 1.0);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

/// Claude backend
pub struct ClaudeBackend {
    config: ClaudeConfig,
    client: Client,
}

impl ClaudeBackend {
    pub fn new(config: ClaudeConfig) -> Result<Self, LlmError> {
        if config.api_key.is_empty() {
            return Err(LlmError::Configuration(
                "ANTHROPIC_API_KEY not set. Set it via environment or config.".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    fn build_request(&self, messages: &[Message]) -> ClaudeRequest {
        let system = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>();

        ClaudeRequest {
            model: self.config.model.clone(),
            max_tokens: self.config.max_tokens,
            messages: messages
                .iter()
                .filter(|m| m.role != Role::System)
                .map(|m| ClaudeMessage {
                    role: m.role.to_string(),
                    content: m.content.clone(),
                })
                .collect(),
            system: (!system.is_empty()).then(|| system.join("\n\n")),
            temperature: Some(self.config.temperature),
        }
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.config.endpoint.trim_end_matches('/'))
    }
}

#[async_trait]
impl LlmBackend for ClaudeBackend {
    async fn generate(&self, messages: &[Message]) -> Result<GenerationResult, LlmError> {
        let start = std::time::Instant::now();
        let request = self.build_request(messages);

        let response = self
            .client
            .post(self.messages_url())
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", endpoints::ANTHROPIC_API_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(LlmError::Api(format!("HTTP {}: {}", status, error_text)));
        }

        let response: ClaudeApiResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let text: String = response
            .content
            .iter()
            .filter_map(|block| match block {
                ClaudeContentBlock::Text { text } => Some(text.as_str()),
                ClaudeContentBlock::Other => None,
            })
            .collect();

        let total_time_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            model = %self.config.model,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            total_time_ms,
            "Claude completion finished"
        );

        Ok(GenerationResult {
            text,
            tokens: response.usage.output_tokens,
            total_time_ms,
            finish_reason: match response.stop_reason {
                Some(ClaudeStopReason::MaxTokens) => FinishReason::Length,
                _ => FinishReason::Stop,
            },
        })
    }

    async fn is_available(&self) -> bool {
        !self.config.api_key.is_empty()
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

// =============================================================================
// Claude API Types
// =============================================================================

#[derive(Debug, Serialize)]
struct ClaudeRequest {
    model: String,
    max_tokens: usize,
    messages: Vec<ClaudeMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct ClaudeMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClaudeContentBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct ClaudeApiResponse {
    content: Vec<ClaudeContentBlock>,
    stop_reason: Option<ClaudeStopReason>,
    usage: ClaudeUsage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ClaudeStopReason {
    EndTurn,
    MaxTokens,
    StopSequence,
    ToolUse,
}

#[derive(Debug, Deserialize)]
struct ClaudeUsage {
    input_tokens: usize,
    output_tokens: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_aliases() {
        assert_eq!(resolve_model_id("Haiku"), "claude-3-5-haiku-20241022");
        assert_eq!(resolve_model_id("claude-x-custom"), "claude-x-custom");
    }

    #[test]
    fn test_config_builder() {
        let config = ClaudeConfig::new("sk-ant-test")
            .with_model("sonnet")
            .with_temperature(1.7)
            .with_max_tokens(512);

        assert_eq!(config.model, "claude-3-5-sonnet-20241022");
        assert_eq!(config.temperature, 1.0);
        assert_eq!(config.max_tokens, 512);
    }

    #[test]
    fn test_missing_key_is_configuration_error() {
        let result = ClaudeBackend::new(ClaudeConfig::default());
        assert!(matches!(result, Err(LlmError::Configuration(_))));
    }

    #[test]
    fn test_request_serialization() {
        let backend = ClaudeBackend::new(
            ClaudeConfig::new("sk-ant-test").with_endpoint("http://localhost:9999/"),
        )
        .unwrap();
        let request = backend.build_request(&[
            Message::system("You are a sales analyst"),
            Message::user("Assess this deal"),
        ]);

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["system"], "You are a sales analyst");
        assert_eq!(json["messages"].as_array().unwrap().len(), 1);
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(backend.messages_url(), "http://localhost:9999/v1/messages");
    }

    #[test]
    fn test_response_parsing() {
        let json = r#"{
            "content": [
                {"type": "text", "text": "{\"action\": "},
                {"type": "text", "text": "\"call\"}"}
            ],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 10, "output_tokens": 5}
        }"#;

        let response: ClaudeApiResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.stop_reason, Some(ClaudeStopReason::EndTurn));
        assert_eq!(response.content.len(), 2);
        assert_eq!(response.usage.output_tokens, 5);
    }

    #[test]
    fn test_unknown_blocks_are_tolerated() {
        let json = r#"{
            "content": [{"type": "tool_use", "id": "t1", "name": "x", "input": {}}],
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 1, "output_tokens": 1}
        }"#;
        let response: ClaudeApiResponse = serde_json::from_str(json).unwrap();
        assert!(matches!(response.content[0], ClaudeContentBlock::Other));
    }
}
