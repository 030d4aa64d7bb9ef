//! Insight orchestration
//!
//! One attempt at the model per request, bounded by a hard timeout. Any
//! service error, timeout or rejected reply is logged and answered by the
//! deterministic path with the same input.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

use dealscope_config::constants::metrics as metric_names;
use dealscope_config::{LeadScoringRules, Settings};
use dealscope_core::ScoringRule;
use dealscope_llm::{LlmBackend, LlmError, LlmFactory, Message, PromptBuilder};

use crate::contracts::{parse_reply, InsightBody, InsightKind, ReplyError};
use crate::request::{InsightRequest, Subject};
use crate::InsightError;

/// Which path produced an insight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightSource {
    Ai,
    Deterministic,
}

impl InsightSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            InsightSource::Ai => "ai",
            InsightSource::Deterministic => "deterministic",
        }
    }
}

impl fmt::Display for InsightSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructuredInsight {
    pub kind: InsightKind,
    pub source: InsightSource,
    pub body: InsightBody,
}

/// Reasons the model path was abandoned
#[derive(Debug, Error)]
enum AiFailure {
    #[error("could not build prompt: {0}")]
    Prompt(#[from] serde_json::Error),

    #[error("service error: {0}")]
    Service(#[from] LlmError),

    #[error("no reply within {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Rejected(#[from] ReplyError),
}

impl AiFailure {
    fn reason(&self) -> &'static str {
        match self {
            AiFailure::Prompt(_) => "prompt",
            AiFailure::Service(_) => "service",
            AiFailure::Timeout(_) => "timeout",
            AiFailure::Rejected(_) => "invalid_reply",
        }
    }
}

pub struct InsightOrchestrator {
    llm: Option<Arc<dyn LlmBackend>>,
    timeout: Duration,
    lead_rules: Vec<ScoringRule>,
}

impl InsightOrchestrator {
    /// Orchestrator with a model collaborator
    pub fn new(llm: Arc<dyn LlmBackend>, timeout: Duration) -> Result<Self, InsightError> {
        if timeout.is_zero() {
            return Err(InsightError::Configuration(
                "LLM timeout must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            llm: Some(llm),
            timeout,
            lead_rules: LeadScoringRules::built_in().active().cloned().collect(),
        })
    }

    /// Orchestrator that always serves the deterministic path
    pub fn offline() -> Self {
        Self {
            llm: None,
            timeout: Duration::ZERO,
            lead_rules: LeadScoringRules::built_in().active().cloned().collect(),
        }
    }

    /// Build from settings: LLM backend (if enabled) and lead rule catalogue
    pub fn from_settings(settings: &Settings) -> Result<Self, InsightError> {
        let orchestrator = match LlmFactory::from_settings(&settings.llm)? {
            Some(llm) => Self::new(llm, settings.llm.timeout())?,
            None => Self::offline(),
        };
        let rules = LeadScoringRules::from_settings(&settings.scoring)?;
        Ok(orchestrator.with_lead_rules(&rules))
    }

    pub fn with_lead_rules(mut self, rules: &LeadScoringRules) -> Self {
        self.lead_rules = rules.active().cloned().collect();
        self
    }

    pub fn is_ai_enabled(&self) -> bool {
        self.llm.is_some()
    }

    pub fn model_name(&self) -> Option<&str> {
        self.llm.as_ref().map(|llm| llm.model_name())
    }

    pub fn lead_rules(&self) -> &[ScoringRule] {
        &self.lead_rules
    }

    pub async fn get_insight(
        &self,
        request: &InsightRequest,
    ) -> Result<StructuredInsight, InsightError> {
        self.get_insight_as_of(request, Utc::now().date_naive()).await
    }

    /// Same as [`get_insight`](Self::get_insight) with dates measured from `as_of`
    pub async fn get_insight_as_of(
        &self,
        request: &InsightRequest,
        as_of: NaiveDate,
    ) -> Result<StructuredInsight, InsightError> {
        let kind = request.kind();
        let subject = Subject::from_request(request, &self.lead_rules)?;
        let started = Instant::now();

        let ai_body = match &self.llm {
            Some(llm) => match self.ask(llm.as_ref(), kind, request).await {
                Ok(body) => Some(body),
                Err(failure) => {
                    tracing::warn!(
                        kind = %kind,
                        reason = failure.reason(),
                        error = %failure,
                        "LLM insight failed, falling back to deterministic scoring"
                    );
                    metrics::counter!(
                        metric_names::INSIGHT_FALLBACKS_TOTAL,
                        "kind" => kind.as_str(),
                        "reason" => failure.reason()
                    )
                    .increment(1);
                    None
                }
            },
            None => None,
        };

        let (source, body) = match ai_body {
            Some(body) => (InsightSource::Ai, body),
            None => (InsightSource::Deterministic, subject.deterministic(kind, as_of)?),
        };

        let elapsed = started.elapsed();
        metrics::counter!(
            metric_names::INSIGHT_REQUESTS_TOTAL,
            "kind" => kind.as_str(),
            "source" => source.as_str()
        )
        .increment(1);
        metrics::histogram!(metric_names::INSIGHT_LATENCY_SECONDS, "kind" => kind.as_str())
            .record(elapsed.as_secs_f64());

        tracing::debug!(
            kind = %kind,
            source = %source,
            latency_ms = elapsed.as_millis() as u64,
            "Insight served"
        );

        Ok(StructuredInsight { kind, source, body })
    }

    async fn ask(
        &self,
        llm: &dyn LlmBackend,
        kind: InsightKind,
        request: &InsightRequest,
    ) -> Result<InsightBody, AiFailure> {
        let messages = build_prompt(kind, request)?;

        let reply = tokio::time::timeout(self.timeout, llm.generate(&messages))
            .await
            .map_err(|_| AiFailure::Timeout(self.timeout))??;

        tracing::debug!(
            kind = %kind,
            model = llm.model_name(),
            tokens = reply.tokens,
            "LLM reply received"
        );

        Ok(parse_reply(kind, &reply.text)?)
    }
}

impl fmt::Debug for InsightOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InsightOrchestrator")
            .field("model", &self.model_name())
            .field("timeout", &self.timeout)
            .field("lead_rules", &self.lead_rules.len())
            .finish()
    }
}

fn build_prompt(
    kind: InsightKind,
    request: &InsightRequest,
) -> Result<Vec<Message>, serde_json::Error> {
    Ok(PromptBuilder::new()
        .task(kind.task())
        .reply_shape(kind.reply_shape())
        .guidance("Scores, severities and probabilities are integers from 0 to 100")
        .guidance("Base every claim on the input fields; do not invent data")
        .payload(request)?
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dealscope_core::Record;

    #[test]
    fn test_offline_uses_built_in_rules() {
        let orchestrator = InsightOrchestrator::offline();
        assert!(!orchestrator.is_ai_enabled());
        assert_eq!(
            orchestrator.lead_rules().len(),
            LeadScoringRules::built_in().active().count()
        );
    }

    #[test]
    fn test_from_default_settings_is_offline() {
        let orchestrator = InsightOrchestrator::from_settings(&Settings::default()).unwrap();
        assert!(!orchestrator.is_ai_enabled());
        assert_eq!(orchestrator.model_name(), None);
    }

    #[test]
    fn test_prompt_carries_payload() {
        let request = InsightRequest::DealRisk {
            record: Record::new().with("id", "opp-7"),
        };
        let messages = build_prompt(InsightKind::DealRisk, &request).unwrap();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].content.contains("timeToClose"));
        assert!(messages[1].content.contains("opp-7"));
    }

    #[test]
    fn test_source_labels() {
        assert_eq!(InsightSource::Ai.to_string(), "ai");
        assert_eq!(
            serde_json::to_string(&InsightSource::Deterministic).unwrap(),
            "\"deterministic\""
        );
    }
}
