//! Orchestrator behaviour against stub LLM backends

use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dealscope_core::Record;
use dealscope_insights::{
    InsightBody, InsightError, InsightKind, InsightOrchestrator, InsightRequest, InsightSource,
};
use dealscope_llm::{FinishReason, GenerationResult, LlmBackend, LlmError, Message};

struct FailingBackend;

#[async_trait]
impl LlmBackend for FailingBackend {
    async fn generate(&self, _messages: &[Message]) -> Result<GenerationResult, LlmError> {
        Err(LlmError::Api("HTTP 503: overloaded".to_string()))
    }

    async fn is_available(&self) -> bool {
        false
    }

    fn model_name(&self) -> &str {
        "failing"
    }
}

/// Replies with fixed text and counts calls
struct TextBackend {
    text: String,
    calls: AtomicUsize,
}

impl TextBackend {
    fn new(text: &str) -> Arc<Self> {
        Arc::new(Self {
            text: text.to_string(),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl LlmBackend for TextBackend {
    async fn generate(&self, _messages: &[Message]) -> Result<GenerationResult, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(GenerationResult {
            text: self.text.clone(),
            tokens: 42,
            total_time_ms: 5,
            finish_reason: FinishReason::Stop,
        })
    }

    async fn is_available(&self) -> bool {
        true
    }

    fn model_name(&self) -> &str {
        "stub"
    }
}

struct SlowBackend;

#[async_trait]
impl LlmBackend for SlowBackend {
    async fn generate(&self, _messages: &[Message]) -> Result<GenerationResult, LlmError> {
        tokio::time::sleep(Duration::from_secs(10)).await;
        Ok(GenerationResult {
            text: VALID_LEAD_REPLY.to_string(),
            tokens: 1,
            total_time_ms: 10_000,
            finish_reason: FinishReason::Stop,
        })
    }

    async fn is_available(&self) -> bool {
        true
    }

    fn model_name(&self) -> &str {
        "slow"
    }
}

const VALID_LEAD_REPLY: &str = r#"{
    "predictedScore": 88,
    "confidenceLevel": 70,
    "scoringFactors": [{"factor": "Seniority", "impact": 25, "reasoning": "Chief officer"}],
    "recommendations": ["Call this week"]
}"#;

fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
}

fn requests() -> Vec<InsightRequest> {
    let opportunity = Record::new()
        .with("id", "opp-1")
        .with("stage", "Negotiation")
        .with("amount", 150_000)
        .with("close_date", "2024-06-20")
        .with("meddpicc_pain_identified", true);

    vec![
        InsightRequest::lead_score(
            Record::new()
                .with("id", "lead-1")
                .with("title", "Chief Revenue Officer")
                .with("company_size", 1200)
                .with("email", "cro@acme.test"),
        ),
        InsightRequest::DealRisk {
            record: opportunity.clone(),
        },
        InsightRequest::NextBestAction {
            record: opportunity,
        },
        InsightRequest::Champions {
            contacts: vec![
                Record::new()
                    .with("id", "c1")
                    .with("name", "Ana Ruiz")
                    .with("title", "VP Operations")
                    .with("is_champion", true),
                Record::new()
                    .with("id", "c2")
                    .with("name", "Ben Osei")
                    .with("title", "Analyst"),
            ],
        },
        InsightRequest::CustomerHealth {
            record: Record::new()
                .with("id", "cust-1")
                .with("usage_score", 55)
                .with("usage_trend", "down")
                .with("engagement_score", 62)
                .with("satisfaction_score", 70)
                .with("arr", 80_000)
                .with("renewal_date", "2024-09-01"),
        },
    ]
}

#[tokio::test]
async fn failing_backend_falls_back_field_for_field() {
    let offline = InsightOrchestrator::offline();
    let failing = InsightOrchestrator::new(Arc::new(FailingBackend), Duration::from_secs(1)).unwrap();

    for request in requests() {
        let expected = offline.get_insight_as_of(&request, as_of()).await.unwrap();
        let actual = failing.get_insight_as_of(&request, as_of()).await.unwrap();

        assert_eq!(actual.source, InsightSource::Deterministic);
        assert_eq!(actual.body, expected.body, "kind {}", request.kind());
    }
}

#[tokio::test]
async fn non_json_reply_falls_back() {
    let offline = InsightOrchestrator::offline();
    let backend = TextBackend::new("This lead looks promising, I would call them.");
    let orchestrator = InsightOrchestrator::new(backend.clone(), Duration::from_secs(1)).unwrap();

    for request in requests() {
        let expected = offline.get_insight_as_of(&request, as_of()).await.unwrap();
        let actual = orchestrator.get_insight_as_of(&request, as_of()).await.unwrap();

        assert_eq!(actual.source, InsightSource::Deterministic);
        assert_eq!(actual.body, expected.body);
    }
    // single attempt per request
    assert_eq!(backend.calls.load(Ordering::SeqCst), requests().len());
}

#[tokio::test]
async fn valid_reply_is_returned_as_is() {
    let orchestrator =
        InsightOrchestrator::new(TextBackend::new(VALID_LEAD_REPLY), Duration::from_secs(1)).unwrap();

    let insight = orchestrator
        .get_insight_as_of(&requests()[0], as_of())
        .await
        .unwrap();

    assert_eq!(insight.source, InsightSource::Ai);
    assert_eq!(insight.kind, InsightKind::LeadScore);
    let InsightBody::LeadScore(body) = insight.body else {
        panic!("expected a lead score body");
    };
    assert_eq!(body.predicted_score, 88);
    assert_eq!(body.recommendations, vec!["Call this week".to_string()]);
}

#[tokio::test]
async fn fenced_reply_is_accepted() {
    let fenced = format!("```json\n{}\n```", VALID_LEAD_REPLY);
    let orchestrator =
        InsightOrchestrator::new(TextBackend::new(&fenced), Duration::from_secs(1)).unwrap();

    let insight = orchestrator
        .get_insight_as_of(&requests()[0], as_of())
        .await
        .unwrap();
    assert_eq!(insight.source, InsightSource::Ai);
}

#[tokio::test]
async fn reply_for_wrong_shape_falls_back() {
    // a lead-score reply answering a deal-risk request
    let orchestrator =
        InsightOrchestrator::new(TextBackend::new(VALID_LEAD_REPLY), Duration::from_secs(1)).unwrap();

    let insight = orchestrator
        .get_insight_as_of(&requests()[1], as_of())
        .await
        .unwrap();
    assert_eq!(insight.source, InsightSource::Deterministic);
    assert!(matches!(insight.body, InsightBody::DealRisk(_)));
}

#[tokio::test]
async fn out_of_range_reply_falls_back() {
    let reply = VALID_LEAD_REPLY.replace("88", "140");
    let orchestrator =
        InsightOrchestrator::new(TextBackend::new(&reply), Duration::from_secs(1)).unwrap();

    let insight = orchestrator
        .get_insight_as_of(&requests()[0], as_of())
        .await
        .unwrap();
    assert_eq!(insight.source, InsightSource::Deterministic);
}

#[tokio::test]
async fn slow_backend_times_out_to_fallback() {
    let orchestrator =
        InsightOrchestrator::new(Arc::new(SlowBackend), Duration::from_millis(20)).unwrap();

    let insight = orchestrator
        .get_insight_as_of(&requests()[0], as_of())
        .await
        .unwrap();
    assert_eq!(insight.source, InsightSource::Deterministic);
}

#[tokio::test]
async fn invalid_input_is_surfaced_without_calling_the_model() {
    let backend = TextBackend::new(VALID_LEAD_REPLY);
    let orchestrator = InsightOrchestrator::new(backend.clone(), Duration::from_secs(1)).unwrap();

    let err = orchestrator
        .get_insight_as_of(
            &InsightRequest::lead_score(Record::new().with("title", "CEO")),
            as_of(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, InsightError::Validation { ref field, .. } if field == "id"));
    assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn deterministic_validation_errors_are_surfaced() {
    let err = InsightOrchestrator::offline()
        .get_insight_as_of(
            &InsightRequest::CustomerHealth {
                record: Record::new().with("id", "cust-9"),
            },
            as_of(),
        )
        .await
        .unwrap_err();
    assert!(err.is_validation());
}

#[test]
fn zero_timeout_is_a_configuration_error() {
    let err = InsightOrchestrator::new(Arc::new(FailingBackend), Duration::ZERO).unwrap_err();
    assert!(matches!(err, InsightError::Configuration(_)));
}
