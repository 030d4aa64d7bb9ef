//! Wire contracts for structured insights
//!
//! The LLM path and the deterministic path both produce these shapes, so a
//! caller cannot tell which one served a request. A model reply is decoded
//! with serde and then checked with [`InsightContract::validate`]; failing
//! either step rejects the whole reply.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use dealscope_core::{RiskLevel, Trend};
use dealscope_llm::strip_code_fence;
use dealscope_scoring::{ChampionReport, NextBestAction, RiskFactor};

/// Insight types served by the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    LeadScore,
    DealRisk,
    NextBestAction,
    Champions,
    CustomerHealth,
}

impl InsightKind {
    pub const ALL: [InsightKind; 5] = [
        InsightKind::LeadScore,
        InsightKind::DealRisk,
        InsightKind::NextBestAction,
        InsightKind::Champions,
        InsightKind::CustomerHealth,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InsightKind::LeadScore => "lead_score",
            InsightKind::DealRisk => "deal_risk",
            InsightKind::NextBestAction => "next_best_action",
            InsightKind::Champions => "champions",
            InsightKind::CustomerHealth => "customer_health",
        }
    }

    /// Task line for the prompt
    pub fn task(&self) -> &'static str {
        match self {
            InsightKind::LeadScore => {
                "Predict how likely this lead is to convert and explain the main factors."
            }
            InsightKind::DealRisk => {
                "Assess the risk that this opportunity slips or is lost, and estimate days to close."
            }
            InsightKind::NextBestAction => {
                "Recommend the single most valuable next action for this opportunity."
            }
            InsightKind::Champions => {
                "Identify which of these contacts could champion the deal internally."
            }
            InsightKind::CustomerHealth => {
                "Assess this customer's health, churn risk and expansion potential."
            }
        }
    }

    /// JSON shape the reply must follow
    pub fn reply_shape(&self) -> &'static str {
        match self {
            InsightKind::LeadScore => {
                r#"{"predictedScore": int 0-100, "confidenceLevel": int 0-100, "scoringFactors": [{"factor": string, "impact": int, "reasoning": string}], "recommendations": [string]}"#
            }
            InsightKind::DealRisk => {
                r#"{"riskLevel": "low|medium|high|critical", "riskScore": int 0-100, "riskFactors": [{"factor": string, "severity": int 0-100, "mitigation": string}], "recommendations": [string], "timeToClose": int days}"#
            }
            InsightKind::NextBestAction => {
                r#"{"action": string, "priority": "low|medium|high|critical", "reasoning": string, "expectedOutcome": string, "timeEstimate": string, "resources": [string]}"#
            }
            InsightKind::Champions => {
                r#"{"potentialChampions": [{"contactId": string, "name": string, "championScore": int 0-100, "indicators": [string], "engagementLevel": "high|medium|low", "influence": "high|medium|low"}], "recommendations": [string]}"#
            }
            InsightKind::CustomerHealth => {
                r#"{"healthScore": int 0-100, "riskLevel": "low|medium|high|critical", "healthFactors": [{"factor": string, "score": int 0-100, "trend": "up|down|stable"}], "churnRisk": {"probability": int 0-100, "timeframe": string, "triggers": [string]}, "recommendations": [string], "expansionOpportunities": [string]}"#
            }
        }
    }
}

impl fmt::Display for InsightKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A reply that decoded but broke a field constraint
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ContractViolation {
    pub field: String,
    pub message: String,
}

impl ContractViolation {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Why a model reply was rejected
#[derive(Debug, Error)]
pub enum ReplyError {
    #[error("reply is not valid JSON for this insight: {0}")]
    Json(#[from] serde_json::Error),

    #[error("reply violates the contract: {0}")]
    Contract(#[from] ContractViolation),
}

/// A structured insight body with field-level constraints
pub trait InsightContract: Serialize + DeserializeOwned {
    fn validate(&self) -> Result<(), ContractViolation>;
}

fn percent(field: &str, value: u32) -> Result<(), ContractViolation> {
    if value > 100 {
        return Err(ContractViolation::new(
            field,
            format!("must be between 0 and 100, got {}", value),
        ));
    }
    Ok(())
}

fn not_blank(field: &str, value: &str) -> Result<(), ContractViolation> {
    if value.trim().is_empty() {
        return Err(ContractViolation::new(field, "must not be blank"));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringFactor {
    pub factor: String,
    /// Points the factor moved the score by
    pub impact: i64,
    pub reasoning: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadScoreInsight {
    pub predicted_score: u32,
    pub confidence_level: u32,
    pub scoring_factors: Vec<ScoringFactor>,
    pub recommendations: Vec<String>,
}

impl InsightContract for LeadScoreInsight {
    fn validate(&self) -> Result<(), ContractViolation> {
        percent("predictedScore", self.predicted_score)?;
        percent("confidenceLevel", self.confidence_level)?;
        for (i, factor) in self.scoring_factors.iter().enumerate() {
            not_blank(&format!("scoringFactors[{}].factor", i), &factor.factor)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealRiskInsight {
    pub risk_level: RiskLevel,
    pub risk_score: u32,
    pub risk_factors: Vec<RiskFactor>,
    pub recommendations: Vec<String>,
    /// Days
    pub time_to_close: u32,
}

impl InsightContract for DealRiskInsight {
    fn validate(&self) -> Result<(), ContractViolation> {
        percent("riskScore", self.risk_score)?;
        for (i, factor) in self.risk_factors.iter().enumerate() {
            not_blank(&format!("riskFactors[{}].factor", i), &factor.factor)?;
            percent(&format!("riskFactors[{}].severity", i), factor.severity)?;
        }
        Ok(())
    }
}

pub type NextBestActionInsight = NextBestAction;

impl InsightContract for NextBestAction {
    fn validate(&self) -> Result<(), ContractViolation> {
        not_blank("action", &self.action)?;
        not_blank("reasoning", &self.reasoning)
    }
}

pub type ChampionInsight = ChampionReport;

impl InsightContract for ChampionReport {
    fn validate(&self) -> Result<(), ContractViolation> {
        for (i, champion) in self.potential_champions.iter().enumerate() {
            not_blank(
                &format!("potentialChampions[{}].contactId", i),
                &champion.contact_id,
            )?;
            percent(
                &format!("potentialChampions[{}].championScore", i),
                champion.champion_score,
            )?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthFactorSummary {
    pub factor: String,
    pub score: u32,
    pub trend: Trend,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChurnRisk {
    pub probability: u32,
    pub timeframe: String,
    pub triggers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerHealthInsight {
    pub health_score: u32,
    pub risk_level: RiskLevel,
    pub health_factors: Vec<HealthFactorSummary>,
    pub churn_risk: ChurnRisk,
    pub recommendations: Vec<String>,
    pub expansion_opportunities: Vec<String>,
}

impl InsightContract for CustomerHealthInsight {
    fn validate(&self) -> Result<(), ContractViolation> {
        percent("healthScore", self.health_score)?;
        percent("churnRisk.probability", self.churn_risk.probability)?;
        for (i, factor) in self.health_factors.iter().enumerate() {
            not_blank(&format!("healthFactors[{}].factor", i), &factor.factor)?;
            percent(&format!("healthFactors[{}].score", i), factor.score)?;
        }
        Ok(())
    }
}

/// Body of any insight, serialized without a tag
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum InsightBody {
    LeadScore(LeadScoreInsight),
    DealRisk(DealRiskInsight),
    NextBestAction(NextBestActionInsight),
    Champions(ChampionInsight),
    CustomerHealth(CustomerHealthInsight),
}

impl InsightBody {
    pub fn kind(&self) -> InsightKind {
        match self {
            InsightBody::LeadScore(_) => InsightKind::LeadScore,
            InsightBody::DealRisk(_) => InsightKind::DealRisk,
            InsightBody::NextBestAction(_) => InsightKind::NextBestAction,
            InsightBody::Champions(_) => InsightKind::Champions,
            InsightBody::CustomerHealth(_) => InsightKind::CustomerHealth,
        }
    }
}

fn decode<T: InsightContract>(text: &str) -> Result<T, ReplyError> {
    let body: T = serde_json::from_str(strip_code_fence(text))?;
    body.validate()?;
    Ok(body)
}

/// Decode and validate a model reply for `kind`
pub fn parse_reply(kind: InsightKind, text: &str) -> Result<InsightBody, ReplyError> {
    Ok(match kind {
        InsightKind::LeadScore => InsightBody::LeadScore(decode(text)?),
        InsightKind::DealRisk => InsightBody::DealRisk(decode(text)?),
        InsightKind::NextBestAction => InsightBody::NextBestAction(decode(text)?),
        InsightKind::Champions => InsightBody::Champions(decode(text)?),
        InsightKind::CustomerHealth => InsightBody::CustomerHealth(decode(text)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dealscope_core::Priority;

    #[test]
    fn test_parse_lead_score_reply() {
        let reply = r#"```json
        {"predictedScore": 72, "confidenceLevel": 60,
         "scoringFactors": [{"factor": "Seniority", "impact": 20, "reasoning": "VP title"}],
         "recommendations": ["Book a discovery call"]}
        ```"#;

        let InsightBody::LeadScore(body) = parse_reply(InsightKind::LeadScore, reply).unwrap()
        else {
            panic!("wrong body kind");
        };
        assert_eq!(body.predicted_score, 72);
        assert_eq!(body.scoring_factors[0].impact, 20);
    }

    #[test]
    fn test_out_of_range_score_rejected() {
        let reply = r#"{"predictedScore": 140, "confidenceLevel": 60, "scoringFactors": [], "recommendations": []}"#;
        let err = parse_reply(InsightKind::LeadScore, reply).unwrap_err();
        assert!(matches!(err, ReplyError::Contract(ref v) if v.field == "predictedScore"));
    }

    #[test]
    fn test_missing_field_rejected() {
        let reply = r#"{"riskLevel": "high", "riskScore": 70, "riskFactors": [], "recommendations": []}"#;
        assert!(matches!(
            parse_reply(InsightKind::DealRisk, reply),
            Err(ReplyError::Json(_))
        ));
    }

    #[test]
    fn test_unknown_enum_value_rejected() {
        let reply = r#"{"action": "Call", "priority": "urgent", "reasoning": "r", "expectedOutcome": "o", "timeEstimate": "1h", "resources": []}"#;
        assert!(parse_reply(InsightKind::NextBestAction, reply).is_err());
    }

    #[test]
    fn test_parse_next_best_action() {
        let reply = r#"{"action": "Schedule proposal review", "priority": "high", "reasoning": "In proposal", "expectedOutcome": "Agreement", "timeEstimate": "1 week", "resources": ["Deck"]}"#;
        let body = parse_reply(InsightKind::NextBestAction, reply).unwrap();
        assert_eq!(body.kind(), InsightKind::NextBestAction);
        let InsightBody::NextBestAction(action) = body else {
            panic!("wrong body kind");
        };
        assert_eq!(action.priority, Priority::High);
    }

    #[test]
    fn test_champion_reply_constraints() {
        let reply = r#"{"potentialChampions": [{"contactId": " ", "name": "A", "championScore": 50, "indicators": [], "engagementLevel": "high", "influence": "high"}], "recommendations": []}"#;
        let err = parse_reply(InsightKind::Champions, reply).unwrap_err();
        assert!(err.to_string().contains("potentialChampions[0].contactId"));
    }

    #[test]
    fn test_body_serializes_without_tag() {
        let body = InsightBody::CustomerHealth(CustomerHealthInsight {
            health_score: 79,
            risk_level: RiskLevel::Medium,
            health_factors: vec![],
            churn_risk: ChurnRisk {
                probability: 21,
                timeframe: "365 days".to_string(),
                triggers: vec![],
            },
            recommendations: vec![],
            expansion_opportunities: vec![],
        });
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["healthScore"], 79);
        assert_eq!(json["churnRisk"]["probability"], 21);
        assert_eq!(json["riskLevel"], "medium");
    }
}
