//! Deterministic scoring engines
//!
//! Everything in this crate is pure: the same input always produces the same
//! output, so these engines double as the fallback for AI-generated insights.

pub mod criteria;
pub mod health;
pub mod qualification;
pub mod risk;

pub use criteria::{CriteriaEvaluator, RuleExplanation};
pub use health::{
    health_risk_level, ChurnAlert, CustomerHealthRecord, HealthFactor, HealthScoringEngine,
    RenewalPrediction, UpsellKind, UpsellOpportunity,
};
pub use qualification::{
    normalize_stage, ElementScore, QualificationAssessment, QualificationAssessor,
    QualificationGap, QualificationTier, StageGate,
};
pub use risk::{
    deal_risk_level, ChampionCandidate, ChampionReport, DealContext, NextBestAction,
    RiskAndActionAdvisor, RiskFactor, RiskProfile,
};
