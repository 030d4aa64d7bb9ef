//! MEDDPICC qualification assessment
//!
//! Weighted completeness over the eight elements. Competition is tracked
//! but carries no weight and never produces a gap.
//!
//! | element           | satisfied when                              | weight |
//! |-------------------|---------------------------------------------|--------|
//! | metrics           | description or a quantified value present   | 15     |
//! | economic buyer    | identified                                  | 20     |
//! | decision criteria | at least one criterion                      | 15     |
//! | decision process  | mapped, or at least one step                | 15     |
//! | paper process     | understood                                  | 10     |
//! | pain              | identified                                  | 15     |
//! | champion          | present (10 with high influence, else 5)    | 10     |

use serde::{Deserialize, Serialize};
use std::fmt;

use dealscope_core::{Influence, MeddpiccElement, QualificationProfile};

pub mod weights {
    pub const METRICS: u32 = 15;
    pub const ECONOMIC_BUYER: u32 = 20;
    pub const DECISION_CRITERIA: u32 = 15;
    pub const DECISION_PROCESS: u32 = 15;
    pub const PAPER_PROCESS: u32 = 10;
    pub const PAIN: u32 = 15;
    pub const CHAMPION_HIGH: u32 = 10;
    pub const CHAMPION_OTHER: u32 = 5;

    pub const TOTAL: u32 = METRICS
        + ECONOMIC_BUYER
        + DECISION_CRITERIA
        + DECISION_PROCESS
        + PAPER_PROCESS
        + PAIN
        + CHAMPION_HIGH;
}

const STRONG_THRESHOLD: u32 = 80;
const MODERATE_THRESHOLD: u32 = 60;

/// Qualification health tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualificationTier {
    Strong,
    Moderate,
    Weak,
}

impl QualificationTier {
    pub fn from_score(score: u32) -> Self {
        if score >= STRONG_THRESHOLD {
            QualificationTier::Strong
        } else if score >= MODERATE_THRESHOLD {
            QualificationTier::Moderate
        } else {
            QualificationTier::Weak
        }
    }
}

impl fmt::Display for QualificationTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            QualificationTier::Strong => "strong",
            QualificationTier::Moderate => "moderate",
            QualificationTier::Weak => "weak",
        };
        f.write_str(s)
    }
}

/// Points earned by one weighted element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementScore {
    pub element: MeddpiccElement,
    pub earned: u32,
    pub max: u32,
}

/// An unsatisfied weighted element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualificationGap {
    pub element: MeddpiccElement,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualificationAssessment {
    pub score: u32,
    pub tier: QualificationTier,
    pub breakdown: Vec<ElementScore>,
    pub gaps: Vec<QualificationGap>,
    pub recommendations: Vec<String>,
}

/// Readiness to enter a pipeline stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageGate {
    pub target_stage: String,
    pub ready: bool,
    pub blockers: Vec<String>,
}

/// Stateless MEDDPICC assessor
#[derive(Debug, Clone, Copy, Default)]
pub struct QualificationAssessor;

impl QualificationAssessor {
    pub fn new() -> Self {
        Self
    }

    /// Weighted completeness, 0-100
    pub fn score(&self, profile: &QualificationProfile) -> u32 {
        let earned: u32 = breakdown(profile).iter().map(|e| e.earned).sum();
        earned * 100 / weights::TOTAL
    }

    pub fn assess(&self, profile: &QualificationProfile) -> QualificationAssessment {
        let breakdown = breakdown(profile);
        let score = breakdown.iter().map(|e| e.earned).sum::<u32>() * 100 / weights::TOTAL;

        let mut gaps = Vec::new();
        let mut recommendations = Vec::new();
        for element in breakdown.iter().filter(|e| e.earned == 0) {
            let (description, recommendation) = gap_text(element.element);
            gaps.push(QualificationGap {
                element: element.element,
                description: description.to_string(),
            });
            recommendations.push(recommendation.to_string());
        }

        if champion_points(profile) == weights::CHAMPION_OTHER {
            recommendations.push(
                "Raise your champion's influence: give them a business case to present to leadership"
                    .to_string(),
            );
        }

        tracing::debug!(score, gaps = gaps.len(), "Qualification assessed");

        QualificationAssessment {
            score,
            tier: QualificationTier::from_score(score),
            breakdown,
            gaps,
            recommendations,
        }
    }

    /// Blockers for entering `target_stage`. Only `proposal`, `negotiation`
    /// and `closed_won` have entry criteria; the check is not cumulative.
    pub fn gate_stage(&self, profile: &QualificationProfile, target_stage: &str) -> StageGate {
        let mut blockers = Vec::new();

        match normalize_stage(target_stage).as_str() {
            "proposal" => {
                if !pain_identified(profile) {
                    blockers.push("Pain not identified".to_string());
                }
                if profile.champion.is_none() {
                    blockers.push("No champion identified".to_string());
                }
                if !criteria_defined(profile) {
                    blockers.push("Decision criteria not defined".to_string());
                }
            }
            "negotiation" => {
                if !economic_buyer_identified(profile) {
                    blockers.push("Economic buyer not identified".to_string());
                }
                if !process_mapped(profile) {
                    blockers.push("Decision process not mapped".to_string());
                }
                if !metrics_defined(profile) {
                    blockers.push("Success metrics not defined".to_string());
                }
            }
            "closed_won" => {
                if !paper_process_understood(profile) {
                    blockers.push("Paper process not understood".to_string());
                }
            }
            _ => {}
        }

        StageGate {
            target_stage: target_stage.to_string(),
            ready: blockers.is_empty(),
            blockers,
        }
    }
}

pub fn normalize_stage(stage: &str) -> String {
    stage
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == '-' || c == ' ' { '_' } else { c })
        .collect()
}

fn metrics_defined(p: &QualificationProfile) -> bool {
    p.metrics.as_ref().is_some_and(|m| {
        m.description.as_deref().is_some_and(|d| !d.trim().is_empty())
            || !m.quantified_values.is_empty()
    })
}

fn economic_buyer_identified(p: &QualificationProfile) -> bool {
    p.economic_buyer.as_ref().is_some_and(|eb| eb.identified)
}

fn criteria_defined(p: &QualificationProfile) -> bool {
    p.decision_criteria
        .as_ref()
        .is_some_and(|dc| !dc.criteria.is_empty())
}

fn process_mapped(p: &QualificationProfile) -> bool {
    p.decision_process
        .as_ref()
        .is_some_and(|dp| dp.mapped || !dp.steps.is_empty())
}

fn paper_process_understood(p: &QualificationProfile) -> bool {
    p.paper_process.as_ref().is_some_and(|pp| pp.understood)
}

fn pain_identified(p: &QualificationProfile) -> bool {
    p.pain.as_ref().is_some_and(|pain| pain.identified)
}

fn champion_points(p: &QualificationProfile) -> u32 {
    match &p.champion {
        None => 0,
        Some(c) if c.influence == Influence::High => weights::CHAMPION_HIGH,
        Some(_) => weights::CHAMPION_OTHER,
    }
}

fn breakdown(p: &QualificationProfile) -> Vec<ElementScore> {
    let award = |satisfied: bool, weight: u32| if satisfied { weight } else { 0 };

    vec![
        ElementScore {
            element: MeddpiccElement::Metrics,
            earned: award(metrics_defined(p), weights::METRICS),
            max: weights::METRICS,
        },
        ElementScore {
            element: MeddpiccElement::EconomicBuyer,
            earned: award(economic_buyer_identified(p), weights::ECONOMIC_BUYER),
            max: weights::ECONOMIC_BUYER,
        },
        ElementScore {
            element: MeddpiccElement::DecisionCriteria,
            earned: award(criteria_defined(p), weights::DECISION_CRITERIA),
            max: weights::DECISION_CRITERIA,
        },
        ElementScore {
            element: MeddpiccElement::DecisionProcess,
            earned: award(process_mapped(p), weights::DECISION_PROCESS),
            max: weights::DECISION_PROCESS,
        },
        ElementScore {
            element: MeddpiccElement::PaperProcess,
            earned: award(paper_process_understood(p), weights::PAPER_PROCESS),
            max: weights::PAPER_PROCESS,
        },
        ElementScore {
            element: MeddpiccElement::Pain,
            earned: award(pain_identified(p), weights::PAIN),
            max: weights::PAIN,
        },
        ElementScore {
            element: MeddpiccElement::Champion,
            earned: champion_points(p),
            max: weights::CHAMPION_HIGH,
        },
    ]
}

fn gap_text(element: MeddpiccElement) -> (&'static str, &'static str) {
    match element {
        MeddpiccElement::Metrics => (
            "No quantified success metrics",
            "Agree measurable success metrics and the value the customer expects",
        ),
        MeddpiccElement::EconomicBuyer => (
            "Economic buyer not identified",
            "Identify and get access to the person who controls the budget",
        ),
        MeddpiccElement::DecisionCriteria => (
            "Decision criteria unknown",
            "Document the technical and business criteria the buyer will use to decide",
        ),
        MeddpiccElement::DecisionProcess => (
            "Decision process not mapped",
            "Map every approval step, owner and date between now and signature",
        ),
        MeddpiccElement::PaperProcess => (
            "Paper process not understood",
            "Walk through procurement, legal and security review with the buyer",
        ),
        MeddpiccElement::Pain => (
            "Pain not identified",
            "Run discovery to uncover the business pain and its cost of inaction",
        ),
        MeddpiccElement::Champion => (
            "No champion",
            "Find and develop an internal champion who will sell on your behalf",
        ),
        MeddpiccElement::Competition => (
            "Competitive landscape unknown",
            "Identify competing vendors and the alternatives under consideration",
        ),
    }
}
