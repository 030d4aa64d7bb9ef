//! Deterministic insight bodies
//!
//! Maps the scoring engines' output onto the wire contracts. Used whenever
//! the model is unavailable or its reply is rejected.

use chrono::NaiveDate;
use std::collections::BTreeSet;

use dealscope_core::{Contact, Customer, Lead, Opportunity, ScoringRule};
use dealscope_scoring::criteria::matches;
use dealscope_scoring::{
    CriteriaEvaluator, DealContext, HealthScoringEngine, RiskAndActionAdvisor,
};

use crate::contracts::{
    ChampionInsight, ChurnRisk, CustomerHealthInsight, DealRiskInsight, HealthFactorSummary,
    InsightBody, InsightKind, LeadScoreInsight, NextBestActionInsight, ScoringFactor,
};
use crate::request::Subject;
use crate::InsightError;

const LOW_RISK_TIMEFRAME: &str = "no churn expected within 12 months";

impl Subject {
    pub(crate) fn deterministic(
        &self,
        kind: InsightKind,
        as_of: NaiveDate,
    ) -> Result<InsightBody, InsightError> {
        Ok(match (kind, self) {
            (InsightKind::LeadScore, Subject::Lead { lead, rules }) => {
                InsightBody::LeadScore(lead_score(lead, rules))
            }
            (InsightKind::DealRisk, Subject::Deal(opportunity)) => {
                InsightBody::DealRisk(deal_risk(opportunity, as_of))
            }
            (InsightKind::NextBestAction, Subject::Deal(opportunity)) => {
                InsightBody::NextBestAction(next_best_action(opportunity, as_of))
            }
            (InsightKind::Champions, Subject::Contacts(contacts)) => {
                InsightBody::Champions(champions(contacts))
            }
            (InsightKind::CustomerHealth, Subject::Customer(customer)) => {
                InsightBody::CustomerHealth(customer_health(customer, as_of)?)
            }
            (kind, _) => {
                return Err(InsightError::Configuration(format!(
                    "no deterministic path for {} with this subject",
                    kind
                )))
            }
        })
    }
}

pub fn lead_score(lead: &Lead, rules: &[ScoringRule]) -> LeadScoreInsight {
    let evaluator = CriteriaEvaluator::new();
    let predicted_score = evaluator.score(&lead.record, rules);

    let scoring_factors = evaluator
        .explain(&lead.record, rules)
        .into_iter()
        .map(|e| ScoringFactor {
            factor: e.rule_name,
            impact: e.points_awarded,
            reasoning: e.matched_reason,
        })
        .collect();

    let mut recommendations = vec![if predicted_score >= 70 {
        "Route to sales for immediate outreach".to_string()
    } else if predicted_score >= 40 {
        "Nurture with targeted content until buying signals firm up".to_string()
    } else {
        "Qualify further before investing sales time".to_string()
    }];
    recommendations.extend(
        rules
            .iter()
            .filter(|rule| rule.active)
            .filter(|rule| !rule.criteria.iter().any(|c| matches(c, &lead.record)))
            .map(|rule| format!("Collect the details needed to evaluate {}", rule.name)),
    );

    LeadScoreInsight {
        predicted_score,
        confidence_level: data_coverage(lead, rules),
        scoring_factors,
        recommendations,
    }
}

/// Share of the fields the active rules read that the lead carries
fn data_coverage(lead: &Lead, rules: &[ScoringRule]) -> u32 {
    let fields: BTreeSet<&str> = rules
        .iter()
        .filter(|rule| rule.active)
        .flat_map(|rule| rule.criteria.iter().map(|c| c.field.as_str()))
        .collect();
    if fields.is_empty() {
        return 0;
    }
    let present = fields
        .iter()
        .filter(|field| lead.record.is_present(field))
        .count();
    ((present as f64 / fields.len() as f64) * 100.0).round() as u32
}

pub fn deal_risk(opportunity: &Opportunity, as_of: NaiveDate) -> DealRiskInsight {
    let profile =
        RiskAndActionAdvisor::new().assess_risk(&DealContext::from_opportunity(opportunity, as_of));
    DealRiskInsight {
        risk_level: profile.risk_level,
        risk_score: profile.risk_score,
        risk_factors: profile.risk_factors,
        recommendations: profile.recommendations,
        time_to_close: profile.time_to_close_days,
    }
}

pub fn next_best_action(opportunity: &Opportunity, as_of: NaiveDate) -> NextBestActionInsight {
    RiskAndActionAdvisor::new().next_best_action(&DealContext::from_opportunity(opportunity, as_of))
}

pub fn champions(contacts: &[Contact]) -> ChampionInsight {
    RiskAndActionAdvisor::new().detect_champions(contacts)
}

pub fn customer_health(
    customer: &Customer,
    as_of: NaiveDate,
) -> Result<CustomerHealthInsight, InsightError> {
    let engine = HealthScoringEngine::new();
    let health = engine.score(&customer.metrics)?;

    let health_factors = health
        .factors
        .iter()
        .map(|f| HealthFactorSummary {
            factor: f.category.display_name().to_string(),
            score: f.score.round() as u32,
            trend: f.trend,
        })
        .collect();

    let mut recommendations = health.recommendations.clone();
    let churn_risk = match engine.assess_churn_risk(&health) {
        Some(alert) => {
            recommendations.extend(alert.playbook);
            ChurnRisk {
                probability: alert.risk_score,
                timeframe: format!("{} days", alert.time_to_churn_days),
                triggers: alert.triggers,
            }
        }
        None => ChurnRisk {
            probability: 100u32.saturating_sub(health.overall_score),
            timeframe: LOW_RISK_TIMEFRAME.to_string(),
            triggers: Vec::new(),
        },
    };

    if customer.contract.renewal_date.is_some() {
        let renewal = engine.predict_renewal(&health, &customer.contract, as_of)?;
        recommendations.push(format!(
            "Renewal in {} days with {}% predicted probability",
            renewal.days_until_renewal, renewal.probability
        ));
    }

    let expansion_opportunities = engine
        .find_upsell(&health, &customer.usage)
        .into_iter()
        .map(|o| format!("{}: {} (est. {:.0})", o.product, o.reason, o.estimated_value))
        .collect();

    Ok(CustomerHealthInsight {
        health_score: health.overall_score,
        risk_level: health.risk_level,
        health_factors,
        churn_risk,
        recommendations,
        expansion_opportunities,
    })
}
