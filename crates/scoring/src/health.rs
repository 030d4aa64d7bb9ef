//! Customer health scoring
//!
//! Five weighted categories (usage 30, engagement 25, satisfaction 20,
//! commercial 15, support 10) feed an overall score, which then drives
//! renewal prediction, churn alerting and expansion detection.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use dealscope_core::{
    ContractTerms, Error, FactorObservation, HealthCategory, HealthMetrics, Result, RiskLevel,
    Trend, UsageSnapshot,
};

/// Factors below this score carry recommendations
const ATTENTION_BELOW: f64 = 70.0;
/// Factors below this score count as churn triggers
const CHURN_TRIGGER_BELOW: f64 = 60.0;

const EXPANSION_MIN_HEALTH: u32 = 80;
const EXPANSION_MIN_GROWTH_PCT: f64 = 20.0;

pub fn category_weight(category: HealthCategory) -> u32 {
    match category {
        HealthCategory::Usage => 30,
        HealthCategory::Engagement => 25,
        HealthCategory::Satisfaction => 20,
        HealthCategory::Commercial => 15,
        HealthCategory::Support => 10,
    }
}

/// Cross-sell catalogue: feature, utilization threshold (%), estimated value
pub const CROSS_SELL_CATALOGUE: &[(&str, f64, f64)] = &[
    ("analytics", 30.0, 15_000.0),
    ("automation", 40.0, 12_000.0),
    ("integrations", 25.0, 10_000.0),
    ("reporting", 35.0, 8_000.0),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthFactor {
    pub category: HealthCategory,
    pub score: f64,
    pub weight: u32,
    pub trend: Trend,
    pub data_points: Vec<String>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerHealthRecord {
    pub customer_id: String,
    pub overall_score: u32,
    pub risk_level: RiskLevel,
    pub trend: Trend,
    pub factors: Vec<HealthFactor>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenewalPrediction {
    pub customer_id: String,
    pub renewal_date: NaiveDate,
    pub days_until_renewal: i64,
    pub probability: u32,
    pub renewal_value: f64,
    /// Adjustments applied to the base probability
    pub factors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChurnAlert {
    pub customer_id: String,
    pub risk_level: RiskLevel,
    pub risk_score: u32,
    pub time_to_churn_days: u32,
    pub triggers: Vec<String>,
    pub playbook: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsellKind {
    Expansion,
    CrossSell,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsellOpportunity {
    pub kind: UpsellKind,
    pub product: String,
    pub reason: String,
    pub estimated_value: f64,
}

/// Risk level on the health scale (high health, low risk)
pub fn health_risk_level(score: u32) -> RiskLevel {
    if score >= 80 {
        RiskLevel::Low
    } else if score >= 60 {
        RiskLevel::Medium
    } else if score >= 40 {
        RiskLevel::High
    } else {
        RiskLevel::Critical
    }
}

/// Stateless health engine
#[derive(Debug, Clone, Copy, Default)]
pub struct HealthScoringEngine;

impl HealthScoringEngine {
    pub fn new() -> Self {
        Self
    }

    /// Weighted health over the supplied categories
    pub fn score(&self, metrics: &HealthMetrics) -> Result<CustomerHealthRecord> {
        if metrics.factors.is_empty() {
            return Err(Error::validation(
                "factors",
                "at least one health factor is required",
            ));
        }

        let mut seen = HashSet::new();
        for observation in &metrics.factors {
            validate_observation(observation)?;
            if !seen.insert(observation.category) {
                return Err(Error::validation(
                    "factors",
                    format!("duplicate category {}", observation.category.field_prefix()),
                ));
            }
        }

        let weight_sum: u32 = metrics
            .factors
            .iter()
            .map(|f| category_weight(f.category))
            .sum();
        let weighted: f64 = metrics
            .factors
            .iter()
            .map(|f| f.score * category_weight(f.category) as f64)
            .sum();
        let overall_score = (weighted / weight_sum as f64).round() as u32;

        let factors: Vec<HealthFactor> = metrics
            .factors
            .iter()
            .map(|f| HealthFactor {
                category: f.category,
                score: f.score,
                weight: category_weight(f.category),
                trend: f.trend,
                data_points: f.data_points.clone(),
                recommendations: if f.score < ATTENTION_BELOW {
                    factor_recommendations(f.category)
                        .iter()
                        .map(|s| s.to_string())
                        .collect()
                } else {
                    Vec::new()
                },
            })
            .collect();

        let recommendations = factors
            .iter()
            .flat_map(|f| f.recommendations.iter().cloned())
            .collect();

        let risk_level = health_risk_level(overall_score);

        tracing::debug!(
            customer_id = %metrics.customer_id,
            overall_score,
            risk_level = %risk_level,
            categories = factors.len(),
            "Customer health scored"
        );

        Ok(CustomerHealthRecord {
            customer_id: metrics.customer_id.clone(),
            overall_score,
            risk_level,
            trend: overall_trend(&metrics.factors),
            factors,
            recommendations,
        })
    }

    pub fn predict_renewal(
        &self,
        health: &CustomerHealthRecord,
        contract: &ContractTerms,
        as_of: NaiveDate,
    ) -> Result<RenewalPrediction> {
        let renewal_date = contract
            .renewal_date
            .ok_or_else(|| Error::validation("renewal_date", "required for renewal prediction"))?;

        let score = health.overall_score;
        let base: i64 = if score >= 90 {
            95
        } else if score >= 80 {
            85
        } else if score >= 70 {
            75
        } else if score >= 60 {
            60
        } else if score >= 50 {
            40
        } else {
            20
        };

        let mut probability = base;
        let mut factors = vec![format!("Health score {} sets base probability {}%", score, base)];

        match contract.contract_length_months {
            Some(months) if months >= 36 => {
                probability += 10;
                factors.push(format!("Multi-year contract ({} months) +10", months));
            }
            Some(months) if months <= 12 => {
                probability -= 5;
                factors.push(format!("Short contract ({} months) -5", months));
            }
            _ => {}
        }

        match contract.payment_history_score {
            Some(p) if p >= 95.0 => {
                probability += 5;
                factors.push(format!("Strong payment history ({}%) +5", p));
            }
            Some(p) if p <= 80.0 => {
                probability -= 10;
                factors.push(format!("Weak payment history ({}%) -10", p));
            }
            _ => {}
        }

        let multiplier = if score >= 90 {
            1.2
        } else if score >= 80 {
            1.1
        } else if score <= 50 {
            0.8
        } else {
            1.0
        };

        Ok(RenewalPrediction {
            customer_id: health.customer_id.clone(),
            renewal_date,
            days_until_renewal: (renewal_date - as_of).num_days(),
            probability: probability.clamp(0, 100) as u32,
            renewal_value: contract.current_arr * multiplier,
            factors,
        })
    }

    /// Alert for any risk level above low
    pub fn assess_churn_risk(&self, health: &CustomerHealthRecord) -> Option<ChurnAlert> {
        if health.risk_level == RiskLevel::Low {
            return None;
        }

        let risk_score = 100u32.saturating_sub(health.overall_score);
        let time_to_churn_days = if risk_score >= 80 {
            30
        } else if risk_score >= 60 {
            90
        } else if risk_score >= 40 {
            180
        } else {
            365
        };

        let triggers = health
            .factors
            .iter()
            .filter_map(|f| match (f.trend, f.score < CHURN_TRIGGER_BELOW) {
                (Trend::Down, true) => Some(format!(
                    "{} declining and low ({:.0})",
                    f.category, f.score
                )),
                (Trend::Down, false) => Some(format!("{} declining", f.category)),
                (_, true) => Some(format!("{} low ({:.0})", f.category, f.score)),
                _ => None,
            })
            .collect();

        tracing::info!(
            customer_id = %health.customer_id,
            risk_level = %health.risk_level,
            risk_score,
            "Churn alert raised"
        );

        Some(ChurnAlert {
            customer_id: health.customer_id.clone(),
            risk_level: health.risk_level,
            risk_score,
            time_to_churn_days,
            triggers,
            playbook: churn_playbook(health.risk_level)
                .iter()
                .map(|s| s.to_string())
                .collect(),
        })
    }

    pub fn find_upsell(
        &self,
        health: &CustomerHealthRecord,
        usage: &UsageSnapshot,
    ) -> Vec<UpsellOpportunity> {
        let mut opportunities = Vec::new();

        if health.overall_score > EXPANSION_MIN_HEALTH
            && usage.usage_growth_pct > EXPANSION_MIN_GROWTH_PCT
        {
            opportunities.push(UpsellOpportunity {
                kind: UpsellKind::Expansion,
                product: "Plan upgrade".to_string(),
                reason: format!(
                    "Healthy account ({}) with usage up {:.0}%",
                    health.overall_score, usage.usage_growth_pct
                ),
                estimated_value: (usage.current_arr * usage.usage_growth_pct / 100.0).round(),
            });
        }

        for (feature, threshold, value) in CROSS_SELL_CATALOGUE {
            let Some(utilization) = usage.feature_utilization.get(*feature) else {
                continue;
            };
            if *utilization < *threshold {
                opportunities.push(UpsellOpportunity {
                    kind: UpsellKind::CrossSell,
                    product: feature.to_string(),
                    reason: format!(
                        "{} utilization {:.0}% is under {:.0}%",
                        feature, utilization, threshold
                    ),
                    estimated_value: *value,
                });
            }
        }

        opportunities
    }
}

fn validate_observation(observation: &FactorObservation) -> Result<()> {
    if !observation.score.is_finite() || !(0.0..=100.0).contains(&observation.score) {
        return Err(Error::validation(
            format!("factors.{}.score", observation.category.field_prefix()),
            format!("must be between 0 and 100, got {}", observation.score),
        ));
    }
    Ok(())
}

/// Direction with the largest cumulative weight; ties resolve to stable
fn overall_trend(factors: &[FactorObservation]) -> Trend {
    let weight_of = |trend: Trend| -> u32 {
        factors
            .iter()
            .filter(|f| f.trend == trend)
            .map(|f| category_weight(f.category))
            .sum()
    };
    let (up, down, stable) = (
        weight_of(Trend::Up),
        weight_of(Trend::Down),
        weight_of(Trend::Stable),
    );

    if up > down && up > stable {
        Trend::Up
    } else if down > up && down > stable {
        Trend::Down
    } else {
        Trend::Stable
    }
}

fn factor_recommendations(category: HealthCategory) -> &'static [&'static str] {
    match category {
        HealthCategory::Usage => &[
            "Run an adoption workshop for under-used features",
            "Set usage goals with the customer's admin",
        ],
        HealthCategory::Engagement => &[
            "Re-establish a regular cadence with the executive sponsor",
            "Invite key users to the next customer advisory session",
        ],
        HealthCategory::Satisfaction => &[
            "Follow up on recent detractor feedback",
            "Schedule a success review to agree improvement priorities",
        ],
        HealthCategory::Commercial => &[
            "Review invoicing and payment terms with finance",
            "Confirm budget ownership ahead of renewal",
        ],
        HealthCategory::Support => &[
            "Review open escalations with the support lead",
            "Offer a technical health check",
        ],
    }
}

fn churn_playbook(level: RiskLevel) -> &'static [&'static str] {
    match level {
        RiskLevel::Low => &[],
        RiskLevel::Medium => &[
            "Schedule a success check-in within two weeks",
            "Review adoption of key features with the customer",
        ],
        RiskLevel::High => &[
            "Escalate to the executive sponsor",
            "Agree a recovery plan with dated milestones",
            "Run a product health review with the customer",
        ],
        RiskLevel::Critical => &[
            "Hold an executive-to-executive call within 48 hours",
            "Assign a dedicated recovery team",
            "Prepare a commercial retention offer",
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn observation(category: HealthCategory, score: f64, trend: Trend) -> FactorObservation {
        FactorObservation {
            category,
            score,
            trend,
            data_points: vec![],
        }
    }

    fn metrics(scores: [f64; 5]) -> HealthMetrics {
        HealthMetrics {
            customer_id: "cust-1".to_string(),
            factors: HealthCategory::ALL
                .iter()
                .zip(scores)
                .map(|(c, s)| observation(*c, s, Trend::Stable))
                .collect(),
        }
    }

    fn record_with_score(score: u32) -> CustomerHealthRecord {
        CustomerHealthRecord {
            customer_id: "cust-1".to_string(),
            overall_score: score,
            risk_level: health_risk_level(score),
            trend: Trend::Stable,
            factors: vec![],
            recommendations: vec![],
        }
    }

    #[test]
    fn test_weighted_score() {
        let health = HealthScoringEngine::new()
            .score(&metrics([75.0, 82.0, 88.0, 76.0, 71.0]))
            .unwrap();
        assert_eq!(health.overall_score, 79);
        assert_eq!(health.risk_level, RiskLevel::Medium);
        assert!(health.recommendations.is_empty());
    }

    #[test]
    fn test_missing_categories_use_present_weights() {
        let partial = HealthMetrics {
            customer_id: "c".to_string(),
            factors: vec![
                observation(HealthCategory::Usage, 90.0, Trend::Up),
                observation(HealthCategory::Support, 50.0, Trend::Down),
            ],
        };
        // (90*30 + 50*10) / 40 = 80
        let health = HealthScoringEngine::new().score(&partial).unwrap();
        assert_eq!(health.overall_score, 80);
        assert_eq!(health.trend, Trend::Up);
        assert_eq!(health.factors[1].recommendations.len(), 2);
    }

    #[test]
    fn test_no_factors_is_validation_error() {
        let empty = HealthMetrics {
            customer_id: "c".to_string(),
            factors: vec![],
        };
        assert!(HealthScoringEngine::new()
            .score(&empty)
            .unwrap_err()
            .is_validation());
    }

    #[test]
    fn test_out_of_range_factor_rejected() {
        let err = HealthScoringEngine::new()
            .score(&metrics([75.0, 101.0, 88.0, 76.0, 71.0]))
            .unwrap_err();
        assert!(err.to_string().contains("factors.engagement.score"));
    }

    #[test]
    fn test_trend_ties_favor_stable() {
        let factors = vec![
            observation(HealthCategory::Usage, 50.0, Trend::Up),
            observation(HealthCategory::Engagement, 50.0, Trend::Down),
            observation(HealthCategory::Support, 50.0, Trend::Down),
        ];
        // up 30 vs down 35
        assert_eq!(overall_trend(&factors), Trend::Down);

        let mixed = vec![
            observation(HealthCategory::Usage, 50.0, Trend::Up),
            observation(HealthCategory::Engagement, 50.0, Trend::Down),
            observation(HealthCategory::Commercial, 50.0, Trend::Stable),
            observation(HealthCategory::Support, 50.0, Trend::Down),
        ];
        // up 30, down 35, stable 15
        assert_eq!(overall_trend(&mixed), Trend::Down);

        let even = vec![
            observation(HealthCategory::Usage, 50.0, Trend::Up),
            observation(HealthCategory::Engagement, 50.0, Trend::Down),
            observation(HealthCategory::Support, 50.0, Trend::Up),
            observation(HealthCategory::Commercial, 50.0, Trend::Down),
        ];
        // up 40, down 40
        assert_eq!(overall_trend(&even), Trend::Stable);
    }

    #[test]
    fn test_renewal_probability_is_clamped() {
        let contract = ContractTerms {
            renewal_date: NaiveDate::from_ymd_opt(2024, 12, 31),
            contract_length_months: Some(36),
            payment_history_score: Some(96.0),
            current_arr: 100_000.0,
        };
        let as_of = NaiveDate::from_ymd_opt(2024, 12, 1).unwrap();

        let prediction = HealthScoringEngine::new()
            .predict_renewal(&record_with_score(85), &contract, as_of)
            .unwrap();
        assert_eq!(prediction.probability, 100);
        assert_eq!(prediction.days_until_renewal, 30);
        assert!((prediction.renewal_value - 110_000.0).abs() < 1e-6);
        assert_eq!(prediction.factors.len(), 3);
    }

    #[test]
    fn test_renewal_penalties() {
        let contract = ContractTerms {
            renewal_date: NaiveDate::from_ymd_opt(2025, 1, 1),
            contract_length_months: Some(12),
            payment_history_score: Some(70.0),
            current_arr: 50_000.0,
        };
        let as_of = NaiveDate::from_ymd_opt(2024, 12, 1).unwrap();

        let prediction = HealthScoringEngine::new()
            .predict_renewal(&record_with_score(45), &contract, as_of)
            .unwrap();
        // 20 - 5 - 10
        assert_eq!(prediction.probability, 5);
        assert!((prediction.renewal_value - 40_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_renewal_requires_date() {
        let err = HealthScoringEngine::new()
            .predict_renewal(
                &record_with_score(85),
                &ContractTerms::default(),
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            )
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_churn_alert_only_above_low_risk() {
        let engine = HealthScoringEngine::new();
        for score in [0u32, 25, 39, 40, 59, 60, 79, 80, 95, 100] {
            let health = record_with_score(score);
            let alert = engine.assess_churn_risk(&health);
            assert_eq!(alert.is_none(), health.risk_level == RiskLevel::Low, "score {}", score);
        }
    }

    #[test]
    fn test_churn_alert_contents() {
        let mut health = record_with_score(35);
        health.factors = vec![HealthFactor {
            category: HealthCategory::Usage,
            score: 40.0,
            weight: 30,
            trend: Trend::Down,
            data_points: vec![],
            recommendations: vec![],
        }];

        let alert = HealthScoringEngine::new().assess_churn_risk(&health).unwrap();
        assert_eq!(alert.risk_level, RiskLevel::Critical);
        assert_eq!(alert.risk_score, 65);
        assert_eq!(alert.time_to_churn_days, 90);
        assert_eq!(alert.triggers.len(), 1);
        assert_eq!(alert.playbook.len(), 3);
    }

    #[test]
    fn test_find_upsell() {
        let mut feature_utilization = BTreeMap::new();
        feature_utilization.insert("analytics".to_string(), 18.0);
        feature_utilization.insert("automation".to_string(), 64.0);
        feature_utilization.insert("reporting".to_string(), 10.0);

        let usage = UsageSnapshot {
            usage_growth_pct: 32.0,
            feature_utilization,
            current_arr: 100_000.0,
        };

        let opportunities = HealthScoringEngine::new().find_upsell(&record_with_score(85), &usage);
        let kinds: Vec<(UpsellKind, &str)> = opportunities
            .iter()
            .map(|o| (o.kind, o.product.as_str()))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (UpsellKind::Expansion, "Plan upgrade"),
                (UpsellKind::CrossSell, "analytics"),
                (UpsellKind::CrossSell, "reporting"),
            ]
        );
        assert_eq!(opportunities[0].estimated_value, 32_000.0);
        assert_eq!(opportunities[1].estimated_value, 15_000.0);

        // no expansion at exactly 80 health
        let none = HealthScoringEngine::new().find_upsell(&record_with_score(80), &usage);
        assert!(none.iter().all(|o| o.kind == UpsellKind::CrossSell));
    }
}
