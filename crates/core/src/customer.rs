//! Customer health inputs
//!
//! A customer record is flattened into the five health categories, the
//! contract terms used for renewal prediction, and a usage snapshot used for
//! upsell detection.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::levels::Trend;
use crate::record::Record;
use crate::{Error, Result};

/// Health factor category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthCategory {
    Usage,
    Engagement,
    Satisfaction,
    Commercial,
    Support,
}

impl HealthCategory {
    pub const ALL: [HealthCategory; 5] = [
        HealthCategory::Usage,
        HealthCategory::Engagement,
        HealthCategory::Satisfaction,
        HealthCategory::Commercial,
        HealthCategory::Support,
    ];

    /// Record field prefix, e.g. `usage_score`, `usage_trend`
    pub fn field_prefix(&self) -> &'static str {
        match self {
            HealthCategory::Usage => "usage",
            HealthCategory::Engagement => "engagement",
            HealthCategory::Satisfaction => "satisfaction",
            HealthCategory::Commercial => "commercial",
            HealthCategory::Support => "support",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            HealthCategory::Usage => "Product Usage",
            HealthCategory::Engagement => "Engagement",
            HealthCategory::Satisfaction => "Satisfaction",
            HealthCategory::Commercial => "Commercial",
            HealthCategory::Support => "Support",
        }
    }
}

impl fmt::Display for HealthCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// One observed health factor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactorObservation {
    pub category: HealthCategory,
    /// 0-100
    pub score: f64,
    #[serde(default)]
    pub trend: Trend,
    #[serde(default)]
    pub data_points: Vec<String>,
}

/// Health factor observations for one customer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthMetrics {
    pub customer_id: String,
    pub factors: Vec<FactorObservation>,
}

/// Contract terms used for renewal prediction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractTerms {
    pub renewal_date: Option<NaiveDate>,
    pub contract_length_months: Option<u32>,
    /// On-time payment percentage, 0-100
    pub payment_history_score: Option<f64>,
    pub current_arr: f64,
}

/// Product usage snapshot used for upsell detection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSnapshot {
    /// Period-over-period usage growth, in percent
    pub usage_growth_pct: f64,
    /// Feature name → utilization percent (0-100)
    pub feature_utilization: BTreeMap<String, f64>,
    pub current_arr: f64,
}

/// Customer view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub name: Option<String>,
    pub metrics: HealthMetrics,
    pub contract: ContractTerms,
    pub usage: UsageSnapshot,
}

const FEATURE_PREFIX: &str = "feature_";
const FEATURE_SUFFIX: &str = "_utilization";

impl TryFrom<&Record> for Customer {
    type Error = Error;

    fn try_from(record: &Record) -> Result<Self> {
        let id = record.require_text("id")?;

        let mut factors = Vec::new();
        for category in HealthCategory::ALL {
            let prefix = category.field_prefix();
            let score_field = format!("{}_score", prefix);
            let Some(score) = record.optional_number(&score_field)? else {
                continue;
            };
            if !(0.0..=100.0).contains(&score) {
                return Err(Error::validation(
                    score_field,
                    format!("must be between 0 and 100, got {}", score),
                ));
            }

            let trend_field = format!("{}_trend", prefix);
            let trend = match record.optional_text(&trend_field)? {
                None => Trend::Stable,
                Some(raw) => Trend::parse(&raw).ok_or_else(|| {
                    Error::validation(&trend_field, format!("unknown trend \"{}\"", raw))
                })?,
            };

            let data_points = record.optional_list(&format!("{}_notes", prefix))?;

            factors.push(FactorObservation {
                category,
                score,
                trend,
                data_points,
            });
        }

        let arr = match record.optional_number("arr")? {
            Some(arr) => arr,
            None => record.optional_number("annual_revenue")?.unwrap_or(0.0),
        };

        let contract = ContractTerms {
            renewal_date: record.optional_date("renewal_date")?,
            contract_length_months: record.optional_count("contract_length_months")?,
            payment_history_score: record.optional_number("payment_history_score")?,
            current_arr: arr,
        };

        let mut feature_utilization = BTreeMap::new();
        for (field, value) in record.with_prefix(FEATURE_PREFIX) {
            let Some(feature) = field
                .strip_prefix(FEATURE_PREFIX)
                .and_then(|rest| rest.strip_suffix(FEATURE_SUFFIX))
            else {
                continue;
            };
            let pct = value.as_number().ok_or_else(|| {
                Error::validation(field, format!("expected a number, got {}", value))
            })?;
            feature_utilization.insert(feature.to_string(), pct);
        }

        let usage = UsageSnapshot {
            usage_growth_pct: record.optional_number("usage_growth_pct")?.unwrap_or(0.0),
            feature_utilization,
            current_arr: arr,
        };

        Ok(Self {
            metrics: HealthMetrics {
                customer_id: id.clone(),
                factors,
            },
            id,
            name: record.optional_text("name")?,
            contract,
            usage,
        })
    }
}
