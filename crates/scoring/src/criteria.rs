//! Rule-based record scoring
//!
//! Every criterion of every active rule is evaluated independently against
//! the record; matched points are summed and the total clamped to 0-100.

use serde::{Deserialize, Serialize};

use dealscope_core::{Criterion, FieldValue, Operator, Record, ScoringRule};

/// Upper bound of a rule-based score
pub const MAX_SCORE: i64 = 100;

const NO_MATCH_REASON: &str = "no criteria matched";

/// Points one rule contributed, with a reason per matched criterion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleExplanation {
    pub rule_name: String,
    pub points_awarded: i64,
    pub matched_reason: String,
}

/// Stateless evaluator for [`ScoringRule`] sets
#[derive(Debug, Clone, Copy, Default)]
pub struct CriteriaEvaluator;

impl CriteriaEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// Capped point total of all matched criteria across active rules
    pub fn score(&self, record: &Record, rules: &[ScoringRule]) -> u32 {
        let total: i64 = rules
            .iter()
            .filter(|rule| rule.active)
            .flat_map(|rule| rule.criteria.iter())
            .filter(|criterion| matches(criterion, record))
            .map(|criterion| criterion.points)
            .fold(0i64, i64::saturating_add);

        total.clamp(0, MAX_SCORE) as u32
    }

    /// One entry per active rule, in rule order
    pub fn explain(&self, record: &Record, rules: &[ScoringRule]) -> Vec<RuleExplanation> {
        rules
            .iter()
            .filter(|rule| rule.active)
            .map(|rule| {
                let matched: Vec<&Criterion> = rule
                    .criteria
                    .iter()
                    .filter(|criterion| matches(criterion, record))
                    .collect();

                let matched_reason = if matched.is_empty() {
                    NO_MATCH_REASON.to_string()
                } else {
                    matched
                        .iter()
                        .map(|c| describe(c))
                        .collect::<Vec<_>>()
                        .join("; ")
                };

                RuleExplanation {
                    rule_name: rule.name.clone(),
                    points_awarded: matched
                        .iter()
                        .map(|c| c.points)
                        .fold(0i64, i64::saturating_add),
                    matched_reason,
                }
            })
            .collect()
    }
}

/// Whether one criterion holds for the record
pub fn matches(criterion: &Criterion, record: &Record) -> bool {
    let value = record.get(&criterion.field);
    let expected = &criterion.comparison_value;

    match criterion.operator {
        Operator::Equals => value.is_some_and(|v| v == expected),
        Operator::Contains => match (value.and_then(FieldValue::as_text), expected.as_text()) {
            (Some(haystack), Some(needle)) => haystack
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            _ => false,
        },
        Operator::GreaterThan => compare(value, expected).is_some_and(|(a, b)| a > b),
        Operator::LessThan => compare(value, expected).is_some_and(|(a, b)| a < b),
        Operator::NotEmpty => value.is_some_and(|v| !v.is_blank()),
    }
}

fn compare(value: Option<&FieldValue>, expected: &FieldValue) -> Option<(f64, f64)> {
    Some((value?.as_number()?, expected.as_number()?))
}

fn describe(criterion: &Criterion) -> String {
    let field = &criterion.field;
    let expected = &criterion.comparison_value;
    match criterion.operator {
        Operator::Equals => format!("{} equals {} ({:+})", field, expected, criterion.points),
        Operator::Contains => format!("{} contains {} ({:+})", field, expected, criterion.points),
        Operator::GreaterThan => format!("{} > {} ({:+})", field, expected, criterion.points),
        Operator::LessThan => format!("{} < {} ({:+})", field, expected, criterion.points),
        Operator::NotEmpty => format!("{} is present ({:+})", field, criterion.points),
    }
}
