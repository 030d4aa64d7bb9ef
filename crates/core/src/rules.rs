//! Scoring rule definitions
//!
//! Rules are plain data: they are loaded from configuration or supplied per
//! request, and evaluated by the scoring crate.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::record::FieldValue;

/// Comparison a criterion applies to one record field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Equals,
    Contains,
    GreaterThan,
    LessThan,
    NotEmpty,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Equals => "equals",
            Operator::Contains => "contains",
            Operator::GreaterThan => "greater_than",
            Operator::LessThan => "less_than",
            Operator::NotEmpty => "not_empty",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One weighted predicate over a record field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Criterion {
    pub field: String,
    pub operator: Operator,
    /// Unused by `not_empty`
    #[serde(default)]
    pub comparison_value: FieldValue,
    pub points: i64,
}

impl Criterion {
    pub fn new(
        field: impl Into<String>,
        operator: Operator,
        comparison_value: impl Into<FieldValue>,
        points: i64,
    ) -> Self {
        Self {
            field: field.into(),
            operator,
            comparison_value: comparison_value.into(),
            points,
        }
    }

    pub fn not_empty(field: impl Into<String>, points: i64) -> Self {
        Self {
            field: field.into(),
            operator: Operator::NotEmpty,
            comparison_value: FieldValue::Null,
            points,
        }
    }
}

/// Named, ordered group of criteria
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringRule {
    pub id: String,
    pub name: String,
    pub criteria: Vec<Criterion>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl ScoringRule {
    pub fn new(id: impl Into<String>, name: impl Into<String>, criteria: Vec<Criterion>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            criteria,
            active: true,
        }
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_wire_format() {
        let rule: ScoringRule = serde_json::from_str(
            r#"{
                "id": "r1",
                "name": "Enterprise",
                "criteria": [
                    {"field": "company_size", "operator": "greater_than", "comparisonValue": 500, "points": 25},
                    {"field": "email", "operator": "not_empty", "points": 5}
                ]
            }"#,
        )
        .unwrap();

        assert!(rule.active);
        assert_eq!(rule.criteria[0].operator, Operator::GreaterThan);
        assert_eq!(rule.criteria[0].comparison_value, FieldValue::Number(500.0));
        assert_eq!(rule.criteria[1].comparison_value, FieldValue::Null);
    }
}
