//! Lead Scoring Rule Catalogue
//!
//! The rule set the deterministic lead scorer applies when a request does
//! not carry its own rules. Deployments can replace it with a YAML file:
//!
//! ```yaml
//! rules:
//!   - id: company-fit
//!     name: Company fit
//!     criteria:
//!       - { field: company_size, operator: greater_than, comparisonValue: 100, points: 20 }
//! ```

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::Path;

use dealscope_core::{Criterion, Operator, ScoringRule};

use crate::{ConfigError, ScoringSettings};

static BUILT_IN: Lazy<LeadScoringRules> = Lazy::new(|| LeadScoringRules {
    rules: vec![
        ScoringRule::new(
            "company-fit",
            "Company fit",
            vec![
                Criterion::new("company_size", Operator::GreaterThan, 100, 15),
                Criterion::new("company_size", Operator::GreaterThan, 1000, 10),
                Criterion::not_empty("industry", 5),
            ],
        ),
        ScoringRule::new(
            "buying-authority",
            "Buying authority",
            vec![
                Criterion::new("title", Operator::Contains, "chief", 20),
                Criterion::new("title", Operator::Contains, "vp", 15),
                Criterion::new("title", Operator::Contains, "director", 10),
                Criterion::new("title", Operator::Contains, "head of", 10),
            ],
        ),
        ScoringRule::new(
            "budget",
            "Budget",
            vec![
                Criterion::new("budget", Operator::GreaterThan, 50_000, 15),
                Criterion::new("budget", Operator::GreaterThan, 250_000, 10),
            ],
        ),
        ScoringRule::new(
            "contactability",
            "Contact details",
            vec![
                Criterion::not_empty("email", 5),
                Criterion::not_empty("phone", 5),
            ],
        ),
        ScoringRule::new(
            "source-quality",
            "Lead source",
            vec![
                Criterion::new("source", Operator::Equals, "referral", 15),
                Criterion::new("source", Operator::Equals, "demo_request", 15),
                Criterion::new("source", Operator::Equals, "webinar", 5),
            ],
        ),
        ScoringRule::new(
            "engagement",
            "Engagement",
            vec![
                Criterion::new("website_visits", Operator::GreaterThan, 5, 10),
                Criterion::new("email_opens", Operator::GreaterThan, 3, 5),
            ],
        ),
    ],
});

/// Lead-scoring rules, evaluated in order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadScoringRules {
    pub rules: Vec<ScoringRule>,
}

impl Default for LeadScoringRules {
    fn default() -> Self {
        BUILT_IN.clone()
    }
}

impl LeadScoringRules {
    /// Built-in catalogue without cloning
    pub fn built_in() -> &'static LeadScoringRules {
        &BUILT_IN
    }

    /// Load from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileNotFound(format!("{}: {}", path.display(), e)))?;

        let catalogue: LeadScoringRules = serde_yaml::from_str(&content)?;
        catalogue.validate()?;

        tracing::info!(
            path = %path.display(),
            rules = catalogue.rules.len(),
            "Loaded lead scoring rules"
        );
        Ok(catalogue)
    }

    /// Catalogue named by settings, or the built-in one
    pub fn from_settings(settings: &ScoringSettings) -> Result<Self, ConfigError> {
        match &settings.rules_path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Rules currently switched on
    pub fn active(&self) -> impl Iterator<Item = &ScoringRule> {
        self.rules.iter().filter(|r| r.active)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = std::collections::HashSet::new();
        for rule in &self.rules {
            if rule.id.trim().is_empty() {
                return Err(ConfigError::MissingField("rules[].id".to_string()));
            }
            if !seen.insert(rule.id.as_str()) {
                return Err(ConfigError::invalid(
                    "rules",
                    format!("duplicate rule id '{}'", rule.id),
                ));
            }
            if let Some(c) = rule.criteria.iter().find(|c| c.field.trim().is_empty()) {
                return Err(ConfigError::invalid(
                    "rules[].criteria[].field",
                    format!("blank field in rule '{}' ({} criterion)", rule.id, c.operator),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_built_in_catalogue() {
        let rules = LeadScoringRules::default();
        assert_eq!(rules.rules.len(), 6);
        assert_eq!(rules.active().count(), 6);
        assert!(rules.validate().is_ok());
    }

    #[test]
    fn test_load_from_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"rules:
  - id: size
    name: Company size
    criteria:
      - {{ field: company_size, operator: greater_than, comparisonValue: 50, points: 30 }}
  - id: legacy
    name: Legacy rule
    active: false
    criteria:
      - {{ field: fax, operator: not_empty, points: 5 }}
"#
        )
        .unwrap();

        let rules = LeadScoringRules::load(file.path()).unwrap();
        assert_eq!(rules.rules.len(), 2);
        assert_eq!(rules.active().count(), 1);
        assert_eq!(rules.rules[0].criteria[0].points, 30);
    }

    #[test]
    fn test_shipped_catalogue_loads() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../config/lead_rules.yaml");
        let rules = LeadScoringRules::load(path).unwrap();
        assert_eq!(rules.rules.len(), 5);
        assert_eq!(rules.active().count(), 4);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "rules:\n  - {{ id: a, name: A, criteria: [] }}\n  - {{ id: a, name: B, criteria: [] }}"
        )
        .unwrap();

        assert!(matches!(
            LeadScoringRules::load(file.path()),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        let settings = ScoringSettings {
            rules_path: Some("/nonexistent/rules.yaml".to_string()),
        };
        assert!(matches!(
            LeadScoringRules::from_settings(&settings),
            Err(ConfigError::FileNotFound(_))
        ));
    }
}
