//! Insight requests and their typed subjects

use serde::{Deserialize, Serialize};

use dealscope_core::{Contact, Customer, Lead, Opportunity, Record, ScoringRule};

use crate::contracts::InsightKind;
use crate::InsightError;

/// One insight request as received from the API layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InsightRequest {
    LeadScore {
        record: Record,
        /// Overrides the configured rule catalogue for this request
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rules: Option<Vec<ScoringRule>>,
    },
    DealRisk {
        record: Record,
    },
    NextBestAction {
        record: Record,
    },
    Champions {
        contacts: Vec<Record>,
    },
    CustomerHealth {
        record: Record,
    },
}

impl InsightRequest {
    pub fn lead_score(record: Record) -> Self {
        InsightRequest::LeadScore {
            record,
            rules: None,
        }
    }

    pub fn kind(&self) -> InsightKind {
        match self {
            InsightRequest::LeadScore { .. } => InsightKind::LeadScore,
            InsightRequest::DealRisk { .. } => InsightKind::DealRisk,
            InsightRequest::NextBestAction { .. } => InsightKind::NextBestAction,
            InsightRequest::Champions { .. } => InsightKind::Champions,
            InsightRequest::CustomerHealth { .. } => InsightKind::CustomerHealth,
        }
    }
}

/// Typed view of a request, built before any scoring or model call
#[derive(Debug, Clone)]
pub(crate) enum Subject {
    Lead { lead: Lead, rules: Vec<ScoringRule> },
    Deal(Opportunity),
    Contacts(Vec<Contact>),
    Customer(Customer),
}

impl Subject {
    pub(crate) fn from_request(
        request: &InsightRequest,
        default_rules: &[ScoringRule],
    ) -> Result<Self, InsightError> {
        Ok(match request {
            InsightRequest::LeadScore { record, rules } => Subject::Lead {
                lead: Lead::try_from(record)?,
                rules: rules.clone().unwrap_or_else(|| default_rules.to_vec()),
            },
            InsightRequest::DealRisk { record } | InsightRequest::NextBestAction { record } => {
                Subject::Deal(Opportunity::try_from(record)?)
            }
            InsightRequest::Champions { contacts } => Subject::Contacts(
                contacts
                    .iter()
                    .enumerate()
                    .map(|(i, record)| {
                        Contact::try_from(record)
                            .map_err(|e| InsightError::from(e).in_list("contacts", i))
                    })
                    .collect::<Result<_, _>>()?,
            ),
            InsightRequest::CustomerHealth { record } => {
                Subject::Customer(Customer::try_from(record)?)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_format() {
        let request: InsightRequest = serde_json::from_value(serde_json::json!({
            "kind": "champions",
            "contacts": [{"id": "c1", "name": "Ana", "is_champion": true}]
        }))
        .unwrap();
        assert_eq!(request.kind(), InsightKind::Champions);
    }

    #[test]
    fn test_contact_errors_name_their_index() {
        let request = InsightRequest::Champions {
            contacts: vec![
                Record::new().with("id", "c1").with("name", "Ana"),
                Record::new().with("name", "No Id"),
            ],
        };
        let err = Subject::from_request(&request, &[]).unwrap_err();
        assert!(err.to_string().contains("contacts[1].id"), "{}", err);
    }

    #[test]
    fn test_request_rules_override_catalogue() {
        let catalogue = vec![ScoringRule::new("a", "A", vec![])];
        let request = InsightRequest::LeadScore {
            record: Record::new().with("id", "lead-1"),
            rules: Some(vec![]),
        };
        let Subject::Lead { rules, .. } = Subject::from_request(&request, &catalogue).unwrap()
        else {
            panic!("expected lead subject");
        };
        assert!(rules.is_empty());
    }
}
