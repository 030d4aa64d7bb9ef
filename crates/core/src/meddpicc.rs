//! MEDDPICC qualification profile
//!
//! Eight independently populated elements. The profile can arrive either as
//! a structured JSON body or flattened into an opportunity record under
//! `meddpicc_*` field names.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::levels::Influence;
use crate::record::Record;
use crate::{Error, Result};

/// Identifies one MEDDPICC element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeddpiccElement {
    Metrics,
    EconomicBuyer,
    DecisionCriteria,
    DecisionProcess,
    PaperProcess,
    Pain,
    Champion,
    Competition,
}

impl MeddpiccElement {
    pub const ALL: [MeddpiccElement; 8] = [
        MeddpiccElement::Metrics,
        MeddpiccElement::EconomicBuyer,
        MeddpiccElement::DecisionCriteria,
        MeddpiccElement::DecisionProcess,
        MeddpiccElement::PaperProcess,
        MeddpiccElement::Pain,
        MeddpiccElement::Champion,
        MeddpiccElement::Competition,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            MeddpiccElement::Metrics => "Metrics",
            MeddpiccElement::EconomicBuyer => "Economic Buyer",
            MeddpiccElement::DecisionCriteria => "Decision Criteria",
            MeddpiccElement::DecisionProcess => "Decision Process",
            MeddpiccElement::PaperProcess => "Paper Process",
            MeddpiccElement::Pain => "Identify Pain",
            MeddpiccElement::Champion => "Champion",
            MeddpiccElement::Competition => "Competition",
        }
    }
}

impl fmt::Display for MeddpiccElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Metrics {
    pub description: Option<String>,
    pub quantified_values: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EconomicBuyer {
    pub name: Option<String>,
    pub title: Option<String>,
    pub identified: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DecisionCriteria {
    pub criteria: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DecisionProcess {
    pub steps: Vec<String>,
    pub mapped: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaperProcess {
    pub description: Option<String>,
    pub understood: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Pain {
    pub description: Option<String>,
    pub identified: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Champion {
    pub name: Option<String>,
    pub influence: Influence,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Competition {
    pub competitors: Vec<String>,
    pub position: Option<String>,
}

/// The eight MEDDPICC elements, each optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QualificationProfile {
    pub metrics: Option<Metrics>,
    pub economic_buyer: Option<EconomicBuyer>,
    pub decision_criteria: Option<DecisionCriteria>,
    pub decision_process: Option<DecisionProcess>,
    pub paper_process: Option<PaperProcess>,
    pub pain: Option<Pain>,
    pub champion: Option<Champion>,
    pub competition: Option<Competition>,
}

/// Record field prefix for flattened MEDDPICC data
pub const MEDDPICC_PREFIX: &str = "meddpicc_";

impl QualificationProfile {
    /// Whether the record carries any flattened MEDDPICC fields
    pub fn present_in(record: &Record) -> bool {
        record.with_prefix(MEDDPICC_PREFIX).next().is_some()
    }

    /// Build a profile from flattened `meddpicc_*` record fields.
    ///
    /// Boolean companions (`*_identified`, `*_understood`, `*_mapped`)
    /// default to whether the descriptive field is filled in.
    pub fn from_record(record: &Record) -> Result<Self> {
        let metrics = record
            .optional_text("meddpicc_metrics")?
            .map(|description| Metrics {
                description: Some(description),
                quantified_values: Vec::new(),
            });

        let eb_name = record.optional_text("meddpicc_economic_buyer")?;
        let eb_identified = record.optional_flag("meddpicc_economic_buyer_identified")?;
        let economic_buyer = if eb_name.is_none() && eb_identified.is_none() {
            None
        } else {
            Some(EconomicBuyer {
                identified: eb_identified.unwrap_or(eb_name.is_some()),
                name: eb_name,
                title: record.optional_text("meddpicc_economic_buyer_title")?,
            })
        };

        let criteria = record.optional_list("meddpicc_decision_criteria")?;
        let decision_criteria = (!criteria.is_empty()).then_some(DecisionCriteria { criteria });

        let steps = record.optional_list("meddpicc_decision_process")?;
        let mapped = record.optional_flag("meddpicc_decision_process_mapped")?;
        let decision_process = match (steps.is_empty(), mapped) {
            (true, None) => None,
            (_, mapped) => Some(DecisionProcess {
                mapped: mapped.unwrap_or(!steps.is_empty()),
                steps,
            }),
        };

        let paper_process = text_with_flag(
            record,
            "meddpicc_paper_process",
            "meddpicc_paper_process_understood",
        )?
        .map(|(description, understood)| PaperProcess {
            description,
            understood,
        });

        let pain = text_with_flag(record, "meddpicc_pain", "meddpicc_pain_identified")?.map(
            |(description, identified)| Pain {
                description,
                identified,
            },
        );

        let champion = match record.optional_text("meddpicc_champion")? {
            None => None,
            Some(name) => {
                let influence = match record.optional_text("meddpicc_champion_influence")? {
                    None => Influence::default(),
                    Some(raw) => Influence::parse(&raw).ok_or_else(|| {
                        Error::validation(
                            "meddpicc_champion_influence",
                            format!("unknown influence \"{}\"", raw),
                        )
                    })?,
                };
                Some(Champion {
                    name: Some(name),
                    influence,
                })
            }
        };

        let competitors = record.optional_list("meddpicc_competition")?;
        let competition = (!competitors.is_empty()).then_some(Competition {
            competitors,
            position: None,
        });

        Ok(Self {
            metrics,
            economic_buyer,
            decision_criteria,
            decision_process,
            paper_process,
            pain,
            champion,
            competition,
        })
    }
}

fn text_with_flag(
    record: &Record,
    text_field: &str,
    flag_field: &str,
) -> Result<Option<(Option<String>, bool)>> {
    let text = record.optional_text(text_field)?;
    let flag = record.optional_flag(flag_field)?;
    if text.is_none() && flag.is_none() {
        return Ok(None);
    }
    let filled = text.is_some();
    Ok(Some((text, flag.unwrap_or(filled))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_from_flattened_record() {
        let record = Record::new()
            .with("meddpicc_metrics", "Cut onboarding time by 40%")
            .with("meddpicc_economic_buyer", "Dana Ruiz")
            .with("meddpicc_decision_criteria", "security, price")
            .with("meddpicc_pain_identified", false)
            .with("meddpicc_champion", "Sam Lee")
            .with("meddpicc_champion_influence", "high");

        let profile = QualificationProfile::from_record(&record).unwrap();

        assert!(profile.metrics.is_some());
        assert!(profile.economic_buyer.as_ref().unwrap().identified);
        assert_eq!(profile.decision_criteria.unwrap().criteria.len(), 2);
        assert!(profile.decision_process.is_none());
        assert!(!profile.pain.unwrap().identified);
        assert_eq!(profile.champion.unwrap().influence, Influence::High);
        assert!(profile.paper_process.is_none());
    }

    #[test]
    fn test_unknown_champion_influence_rejected() {
        let record = Record::new()
            .with("meddpicc_champion", "Sam Lee")
            .with("meddpicc_champion_influence", "sideways");

        match QualificationProfile::from_record(&record) {
            Err(Error::Validation { field, .. }) => {
                assert_eq!(field, "meddpicc_champion_influence")
            }
            other => panic!("expected validation error, got {:?}", other),
        }

        let without = Record::new().with("meddpicc_champion", "Sam Lee");
        let profile = QualificationProfile::from_record(&without).unwrap();
        assert_eq!(profile.champion.unwrap().influence, Influence::Medium);
    }

    #[test]
    fn test_profile_json_shape() {
        let profile: QualificationProfile = serde_json::from_str(
            r#"{"economicBuyer": {"name": "Dana", "identified": true}, "champion": {"influence": "low"}}"#,
        )
        .unwrap();
        assert!(profile.economic_buyer.unwrap().identified);
        assert_eq!(profile.champion.unwrap().influence, Influence::Low);
        assert!(profile.metrics.is_none());
    }

    #[test]
    fn test_prefix_detection() {
        assert!(!QualificationProfile::present_in(&Record::new().with("stage", "Proposal")));
        assert!(QualificationProfile::present_in(&Record::new().with("meddpicc_pain", "churn")));
    }
}
