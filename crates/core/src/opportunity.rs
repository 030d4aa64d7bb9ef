//! Typed views over lead, opportunity and contact records

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::meddpicc::QualificationProfile;
use crate::record::Record;
use crate::{Error, Result};

/// Lead view. Rule-based scoring still runs over the raw record, so the
/// record travels with the view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: String,
    pub name: Option<String>,
    pub company: Option<String>,
    pub title: Option<String>,
    pub source: Option<String>,
    pub industry: Option<String>,
    pub company_size: Option<u32>,
    pub budget: Option<f64>,
    pub record: Record,
}

impl TryFrom<&Record> for Lead {
    type Error = Error;

    fn try_from(record: &Record) -> Result<Self> {
        Ok(Self {
            id: record.require_text("id")?,
            name: record.optional_text("name")?,
            company: record.optional_text("company")?,
            title: record.optional_text("title")?,
            source: record.optional_text("source")?,
            industry: record.optional_text("industry")?,
            company_size: record.optional_count("company_size")?,
            budget: record.optional_number("budget")?,
            record: record.clone(),
        })
    }
}

/// Opportunity (deal) view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub id: String,
    pub name: Option<String>,
    /// Free-form pipeline stage name, e.g. "Proposal/Price Quote"
    pub stage: String,
    pub value: Option<f64>,
    pub close_date: Option<NaiveDate>,
    /// Previously computed qualification score, if the caller has one
    pub qualification_score: Option<u32>,
    /// Flattened MEDDPICC data, when the record carries any
    pub qualification: Option<QualificationProfile>,
}

impl Opportunity {
    /// Whole days from `as_of` until the expected close date
    pub fn days_to_close(&self, as_of: NaiveDate) -> Option<i64> {
        self.close_date.map(|d| (d - as_of).num_days())
    }
}

impl TryFrom<&Record> for Opportunity {
    type Error = Error;

    fn try_from(record: &Record) -> Result<Self> {
        let value = match record.optional_number("value")? {
            Some(v) => Some(v),
            None => record.optional_number("amount")?,
        };

        let raw_score = match record.optional_number("qualification_score")? {
            Some(s) => Some(s),
            None => record.optional_number("meddpicc_score")?,
        };
        let qualification_score = match raw_score {
            Some(s) if !(0.0..=100.0).contains(&s) => {
                return Err(Error::validation(
                    "qualification_score",
                    format!("must be between 0 and 100, got {}", s),
                ))
            }
            Some(s) => Some(s.round() as u32),
            None => None,
        };

        let qualification = if QualificationProfile::present_in(record) {
            Some(QualificationProfile::from_record(record)?)
        } else {
            None
        };

        Ok(Self {
            id: record.require_text("id")?,
            name: record.optional_text("name")?,
            stage: record.optional_text("stage")?.unwrap_or_default(),
            value,
            close_date: record.optional_date("close_date")?,
            qualification_score,
            qualification,
        })
    }
}

/// Contact view used for champion detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: String,
    pub name: String,
    pub title: Option<String>,
    pub is_champion: bool,
    pub is_decision_maker: bool,
    pub meetings_attended: u32,
    pub emails_sent: u32,
    pub emails_replied: u32,
}

impl Contact {
    /// Replies per email sent, 0.0 when nothing was sent
    pub fn reply_rate(&self) -> f64 {
        if self.emails_sent == 0 {
            0.0
        } else {
            (self.emails_replied as f64 / self.emails_sent as f64).min(1.0)
        }
    }
}

impl TryFrom<&Record> for Contact {
    type Error = Error;

    fn try_from(record: &Record) -> Result<Self> {
        let id = record.require_text("id")?;
        let name = match record.optional_text("name")? {
            Some(name) => name,
            None => {
                let first = record.optional_text("first_name")?.unwrap_or_default();
                let last = record.optional_text("last_name")?.unwrap_or_default();
                let joined = format!("{} {}", first, last).trim().to_string();
                if joined.is_empty() {
                    return Err(Error::validation("name", "required field is missing or blank"));
                }
                joined
            }
        };

        Ok(Self {
            id,
            name,
            title: record.optional_text("title")?,
            is_champion: record.optional_flag("is_champion")?.unwrap_or(false),
            is_decision_maker: record.optional_flag("is_decision_maker")?.unwrap_or(false),
            meetings_attended: record.optional_count("meetings_attended")?.unwrap_or(0),
            emails_sent: record.optional_count("emails_sent")?.unwrap_or(0),
            emails_replied: record.optional_count("emails_replied")?.unwrap_or(0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opportunity_from_record() {
        let record = Record::new()
            .with("id", "opp-1")
            .with("stage", "Proposal")
            .with("amount", "150000")
            .with("close_date", "2024-06-30")
            .with("meddpicc_pain", "manual reconciliation");

        let opp = Opportunity::try_from(&record).unwrap();
        assert_eq!(opp.value, Some(150000.0));
        assert_eq!(opp.qualification_score, None);
        assert!(opp.qualification.unwrap().pain.unwrap().identified);

        let as_of = NaiveDate::from_ymd_opt(2024, 6, 27).unwrap();
        let opp = Opportunity::try_from(&record).unwrap();
        assert_eq!(opp.days_to_close(as_of), Some(3));
    }

    #[test]
    fn test_lead_from_record() {
        let record = Record::new()
            .with("id", "lead-3")
            .with("company", "Acme")
            .with("company_size", "250")
            .with("budget", 40000);
        let lead = Lead::try_from(&record).unwrap();
        assert_eq!(lead.company.as_deref(), Some("Acme"));
        assert_eq!(lead.company_size, Some(250));
        assert_eq!(lead.budget, Some(40000.0));
        assert_eq!(lead.record.len(), 4);
    }

    #[test]
    fn test_opportunity_requires_id() {
        let err = Opportunity::try_from(&Record::new().with("stage", "Proposal")).unwrap_err();
        assert!(err.to_string().contains("'id'"));
    }

    #[test]
    fn test_opportunity_rejects_out_of_range_score() {
        let record = Record::new().with("id", "x").with("qualification_score", 140);
        assert!(Opportunity::try_from(&record).is_err());
    }

    #[test]
    fn test_contact_name_fallback() {
        let record = Record::new()
            .with("id", 7)
            .with("first_name", "Priya")
            .with("last_name", "Shah")
            .with("emails_sent", 10)
            .with("emails_replied", 4);

        let contact = Contact::try_from(&record).unwrap();
        assert_eq!(contact.id, "7");
        assert_eq!(contact.name, "Priya Shah");
        assert!((contact.reply_rate() - 0.4).abs() < f64::EPSILON);
    }
}
