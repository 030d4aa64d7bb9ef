//! Deal risk, time-to-close, next-best-action and champion detection

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use dealscope_core::{Contact, EngagementLevel, Influence, Opportunity, Priority, RiskLevel};

use crate::qualification::QualificationAssessor;

const QUALIFICATION_RISK_BELOW: u32 = 70;
const QUALIFICATION_SEVERITY: u32 = 80;
const TIMELINE_RISK_BELOW_DAYS: i64 = 7;
const TIMELINE_SEVERITY: u32 = 70;
const BASELINE_RISK: u32 = 20;

const LARGE_DEAL_VALUE: f64 = 100_000.0;

const CHAMPION_THRESHOLD: u32 = 40;
const MAX_ENGAGEMENT_POINTS: u32 = 20;

/// Inputs the advisor reads from an opportunity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealContext {
    pub opportunity_id: String,
    pub stage: String,
    /// Absent scores count as 0
    pub qualification_score: u32,
    pub value: Option<f64>,
    pub days_to_close: Option<i64>,
}

impl DealContext {
    /// Qualification score is the supplied one, else computed from the
    /// MEDDPICC profile, else 0.
    pub fn from_opportunity(opportunity: &Opportunity, as_of: NaiveDate) -> Self {
        let qualification_score = opportunity
            .qualification_score
            .or_else(|| {
                opportunity
                    .qualification
                    .as_ref()
                    .map(|p| QualificationAssessor::new().score(p))
            })
            .unwrap_or(0);

        Self {
            opportunity_id: opportunity.id.clone(),
            stage: opportunity.stage.clone(),
            qualification_score,
            value: opportunity.value,
            days_to_close: opportunity.days_to_close(as_of),
        }
    }

    fn stage_contains(&self, needle: &str) -> bool {
        self.stage.to_lowercase().contains(needle)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskFactor {
    pub factor: String,
    pub severity: u32,
    pub mitigation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskProfile {
    pub risk_level: RiskLevel,
    pub risk_score: u32,
    pub risk_factors: Vec<RiskFactor>,
    pub recommendations: Vec<String>,
    pub time_to_close_days: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextBestAction {
    pub action: String,
    pub priority: Priority,
    pub reasoning: String,
    pub expected_outcome: String,
    pub time_estimate: String,
    pub resources: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChampionCandidate {
    pub contact_id: String,
    pub name: String,
    pub champion_score: u32,
    pub indicators: Vec<String>,
    pub engagement_level: EngagementLevel,
    pub influence: Influence,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChampionReport {
    pub potential_champions: Vec<ChampionCandidate>,
    pub recommendations: Vec<String>,
}

/// Risk level on the deal scale
pub fn deal_risk_level(score: u32) -> RiskLevel {
    if score >= 80 {
        RiskLevel::Critical
    } else if score >= 60 {
        RiskLevel::High
    } else if score >= 40 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// Stateless deal advisor
#[derive(Debug, Clone, Copy, Default)]
pub struct RiskAndActionAdvisor;

impl RiskAndActionAdvisor {
    pub fn new() -> Self {
        Self
    }

    pub fn assess_risk(&self, deal: &DealContext) -> RiskProfile {
        let mut risk_factors = Vec::new();
        let mut recommendations = Vec::new();

        if deal.qualification_score < QUALIFICATION_RISK_BELOW {
            risk_factors.push(RiskFactor {
                factor: "Incomplete qualification".to_string(),
                severity: QUALIFICATION_SEVERITY,
                mitigation: "Close the open MEDDPICC gaps before committing the forecast"
                    .to_string(),
            });
            recommendations
                .push("Complete MEDDPICC qualification before advancing the deal".to_string());
        }

        if deal
            .days_to_close
            .is_some_and(|days| days < TIMELINE_RISK_BELOW_DAYS)
        {
            risk_factors.push(RiskFactor {
                factor: "Tight timeline".to_string(),
                severity: TIMELINE_SEVERITY,
                mitigation: "Confirm the close plan and remaining approvals with the buyer"
                    .to_string(),
            });
            recommendations.push(
                "Validate the close date with the economic buyer and agree a mutual action plan"
                    .to_string(),
            );
        }

        let risk_score = if risk_factors.is_empty() {
            recommendations.push("Maintain current engagement cadence".to_string());
            BASELINE_RISK
        } else {
            let total: u32 = risk_factors.iter().map(|f| f.severity).sum();
            (total as f64 / risk_factors.len() as f64).round() as u32
        };

        let risk_level = deal_risk_level(risk_score);

        tracing::debug!(
            opportunity_id = %deal.opportunity_id,
            risk_score,
            risk_level = %risk_level,
            factors = risk_factors.len(),
            "Deal risk assessed"
        );

        RiskProfile {
            risk_level,
            risk_score,
            risk_factors,
            recommendations,
            time_to_close_days: self.time_to_close(deal),
        }
    }

    /// Expected days until close
    pub fn time_to_close(&self, deal: &DealContext) -> u32 {
        let base = if deal.stage_contains("proposal") {
            14
        } else if deal.stage_contains("negotiation") {
            7
        } else {
            30
        };

        if deal.value.is_some_and(|v| v > LARGE_DEAL_VALUE) {
            base + 14
        } else {
            base
        }
    }

    pub fn next_best_action(&self, deal: &DealContext) -> NextBestAction {
        if deal.qualification_score < 50 {
            NextBestAction {
                action: "Complete qualification".to_string(),
                priority: Priority::High,
                reasoning: format!(
                    "Qualification score is {}; key buying facts are still unknown",
                    deal.qualification_score
                ),
                expected_outcome: "Confirmed pain, economic buyer and decision process"
                    .to_string(),
                time_estimate: "1-2 days".to_string(),
                resources: vec![
                    "MEDDPICC checklist".to_string(),
                    "Discovery call guide".to_string(),
                ],
            }
        } else if deal.stage_contains("proposal") {
            NextBestAction {
                action: "Schedule proposal review".to_string(),
                priority: Priority::High,
                reasoning: "The proposal is with the buyer; momentum depends on a walkthrough"
                    .to_string(),
                expected_outcome: "Feedback on the proposal and agreed next steps to signature"
                    .to_string(),
                time_estimate: "1 week".to_string(),
                resources: vec![
                    "Proposal deck".to_string(),
                    "Pricing approval".to_string(),
                    "ROI summary".to_string(),
                ],
            }
        } else {
            NextBestAction {
                action: "Continue standard process".to_string(),
                priority: Priority::Medium,
                reasoning: "No blocking issues detected at this stage".to_string(),
                expected_outcome: "Steady progression to the next stage".to_string(),
                time_estimate: "2 weeks".to_string(),
                resources: vec!["Sales playbook".to_string()],
            }
        }
    }

    /// Contacts likely to champion the deal, strongest first
    pub fn detect_champions(&self, contacts: &[Contact]) -> ChampionReport {
        let mut potential_champions: Vec<ChampionCandidate> = contacts
            .iter()
            .map(score_contact)
            .filter(|c| c.champion_score >= CHAMPION_THRESHOLD)
            .collect();

        // stable: equal scores keep input order
        potential_champions.sort_by(|a, b| b.champion_score.cmp(&a.champion_score));

        let recommendations = match potential_champions.as_slice() {
            [] => vec![
                "Map the buying committee and cultivate an internal advocate".to_string(),
                "Offer a senior contact early access or a pilot to build sponsorship".to_string(),
            ],
            [only] => vec![
                format!("Equip {} with a business case to share internally", only.name),
                "Develop a second champion to avoid single-threaded risk".to_string(),
            ],
            [top, ..] => vec![
                format!("Equip {} with a business case to share internally", top.name),
                "Align champions on a single narrative before the decision meeting".to_string(),
            ],
        };

        ChampionReport {
            potential_champions,
            recommendations,
        }
    }
}

const SENIOR_TERMS: &[&str] = &[
    "chief", "ceo", "cfo", "cto", "coo", "cio", "cro", "cmo", "vp", "svp", "evp", "president",
    "director", "head", "founder", "owner", "partner",
];
const MANAGER_TERMS: &[&str] = &["manager", "lead", "supervisor", "principal"];

fn title_words(title: &str) -> Vec<String> {
    title
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

fn has_any(words: &[String], terms: &[&str]) -> bool {
    words.iter().any(|w| terms.contains(&w.as_str()))
}

/// Deterministic interaction signal
fn engagement_points(contact: &Contact) -> u32 {
    (contact.meetings_attended.saturating_mul(5))
        .saturating_add(contact.emails_replied.saturating_mul(2))
        .min(MAX_ENGAGEMENT_POINTS)
}

fn engagement_level(contact: &Contact) -> EngagementLevel {
    let reply_rate = contact.reply_rate();
    if reply_rate >= 0.5 && contact.meetings_attended >= 3 {
        EngagementLevel::High
    } else if reply_rate >= 0.2 || contact.meetings_attended >= 1 {
        EngagementLevel::Medium
    } else {
        EngagementLevel::Low
    }
}

fn score_contact(contact: &Contact) -> ChampionCandidate {
    let words = contact
        .title
        .as_deref()
        .map(title_words)
        .unwrap_or_default();
    let senior = has_any(&words, SENIOR_TERMS);
    let manager = !senior && has_any(&words, MANAGER_TERMS);

    let mut score = 0u32;
    let mut indicators = Vec::new();

    if senior {
        score += 30;
        indicators.push("Senior title".to_string());
    } else if manager {
        score += 20;
        indicators.push("Manager-level title".to_string());
    }
    if contact.is_champion {
        score += 40;
        indicators.push("Flagged as champion".to_string());
    }
    if contact.is_decision_maker {
        score += 30;
        indicators.push("Decision maker".to_string());
    }

    let engagement = engagement_points(contact);
    if engagement > 0 {
        score += engagement;
        indicators.push(format!(
            "{} meetings attended, {} email replies",
            contact.meetings_attended, contact.emails_replied
        ));
    }

    let influence = if contact.is_decision_maker || senior {
        Influence::High
    } else if manager || contact.is_champion {
        Influence::Medium
    } else {
        Influence::Low
    };

    ChampionCandidate {
        contact_id: contact.id.clone(),
        name: contact.name.clone(),
        champion_score: score.min(100),
        indicators,
        engagement_level: engagement_level(contact),
        influence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deal(qualification_score: u32, days_to_close: Option<i64>) -> DealContext {
        DealContext {
            opportunity_id: "opp-1".to_string(),
            stage: "Discovery".to_string(),
            qualification_score,
            value: Some(50_000.0),
            days_to_close,
        }
    }

    fn contact(id: &str, title: &str) -> Contact {
        Contact {
            id: id.to_string(),
            name: format!("Contact {}", id),
            title: Some(title.to_string()),
            is_champion: false,
            is_decision_maker: false,
            meetings_attended: 0,
            emails_sent: 0,
            emails_replied: 0,
        }
    }

    #[test]
    fn test_risk_with_both_factors() {
        let profile = RiskAndActionAdvisor::new().assess_risk(&deal(50, Some(3)));
        let severities: Vec<u32> = profile.risk_factors.iter().map(|f| f.severity).collect();
        assert_eq!(severities, vec![80, 70]);
        assert_eq!(profile.risk_score, 75);
        assert_eq!(profile.risk_level, RiskLevel::High);
    }

    #[test]
    fn test_risk_without_factors() {
        let profile = RiskAndActionAdvisor::new().assess_risk(&deal(90, Some(60)));
        assert!(profile.risk_factors.is_empty());
        assert_eq!(profile.risk_score, 20);
        assert_eq!(profile.risk_level, RiskLevel::Low);
    }

    #[test]
    fn test_risk_single_factor_and_missing_close_date() {
        let profile = RiskAndActionAdvisor::new().assess_risk(&deal(40, None));
        assert_eq!(profile.risk_factors.len(), 1);
        assert_eq!(profile.risk_score, 80);
        assert_eq!(profile.risk_level, RiskLevel::Critical);
    }

    #[test]
    fn test_risk_level_boundaries() {
        assert_eq!(deal_risk_level(80), RiskLevel::Critical);
        assert_eq!(deal_risk_level(79), RiskLevel::High);
        assert_eq!(deal_risk_level(40), RiskLevel::Medium);
        assert_eq!(deal_risk_level(39), RiskLevel::Low);
    }

    #[test]
    fn test_context_from_opportunity() {
        let opportunity = Opportunity {
            id: "opp-9".to_string(),
            name: None,
            stage: "Negotiation".to_string(),
            value: Some(250_000.0),
            close_date: NaiveDate::from_ymd_opt(2024, 3, 10),
            qualification_score: None,
            qualification: None,
        };
        let as_of = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();

        let context = DealContext::from_opportunity(&opportunity, as_of);
        assert_eq!(context.qualification_score, 0);
        assert_eq!(context.days_to_close, Some(9));
        assert_eq!(RiskAndActionAdvisor::new().time_to_close(&context), 21);
    }

    #[test]
    fn test_time_to_close() {
        let advisor = RiskAndActionAdvisor::new();
        let mut context = deal(80, None);
        assert_eq!(advisor.time_to_close(&context), 30);

        context.stage = "Proposal/Price Quote".to_string();
        assert_eq!(advisor.time_to_close(&context), 14);

        context.value = Some(100_001.0);
        assert_eq!(advisor.time_to_close(&context), 28);

        context.stage = "negotiation/review".to_string();
        context.value = Some(100_000.0);
        assert_eq!(advisor.time_to_close(&context), 7);
    }

    #[test]
    fn test_next_best_action_order() {
        let advisor = RiskAndActionAdvisor::new();

        let mut context = deal(30, None);
        context.stage = "Proposal".to_string();
        let action = advisor.next_best_action(&context);
        assert_eq!(action.action, "Complete qualification");
        assert_eq!(action.priority, Priority::High);

        context.qualification_score = 75;
        assert_eq!(advisor.next_best_action(&context).action, "Schedule proposal review");

        context.stage = "Discovery".to_string();
        let action = advisor.next_best_action(&context);
        assert_eq!(action.action, "Continue standard process");
        assert_eq!(action.priority, Priority::Medium);
    }

    #[test]
    fn test_champion_score_components() {
        let mut vp = contact("1", "VP, Finance");
        vp.is_champion = true;
        vp.meetings_attended = 2;
        vp.emails_replied = 3;
        // 30 + 40 + min(20, 10 + 6)
        assert_eq!(score_contact(&vp).champion_score, 86);
        assert_eq!(score_contact(&vp).influence, Influence::High);

        let mut manager = contact("2", "Procurement Manager");
        manager.is_decision_maker = true;
        manager.meetings_attended = 10;
        // 20 + 30 + 20 (capped engagement)
        assert_eq!(score_contact(&manager).champion_score, 70);

        let mut everything = contact("3", "Chief Revenue Officer");
        everything.is_champion = true;
        everything.is_decision_maker = true;
        everything.meetings_attended = 4;
        assert_eq!(score_contact(&everything).champion_score, 100);
    }

    #[test]
    fn test_title_keywords_match_whole_words() {
        // "coordinator" must not read as "coo"
        let coordinator = contact("1", "Project Coordinator");
        assert_eq!(score_contact(&coordinator).champion_score, 0);
        assert_eq!(score_contact(&coordinator).influence, Influence::Low);
    }

    #[test]
    fn test_detect_champions_filters_and_sorts() {
        let mut a = contact("a", "Team Lead");
        a.is_champion = true; // 60
        let b = contact("b", "Analyst"); // 0
        let mut c = contact("c", "Director of IT");
        c.is_decision_maker = true;
        c.meetings_attended = 1; // 30 + 30 + 5
        let mut d = contact("d", "Engineering Manager");
        d.is_champion = true; // 60

        let report = RiskAndActionAdvisor::new().detect_champions(&[a, b, c, d]);
        let ids: Vec<&str> = report
            .potential_champions
            .iter()
            .map(|c| c.contact_id.as_str())
            .collect();
        assert_eq!(ids, vec!["c", "a", "d"]);
        assert!(report.recommendations[0].contains("Contact c"));
    }

    #[test]
    fn test_detect_champions_none_found() {
        let report = RiskAndActionAdvisor::new().detect_champions(&[contact("x", "Intern")]);
        assert!(report.potential_champions.is_empty());
        assert_eq!(report.recommendations.len(), 2);
    }

    #[test]
    fn test_engagement_level() {
        let mut c = contact("1", "Analyst");
        assert_eq!(engagement_level(&c), EngagementLevel::Low);
        c.meetings_attended = 3;
        c.emails_sent = 4;
        c.emails_replied = 2;
        assert_eq!(engagement_level(&c), EngagementLevel::High);
    }
}
