//! Core types for the deal insight engine
//!
//! This crate provides the foundational types used across all other crates:
//! - `Record`, the open-ended field map every entity arrives as
//! - Typed views built from records at the API boundary
//! - MEDDPICC qualification profile
//! - Scoring rule definitions
//! - Shared classification enums
//! - Error types

pub mod customer;
pub mod error;
pub mod levels;
pub mod meddpicc;
pub mod opportunity;
pub mod record;
pub mod rules;

pub use customer::{
    ContractTerms, Customer, FactorObservation, HealthCategory, HealthMetrics, UsageSnapshot,
};
pub use error::{Error, Result};
pub use levels::{EngagementLevel, Influence, Priority, RiskLevel, Trend};
pub use meddpicc::{
    Champion, Competition, DecisionCriteria, DecisionProcess, EconomicBuyer, MeddpiccElement,
    Metrics, Pain, PaperProcess, QualificationProfile, MEDDPICC_PREFIX,
};
pub use opportunity::{Contact, Lead, Opportunity};
pub use record::{FieldValue, Record};
pub use rules::{Criterion, Operator, ScoringRule};
