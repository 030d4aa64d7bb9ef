//! Open field-value records
//!
//! A [`Record`] is the raw shape in which leads, opportunities and customers
//! arrive from the calling layer. The engine never enforces a schema on it;
//! typed views (see [`crate::Opportunity`] and friends) are built from it at
//! the boundary and carry the fields each component actually reads.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize, Serializer};

use crate::{Error, Result};

/// A single field value
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl FieldValue {
    /// Text content, only for text values
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view: numbers, and text that parses as a finite number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) if n.is_finite() => Some(*n),
            FieldValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }

    /// Boolean view: booleans, and the usual textual spellings
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            FieldValue::Text(s) => match s.trim().to_lowercase().as_str() {
                "true" | "yes" | "y" | "1" => Some(true),
                "false" | "no" | "n" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// True for null and whitespace-only text
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Null => true,
            FieldValue::Text(s) => s.trim().is_empty(),
            FieldValue::Bool(_) | FieldValue::Number(_) => false,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Bool(_) => "boolean",
            FieldValue::Number(_) => "number",
            FieldValue::Text(_) => "text",
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            FieldValue::Null => serializer.serialize_unit(),
            FieldValue::Bool(b) => serializer.serialize_bool(*b),
            // Whole numbers go out as integers so prompts read naturally
            FieldValue::Number(n) if n.fract() == 0.0 && n.abs() < 9.0e15 => {
                serializer.serialize_i64(*n as i64)
            }
            FieldValue::Number(n) => serializer.serialize_f64(*n),
            FieldValue::Text(s) => serializer.serialize_str(s),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => write!(f, "null"),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Number(n) if n.fract() == 0.0 => write!(f, "{}", *n as i64),
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Text(s) => write!(f, "\"{}\"", s),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Number(n)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Number(n as f64)
    }
}

impl From<i32> for FieldValue {
    fn from(n: i32) -> Self {
        FieldValue::Number(n as f64)
    }
}

impl From<u32> for FieldValue {
    fn from(n: u32) -> Self {
        FieldValue::Number(n as f64)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

/// Field name → value mapping, iterated in key order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, FieldValue>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(field.into(), value.into());
    }

    /// Field value; explicit nulls read as absent
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field).filter(|v| !matches!(v, FieldValue::Null))
    }

    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    /// Present and not blank after trimming
    pub fn is_present(&self, field: &str) -> bool {
        self.get(field).map(|v| !v.is_blank()).unwrap_or(false)
    }

    pub fn text(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(FieldValue::as_text)
    }

    pub fn number(&self, field: &str) -> Option<f64> {
        self.get(field).and_then(FieldValue::as_number)
    }

    pub fn flag(&self, field: &str) -> Option<bool> {
        self.get(field).and_then(FieldValue::as_flag)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Fields whose name starts with `prefix`
    pub fn with_prefix<'a>(
        &'a self,
        prefix: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a FieldValue)> + 'a {
        self.iter().filter(move |(k, _)| k.starts_with(prefix))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// JSON rendering used when embedding the record into a prompt
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    // ---- strict accessors used when building typed views ----

    /// Non-blank text, trimmed; error if absent
    pub fn require_text(&self, field: &str) -> Result<String> {
        self.optional_text(field)?
            .ok_or_else(|| Error::validation(field, "required field is missing or blank"))
    }

    /// Non-blank text, trimmed. Numbers are accepted and rendered as text
    /// (ids frequently arrive numeric).
    pub fn optional_text(&self, field: &str) -> Result<Option<String>> {
        match self.get(field) {
            None => Ok(None),
            Some(FieldValue::Text(s)) => {
                let trimmed = s.trim();
                Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
            }
            Some(FieldValue::Number(n)) if n.fract() == 0.0 => Ok(Some((*n as i64).to_string())),
            Some(FieldValue::Number(n)) => Ok(Some(n.to_string())),
            Some(other) => Err(Error::validation(
                field,
                format!("expected text, got {}", other.type_name()),
            )),
        }
    }

    /// Number; error if present but not numeric
    pub fn optional_number(&self, field: &str) -> Result<Option<f64>> {
        match self.get(field) {
            None => Ok(None),
            Some(v) if v.is_blank() => Ok(None),
            Some(v) => v.as_number().map(Some).ok_or_else(|| {
                Error::validation(field, format!("expected a number, got {}", v))
            }),
        }
    }

    /// Non-negative whole number; fractional input is rounded
    pub fn optional_count(&self, field: &str) -> Result<Option<u32>> {
        match self.optional_number(field)? {
            None => Ok(None),
            Some(n) if n < 0.0 => Err(Error::validation(field, "must not be negative")),
            Some(n) => Ok(Some(n.round().min(u32::MAX as f64) as u32)),
        }
    }

    /// Boolean; error if present but not a recognisable flag
    pub fn optional_flag(&self, field: &str) -> Result<Option<bool>> {
        match self.get(field) {
            None => Ok(None),
            Some(v) if v.is_blank() => Ok(None),
            Some(v) => v.as_flag().map(Some).ok_or_else(|| {
                Error::validation(field, format!("expected a boolean, got {}", v))
            }),
        }
    }

    /// Calendar date from `YYYY-MM-DD` or an RFC 3339 timestamp
    pub fn optional_date(&self, field: &str) -> Result<Option<NaiveDate>> {
        let Some(raw) = self.optional_text(field)? else {
            return Ok(None);
        };

        if let Ok(date) = NaiveDate::parse_from_str(&raw, "%Y-%m-%d") {
            return Ok(Some(date));
        }
        if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
            return Ok(Some(ts.date_naive()));
        }
        Err(Error::validation(
            field,
            format!("expected a date (YYYY-MM-DD), got \"{}\"", raw),
        ))
    }

    /// Comma/semicolon separated text as a list of trimmed items
    pub fn optional_list(&self, field: &str) -> Result<Vec<String>> {
        Ok(self
            .optional_text(field)?
            .map(|raw| split_list(&raw))
            .unwrap_or_default())
    }
}

impl FromIterator<(String, FieldValue)> for Record {
    fn from_iter<T: IntoIterator<Item = (String, FieldValue)>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(|c| c == ',' || c == ';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_mixed_values() {
        let record: Record = serde_json::from_str(
            r#"{"name": "Acme", "value": 125000, "hot": true, "notes": null}"#,
        )
        .unwrap();

        assert_eq!(record.text("name"), Some("Acme"));
        assert_eq!(record.number("value"), Some(125000.0));
        assert_eq!(record.flag("hot"), Some(true));
        assert!(record.get("notes").is_none());
        assert_eq!(record.len(), 4);
    }

    #[test]
    fn test_whole_numbers_serialize_as_integers() {
        let record = Record::new().with("seats", 40).with("ratio", 0.5);
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"ratio":0.5,"seats":40}"#);
    }

    #[test]
    fn test_numeric_text_is_numeric() {
        let record = Record::new().with("employees", " 250 ").with("industry", "SaaS");
        assert_eq!(record.number("employees"), Some(250.0));
        assert_eq!(record.number("industry"), None);
    }

    #[test]
    fn test_is_present_trims_whitespace() {
        let record = Record::new().with("title", "   ").with("email", "a@b.co");
        assert!(!record.is_present("title"));
        assert!(record.is_present("email"));
        assert!(!record.is_present("missing"));
    }

    #[test]
    fn test_strict_accessors_report_field() {
        let record = Record::new().with("value", "lots").with("close_date", "next week");

        let err = record.optional_number("value").unwrap_err();
        assert!(err.to_string().contains("value"));

        let err = record.optional_date("close_date").unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_dates_accept_timestamps() {
        let record = Record::new()
            .with("a", "2024-03-01")
            .with("b", "2024-03-01T10:15:00Z");
        let expected = NaiveDate::from_ymd_opt(2024, 3, 1);
        assert_eq!(record.optional_date("a").unwrap(), expected);
        assert_eq!(record.optional_date("b").unwrap(), expected);
    }

    #[test]
    fn test_list_splitting() {
        let record = Record::new().with("criteria", "price, security;  uptime ,");
        assert_eq!(
            record.optional_list("criteria").unwrap(),
            vec!["price", "security", "uptime"]
        );
    }
}
