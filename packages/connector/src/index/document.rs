//! Search index documents.
//!
//! A document maps field names to one or more primitive values. Solr returns
//! single-valued fields as scalars and multi-valued fields as arrays; both
//! are normalized to a list here.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// A single primitive field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawField {
    One(FieldValue),
    Many(Vec<FieldValue>),
    Other(serde_json::Value),
}

/// One search index document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    fields: BTreeMap<String, Vec<FieldValue>>,
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, RawField>::deserialize(deserializer)?;
        let fields = raw
            .into_iter()
            .filter_map(|(name, value)| match value {
                RawField::One(v) => Some((name, vec![v])),
                RawField::Many(vs) => Some((name, vs)),
                RawField::Other(_) => None,
            })
            .collect();
        Ok(Self { fields })
    }
}

impl Document {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style single value setter, mostly used in tests.
    #[must_use]
    pub fn with(mut self, field: &str, value: impl Into<FieldValue>) -> Self {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(value.into());
        self
    }

    pub fn set(&mut self, field: &str, values: Vec<FieldValue>) {
        self.fields.insert(field.to_string(), values);
    }

    /// All values of a field; empty if absent.
    #[must_use]
    pub fn values(&self, field: &str) -> &[FieldValue] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    #[must_use]
    pub fn has(&self, field: &str) -> bool {
        !self.values(field).is_empty()
    }

    /// First string value of a field.
    #[must_use]
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.values(field).iter().find_map(|v| match v {
            FieldValue::Str(s) => Some(s.as_str()),
            _ => None,
        })
    }

    /// All values of a field rendered as strings.
    #[must_use]
    pub fn get_strings(&self, field: &str) -> Vec<String> {
        self.values(field).iter().map(ToString::to_string).collect()
    }

    /// First value of a field as an integer. Numeric strings are accepted.
    #[must_use]
    pub fn get_i64(&self, field: &str) -> Option<i64> {
        self.get_i64s(field).into_iter().next()
    }

    /// All integer values of a field.
    #[must_use]
    pub fn get_i64s(&self, field: &str) -> Vec<i64> {
        self.values(field)
            .iter()
            .filter_map(|v| match v {
                FieldValue::Int(i) => Some(*i),
                FieldValue::Str(s) => s.parse().ok(),
                _ => None,
            })
            .collect()
    }

    /// Boolean flag; `"true"` strings count as true, absence as false.
    #[must_use]
    pub fn is_true(&self, field: &str) -> bool {
        self.values(field).iter().any(|v| match v {
            FieldValue::Bool(b) => *b,
            FieldValue::Str(s) => s.eq_ignore_ascii_case("true"),
            _ => false,
        })
    }

    /// Distinct string values of a field in first-seen order.
    #[must_use]
    pub fn distinct_strings(&self, field: &str) -> Vec<String> {
        let mut seen = Vec::new();
        for value in self.get_strings(field) {
            if !seen.contains(&value) {
                seen.push(value);
            }
        }
        seen
    }
}
