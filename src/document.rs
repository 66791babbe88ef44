//! Parsed representation of a protocol revision.
//!
//! The document keeps the full parsed tree so fields the schema does not
//! describe pass through untouched. Typed views over the sections the
//! breaking change rules compare are extracted on demand.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::collections::BTreeSet;

use crate::error::{FieldError, ValidationError};

/// Enrollment section of a protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Population {
    pub target_size: Number,
    pub inclusion: Vec<String>,
    #[serde(default)]
    pub exclusion: Vec<String>,
}

impl Population {
    /// Inclusion criteria with ordering and duplicates removed.
    pub fn inclusion_set(&self) -> BTreeSet<&str> {
        self.inclusion.iter().map(String::as_str).collect()
    }

    pub fn exclusion_set(&self) -> BTreeSet<&str> {
        self.exclusion.iter().map(String::as_str).collect()
    }
}

/// Outcome measures. Order of `primary` is meaningful.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
    pub primary: Vec<String>,
    #[serde(default)]
    pub secondary: Vec<String>,
}

/// A single protocol revision, parsed from YAML or JSON text.
#[derive(Debug, Clone, PartialEq)]
pub struct ProtocolDocument {
    // Always a JSON object; enforced by `from_value`.
    root: Value,
}

impl ProtocolDocument {
    /// Parses raw protocol text. JSON input is accepted since it is valid YAML.
    pub fn parse(raw_text: &str) -> Result<Self, ValidationError> {
        let value: Value = serde_yaml::from_str(raw_text)
            .map_err(|e| ValidationError::Parse(e.to_string()))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, ValidationError> {
        match value {
            Value::Object(_) => Ok(Self { root: value }),
            Value::Null => Err(ValidationError::Parse("document is empty".to_string())),
            other => Err(ValidationError::Parse(format!(
                "expected a mapping at the top level, found {}",
                kind_of(&other)
            ))),
        }
    }

    /// The full parsed tree, suitable for schema validation.
    pub fn as_value(&self) -> &Value {
        &self.root
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.root.get(key)
    }

    /// Protocol identifier, read from `meta.id` with a top-level `id` fallback.
    pub fn id(&self) -> Option<String> {
        self.meta_field("id")
    }

    /// Protocol version, read from `meta.version` with a top-level fallback.
    pub fn version(&self) -> Option<String> {
        self.meta_field("version")
    }

    pub fn require_id(&self) -> Result<String, FieldError> {
        self.id().ok_or(FieldError::Missing("meta.id"))
    }

    pub fn population(&self) -> Result<Population, FieldError> {
        self.section("population")
    }

    pub fn endpoints(&self) -> Result<Endpoints, FieldError> {
        self.section("endpoints")
    }

    /// `population.target_size` on its own, without the rest of the section.
    pub fn target_size(&self) -> Result<Number, FieldError> {
        self.nested("population.target_size")
    }

    pub fn inclusion_criteria(&self) -> Result<BTreeSet<String>, FieldError> {
        self.nested("population.inclusion")
    }

    pub fn primary_endpoints(&self) -> Result<Vec<String>, FieldError> {
        self.nested("endpoints.primary")
    }

    fn meta_field(&self, key: &str) -> Option<String> {
        self.root
            .get("meta")
            .and_then(|meta| meta.get(key))
            .and_then(scalar_to_string)
            .or_else(|| self.root.get(key).and_then(scalar_to_string))
    }

    fn section<T: DeserializeOwned>(&self, field: &'static str) -> Result<T, FieldError> {
        let value = self.root.get(field).ok_or(FieldError::Missing(field))?;
        serde_json::from_value(value.clone()).map_err(|e| FieldError::Mistyped {
            field,
            reason: e.to_string(),
        })
    }

    /// Reads `<section>.<key>`. A missing section is reported by its own name.
    fn nested<T: DeserializeOwned>(&self, path: &'static str) -> Result<T, FieldError> {
        let (section, key) = path.split_once('.').unwrap_or((path, ""));
        let value = self
            .root
            .get(section)
            .ok_or(FieldError::Missing(section))?
            .get(key)
            .ok_or(FieldError::Missing(path))?;
        serde_json::from_value(value.clone()).map_err(|e| FieldError::Mistyped {
            field: path,
            reason: e.to_string(),
        })
    }
}

/// Numeric equality across integer and float encodings, so `200` and `200.0`
/// are the same value.
pub fn same_number(a: &Number, b: &Number) -> bool {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return x == y;
    }
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
        return x == y;
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}
