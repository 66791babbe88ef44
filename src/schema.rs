//! Structural schema applied to protocol documents before acceptance.

use std::fmt;
use std::path::Path;

use jsonschema::Validator;
use serde_json::Value;

use crate::error::{SchemaError, ValidationError};

/// Schema used when a repository does not ship its own.
pub const BUILTIN_PROTOCOL_SCHEMA: &str = r#"{
  "$schema": "http://json-schema.org/draft-07/schema#",
  "title": "Clinical trial protocol",
  "type": "object",
  "required": ["meta", "population", "endpoints"],
  "properties": {
    "meta": {
      "type": "object",
      "required": ["id"],
      "properties": {
        "id": {"type": "string", "minLength": 1},
        "version": {"type": ["string", "number"]},
        "title": {"type": "string"}
      }
    },
    "population": {
      "type": "object",
      "required": ["target_size", "inclusion"],
      "properties": {
        "target_size": {"type": "integer", "minimum": 0},
        "inclusion": {"type": "array", "items": {"type": "string"}},
        "exclusion": {"type": "array", "items": {"type": "string"}}
      }
    },
    "endpoints": {
      "type": "object",
      "required": ["primary"],
      "properties": {
        "primary": {"type": "array", "items": {"type": "string"}},
        "secondary": {"type": "array", "items": {"type": "string"}}
      }
    }
  }
}"#;

/// A compiled JSON-Schema, treated as an opaque validation predicate.
pub struct SchemaDefinition {
    validator: Validator,
}

impl SchemaDefinition {
    pub fn from_value(schema: &Value) -> Result<Self, SchemaError> {
        let validator =
            jsonschema::validator_for(schema).map_err(|e| SchemaError::Compile(e.to_string()))?;
        Ok(Self { validator })
    }

    pub fn from_json_str(schema: &str) -> Result<Self, SchemaError> {
        let value: Value = serde_json::from_str(schema)?;
        Self::from_value(&value)
    }

    /// Loads a schema file. `.yaml` / `.yml` files are read as YAML, anything
    /// else as JSON.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| SchemaError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));
        if is_yaml {
            let value: Value = serde_yaml::from_str(&content)?;
            Self::from_value(&value)
        } else {
            Self::from_json_str(&content)
        }
    }

    /// The schema compiled from [`BUILTIN_PROTOCOL_SCHEMA`].
    pub fn builtin() -> Result<Self, SchemaError> {
        Self::from_json_str(BUILTIN_PROTOCOL_SCHEMA)
    }

    /// Every violation, rendered as `<path>: <message>`.
    pub fn violations(&self, document: &Value) -> Vec<String> {
        self.validator
            .iter_errors(document)
            .map(|e| format!("{}: {}", display_path(&e.instance_path.to_string()), e))
            .collect()
    }

    /// The first violation only; validation does not aggregate.
    pub fn first_violation(&self, document: &Value) -> Option<ValidationError> {
        self.validator
            .iter_errors(document)
            .next()
            .map(|e| ValidationError::SchemaViolation {
                path: display_path(&e.instance_path.to_string()),
                message: e.to_string(),
            })
    }

    pub fn is_valid(&self, document: &Value) -> bool {
        self.validator.is_valid(document)
    }
}

impl fmt::Debug for SchemaDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaDefinition").finish_non_exhaustive()
    }
}

fn display_path(pointer: &str) -> String {
    if pointer.is_empty() {
        "/".to_string()
    } else {
        pointer.to_string()
    }
}
