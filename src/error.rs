//! Error types for protocol validation and breaking change detection.

use std::path::PathBuf;

use thiserror::Error;

/// Reasons a candidate protocol is rejected.
///
/// Both variants are recovered inside the validator and surface as
/// `valid = false` on the [`ValidationResult`](crate::ValidationResult).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The raw text is not a well-formed protocol document.
    #[error("Protocol parse error: {0}")]
    Parse(String),

    /// The document parsed but does not conform to the schema.
    #[error("Schema violation at {path}: {message}")]
    SchemaViolation { path: String, message: String },
}

/// Failures while looking up the previously accepted revision.
#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("Repository not found: {0}")]
    RepositoryNotFound(String),

    #[error("Invalid repository id: {0:?}")]
    InvalidRepositoryId(String),

    #[error("Git command failed: {0}")]
    Git(String),

    /// The stored revision could not be parsed back into a document.
    #[error("Stored revision for {repository} is unreadable: {reason}")]
    Corrupt { repository: String, reason: String },
}

/// A compared field is absent or has an unexpected shape.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("Missing field: {0}")]
    Missing(&'static str),

    #[error("Field {field} has unexpected shape: {reason}")]
    Mistyped { field: &'static str, reason: String },
}

/// Failures while loading a schema definition.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Failed to read schema {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Schema is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Schema is not valid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Schema failed to compile: {0}")]
    Compile(String),
}
