//! Validation of candidate protocol revisions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::breaking::BreakingChangeDetector;
use crate::document::ProtocolDocument;
use crate::error::ValidationError;
use crate::hash::{integrity_hash, short_hash};
use crate::history::RevisionHistory;
use crate::schema::SchemaDefinition;

/// Outcome of validating one candidate revision.
///
/// Serialises with the field names callers persist in the audit trail.
/// `integrity_hash` and `breaking_changes` are present only for valid
/// results, `error` only for invalid ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integrity_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breaking_changes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ValidationResult {
    pub fn rejected(error: &ValidationError, document: Option<&ProtocolDocument>) -> Self {
        Self {
            valid: false,
            document_id: document.and_then(ProtocolDocument::id),
            document_version: document.and_then(ProtocolDocument::version),
            integrity_hash: None,
            breaking_changes: None,
            error: Some(error.to_string()),
            timestamp: Utc::now(),
        }
    }

    /// Breaking change warnings; empty for invalid results.
    pub fn warnings(&self) -> &[String] {
        self.breaking_changes.as_deref().unwrap_or_default()
    }

    /// Equality ignoring `timestamp`.
    pub fn same_outcome(&self, other: &Self) -> bool {
        self.valid == other.valid
            && self.document_id == other.document_id
            && self.document_version == other.document_version
            && self.integrity_hash == other.integrity_hash
            && self.breaking_changes == other.breaking_changes
            && self.error == other.error
    }
}

/// Validator for a single call; holds only borrowed collaborators.
pub struct ProtocolValidator<'a, H: RevisionHistory + ?Sized> {
    schema: &'a SchemaDefinition,
    history: &'a H,
    detector: BreakingChangeDetector,
}

impl<'a, H: RevisionHistory + ?Sized> ProtocolValidator<'a, H> {
    pub fn new(schema: &'a SchemaDefinition, history: &'a H) -> Self {
        Self {
            schema,
            history,
            detector: BreakingChangeDetector::default(),
        }
    }

    pub fn with_detector(mut self, detector: BreakingChangeDetector) -> Self {
        self.detector = detector;
        self
    }

    /// Validates `raw_text` as the next revision of `repository_id`.
    ///
    /// Never fails: parse errors and schema violations produce a result with
    /// `valid = false`.
    pub fn validate(&self, repository_id: &str, raw_text: &str) -> ValidationResult {
        let document = match ProtocolDocument::parse(raw_text) {
            Ok(document) => document,
            Err(e) => {
                info!(repository = repository_id, error = %e, "protocol rejected");
                return ValidationResult::rejected(&e, None);
            }
        };

        if let Some(violation) = self.schema.first_violation(document.as_value()) {
            info!(repository = repository_id, error = %violation, "protocol rejected");
            return ValidationResult::rejected(&violation, Some(&document));
        }

        let hash = integrity_hash(raw_text);
        let breaking_changes = self.detector.detect(repository_id, &document, self.history);

        info!(
            repository = repository_id,
            protocol_id = document.id().as_deref().unwrap_or("unknown"),
            hash = short_hash(&hash),
            breaking_changes = breaking_changes.len(),
            "protocol validation passed"
        );

        ValidationResult {
            valid: true,
            document_id: document.id(),
            document_version: document.version(),
            integrity_hash: Some(hash),
            breaking_changes: Some(breaking_changes),
            error: None,
            timestamp: Utc::now(),
        }
    }
}

/// Convenience wrapper constructing a [`ProtocolValidator`] for one call.
pub fn validate_protocol_update<H>(
    repository_id: &str,
    raw_text: &str,
    schema: &SchemaDefinition,
    history: &H,
) -> ValidationResult
where
    H: RevisionHistory + ?Sized,
{
    ProtocolValidator::new(schema, history).validate(repository_id, raw_text)
}
