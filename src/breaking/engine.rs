//! Breaking change detection engine
//!
//! Runs the rule table against the candidate and the most recently accepted
//! revision of a repository.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::breaking::rules;
use crate::breaking::types::BreakingChange;
use crate::document::ProtocolDocument;
use crate::error::FieldError;
use crate::history::RevisionHistory;

/// Configuration for breaking change detection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakingConfig {
    /// Rules to explicitly disable
    #[serde(default)]
    pub except_rules: Vec<String>,
}

impl BreakingConfig {
    pub fn is_enabled(&self, rule_id: &str) -> bool {
        !self.except_rules.iter().any(|r| r == rule_id)
    }
}

/// Compares candidate revisions against repository history.
///
/// Detection is advisory: a history lookup failure or an unreadable field
/// yields an empty list and a warning log instead of an error.
#[derive(Debug, Clone, Default)]
pub struct BreakingChangeDetector {
    config: BreakingConfig,
}

impl BreakingChangeDetector {
    pub fn new(config: BreakingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BreakingConfig {
        &self.config
    }

    /// Compares two documents directly.
    ///
    /// Fails on the first rule that cannot read its fields; changes found by
    /// earlier rules are discarded in that case.
    pub fn check(
        &self,
        candidate: &ProtocolDocument,
        previous: &ProtocolDocument,
    ) -> Result<Vec<BreakingChange>, FieldError> {
        let mut changes = Vec::new();
        for (rule_id, rule_fn) in rules::get_rule_mapping() {
            if !self.config.is_enabled(rule_id) {
                continue;
            }
            if let Some(change) = rule_fn(candidate, previous)? {
                changes.push(change);
            }
        }
        Ok(changes)
    }

    /// Structured changes against the latest accepted revision.
    pub fn detect_changes<H>(
        &self,
        repository_id: &str,
        candidate: &ProtocolDocument,
        history: &H,
    ) -> Vec<BreakingChange>
    where
        H: RevisionHistory + ?Sized,
    {
        let previous = match history.most_recent_document(repository_id) {
            Ok(Some(previous)) => previous,
            Ok(None) => {
                debug!(
                    repository = repository_id,
                    "no prior revision, skipping breaking change check"
                );
                return Vec::new();
            }
            Err(e) => {
                warn!(repository = repository_id, error = %e, "Error checking breaking changes");
                return Vec::new();
            }
        };

        match self.check(candidate, &previous) {
            Ok(changes) => changes,
            Err(e) => {
                warn!(repository = repository_id, error = %e, "Error checking breaking changes");
                Vec::new()
            }
        }
    }

    /// Warning messages against the latest accepted revision, in rule order.
    pub fn detect<H>(
        &self,
        repository_id: &str,
        candidate: &ProtocolDocument,
        history: &H,
    ) -> Vec<String>
    where
        H: RevisionHistory + ?Sized,
    {
        self.detect_changes(repository_id, candidate, history)
            .into_iter()
            .map(|change| change.message)
            .collect()
    }
}
