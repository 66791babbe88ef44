//! Core types for breaking change detection

use serde::{Deserialize, Serialize};

/// How much regulatory process a change is likely to trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AmendmentLevel {
    /// The revision is effectively a different protocol.
    NewProtocol,
    /// Requires a substantial amendment and re-approval.
    Substantial,
    /// May require an amendment depending on the review board.
    MayRequireAmendment,
}

impl AmendmentLevel {
    pub fn id(&self) -> &'static str {
        match self {
            AmendmentLevel::NewProtocol => "NEW_PROTOCOL",
            AmendmentLevel::Substantial => "SUBSTANTIAL",
            AmendmentLevel::MayRequireAmendment => "MAY_REQUIRE_AMENDMENT",
        }
    }
}

impl std::fmt::Display for AmendmentLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// A breaking change detected between two protocol revisions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakingChange {
    /// The rule that detected this change
    pub rule_id: String,
    /// Human-readable warning, reported verbatim to callers
    pub message: String,
    pub level: AmendmentLevel,
}

impl BreakingChange {
    pub fn new(rule_id: &str, message: &str, level: AmendmentLevel) -> Self {
        Self {
            rule_id: rule_id.to_string(),
            message: message.to_string(),
            level,
        }
    }
}
