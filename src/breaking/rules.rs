//! The amendment rules, in the order they are evaluated.
//!
//! Each rule compares one aspect of the candidate against the previously
//! accepted revision. A rule that cannot read its field returns an error and
//! the whole check is abandoned by the detector.

use crate::breaking::types::{AmendmentLevel, BreakingChange};
use crate::document::{ProtocolDocument, same_number};
use crate::error::FieldError;

pub type RuleFn =
    fn(&ProtocolDocument, &ProtocolDocument) -> Result<Option<BreakingChange>, FieldError>;

pub const PROTOCOL_ID_CHANGED: &str = "Protocol ID changed - requires new protocol";
pub const TARGET_ENROLLMENT_CHANGED: &str = "Target enrollment changed - may require amendment";
pub const PRIMARY_ENDPOINTS_CHANGED: &str =
    "Primary endpoints changed - requires substantial amendment";
pub const INCLUSION_CRITERIA_CHANGED: &str = "Inclusion criteria changed - may require amendment";

/// Rule table. Output order follows this order exactly.
const RULES: &[(&str, RuleFn)] = &[
    ("PROTOCOL_SAME_ID", check_protocol_same_id),
    ("POPULATION_SAME_TARGET_SIZE", check_population_same_target_size),
    ("ENDPOINTS_SAME_PRIMARY", check_endpoints_same_primary),
    ("POPULATION_SAME_INCLUSION", check_population_same_inclusion),
];

pub fn get_rule_mapping() -> &'static [(&'static str, RuleFn)] {
    RULES
}

pub fn get_rule_ids() -> Vec<&'static str> {
    RULES.iter().map(|(id, _)| *id).collect()
}

pub fn check_protocol_same_id(
    current: &ProtocolDocument,
    previous: &ProtocolDocument,
) -> Result<Option<BreakingChange>, FieldError> {
    let changed = current.require_id()? != previous.require_id()?;
    Ok(changed.then(|| {
        BreakingChange::new(
            "PROTOCOL_SAME_ID",
            PROTOCOL_ID_CHANGED,
            AmendmentLevel::NewProtocol,
        )
    }))
}

pub fn check_population_same_target_size(
    current: &ProtocolDocument,
    previous: &ProtocolDocument,
) -> Result<Option<BreakingChange>, FieldError> {
    let changed = !same_number(&current.target_size()?, &previous.target_size()?);
    Ok(changed.then(|| {
        BreakingChange::new(
            "POPULATION_SAME_TARGET_SIZE",
            TARGET_ENROLLMENT_CHANGED,
            AmendmentLevel::MayRequireAmendment,
        )
    }))
}

/// Primary endpoints are ranked, so reordering counts as a change.
pub fn check_endpoints_same_primary(
    current: &ProtocolDocument,
    previous: &ProtocolDocument,
) -> Result<Option<BreakingChange>, FieldError> {
    let changed = current.primary_endpoints()? != previous.primary_endpoints()?;
    Ok(changed.then(|| {
        BreakingChange::new(
            "ENDPOINTS_SAME_PRIMARY",
            PRIMARY_ENDPOINTS_CHANGED,
            AmendmentLevel::Substantial,
        )
    }))
}

/// Inclusion criteria compare as a set.
pub fn check_population_same_inclusion(
    current: &ProtocolDocument,
    previous: &ProtocolDocument,
) -> Result<Option<BreakingChange>, FieldError> {
    let changed = current.inclusion_criteria()? != previous.inclusion_criteria()?;
    Ok(changed.then(|| {
        BreakingChange::new(
            "POPULATION_SAME_INCLUSION",
            INCLUSION_CRITERIA_CHANGED,
            AmendmentLevel::MayRequireAmendment,
        )
    }))
}
