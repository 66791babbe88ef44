//! Breaking change detection between protocol revisions.

pub mod engine;
pub mod rules;
pub mod types;

pub use engine::{BreakingChangeDetector, BreakingConfig};
pub use types::{AmendmentLevel, BreakingChange};
