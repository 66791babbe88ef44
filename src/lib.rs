pub mod breaking;
pub mod config;
pub mod document;
pub mod error;
pub mod hash;
pub mod history;
pub mod schema;
#[cfg(feature = "server")]
pub mod server;
pub mod telemetry;
pub mod validate;

pub use breaking::{AmendmentLevel, BreakingChange, BreakingChangeDetector, BreakingConfig};
pub use config::GuardConfig;
pub use document::{Endpoints, Population, ProtocolDocument};
pub use error::{FieldError, HistoryError, SchemaError, ValidationError};
pub use hash::integrity_hash;
pub use history::{GitRevisionHistory, MemoryRevisionHistory, RevisionHistory};
pub use schema::SchemaDefinition;
pub use validate::{ProtocolValidator, ValidationResult, validate_protocol_update};
