//! YAML configuration shared by the CLI and the HTTP service.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::breaking::BreakingConfig;
use crate::history::{DEFAULT_PROTOCOL_PATH, GitRevisionHistory};
use crate::schema::SchemaDefinition;

fn default_repo_root() -> PathBuf {
    PathBuf::from("/var/ctrepos")
}

fn default_protocol_path() -> String {
    DEFAULT_PROTOCOL_PATH.to_string()
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

/// Settings loaded from `ctrepo.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardConfig {
    /// Directory holding `<name>.ctrepo` repositories
    #[serde(default = "default_repo_root")]
    pub repo_root: PathBuf,
    /// JSON-Schema file; the built-in schema is used when absent
    #[serde(default)]
    pub schema: Option<PathBuf>,
    /// Path of the protocol file inside each repository
    #[serde(default = "default_protocol_path")]
    pub protocol_path: String,
    /// Listen address for the HTTP service
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Upper bound on a single validation request in the HTTP service
    #[serde(default = "default_timeout_secs")]
    pub validation_timeout_secs: u64,
    #[serde(default)]
    pub breaking: BreakingConfig,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            repo_root: default_repo_root(),
            schema: None,
            protocol_path: default_protocol_path(),
            bind: default_bind(),
            validation_timeout_secs: default_timeout_secs(),
            breaking: BreakingConfig::default(),
        }
    }
}

impl GuardConfig {
    /// Load configuration from YAML file
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config '{}'", path.display()))?;
        Self::from_yaml_str(&content)
            .with_context(|| format!("Invalid config '{}'", path.display()))
    }

    /// Load configuration from YAML string. An empty document yields defaults.
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Option<GuardConfig> = serde_yaml::from_str(yaml)?;
        Ok(config.unwrap_or_default())
    }

    /// Loads the configured schema, or the built-in one.
    pub fn load_schema(&self) -> anyhow::Result<SchemaDefinition> {
        let schema = match &self.schema {
            Some(path) => SchemaDefinition::from_path(path)?,
            None => SchemaDefinition::builtin()?,
        };
        Ok(schema)
    }

    /// Git commands share the validation deadline so a stuck read is killed
    /// instead of outliving the request.
    pub fn git_history(&self) -> GitRevisionHistory {
        GitRevisionHistory::new(&self.repo_root)
            .with_protocol_path(&self.protocol_path)
            .with_command_timeout(Duration::from_secs(self.validation_timeout_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GuardConfig::default();
        assert_eq!(config.repo_root, PathBuf::from("/var/ctrepos"));
        assert_eq!(config.protocol_path, "protocol.yaml");
        assert_eq!(config.validation_timeout_secs, 10);
        assert!(config.breaking.except_rules.is_empty());
    }

    #[test]
    fn test_empty_yaml_gives_defaults() {
        assert_eq!(GuardConfig::from_yaml_str("").unwrap(), GuardConfig::default());
    }

    #[test]
    fn test_builtin_schema_when_unset() {
        assert!(GuardConfig::default().load_schema().is_ok());
    }
}
