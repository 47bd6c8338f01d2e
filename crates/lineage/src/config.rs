//! Configuration for tree builds and the reference gateway.
//!
//! Configuration lives in a YAML file:
//!
//! ```yaml
//! traversal:
//!   max-depth: 2
//!   max-concurrent-fetches: 8
//! gateway:
//!   max-parents: 2
//!   reject-cycles: false
//! ```
//!
//! Every key is optional; missing keys take the defaults shown above.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

/// Default number of generations expanded above the root.
pub const DEFAULT_MAX_DEPTH: usize = 2;

/// Upper bound accepted for `max-depth`.
pub const MAX_DEPTH_LIMIT: usize = 64;

/// Default cap on gateway fetches in flight for one build.
pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 8;

/// Default number of parents the reference gateway allows per person.
pub const DEFAULT_MAX_PARENTS: usize = 2;

/// Top-level configuration file structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "kebab-case")]
pub struct LineageConfig {
    /// Traversal settings
    pub traversal: TraversalConfig,

    /// Reference gateway settings
    pub gateway: GatewayConfig,
}

/// Traversal configuration section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "kebab-case")]
pub struct TraversalConfig {
    /// Generations expanded above the root (0 = root only)
    pub max_depth: usize,

    /// Gateway fetches allowed in flight at once
    pub max_concurrent_fetches: usize,
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
        }
    }
}

/// Edit rules enforced by the in-memory gateway
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "kebab-case")]
pub struct GatewayConfig {
    /// Maximum parents per person (`null` for no limit)
    pub max_parents: Option<usize>,

    /// Refuse edits that would make a person their own ancestor
    pub reject_cycles: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            max_parents: Some(DEFAULT_MAX_PARENTS),
            reject_cycles: false,
        }
    }
}

impl LineageConfig {
    /// Load configuration from a file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed as YAML. Values
    /// out of range fail [`validate`](Self::validate).
    pub async fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).await?;
        let config: Self =
            serde_yaml::from_str(&content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        tracing::debug!(path = %path.display(), ?config, "Loaded configuration");
        Ok(config)
    }

    /// Save configuration to a file
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub async fn save(&self, path: &Path) -> Result<()> {
        let content =
            serde_yaml::to_string(self).map_err(|e| Error::Config(format!("YAML error: {}", e)))?;
        fs::write(path, content).await?;
        Ok(())
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` naming the first out-of-range value.
    pub fn validate(&self) -> Result<()> {
        if self.traversal.max_depth > MAX_DEPTH_LIMIT {
            return Err(Error::Config(format!(
                "max-depth cannot exceed {}",
                MAX_DEPTH_LIMIT
            )));
        }

        if self.traversal.max_concurrent_fetches == 0 {
            return Err(Error::Config(
                "max-concurrent-fetches must be at least 1".to_string(),
            ));
        }

        if self.gateway.max_parents == Some(0) {
            return Err(Error::Config(
                "max-parents must be at least 1 (use null for no limit)".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = LineageConfig::default();
        assert_eq!(config.traversal.max_depth, 2);
        assert_eq!(config.traversal.max_concurrent_fetches, 8);
        assert_eq!(config.gateway.max_parents, Some(2));
        assert!(!config.gateway.reject_cycles);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config: LineageConfig = serde_yaml::from_str("traversal:\n  max-depth: 5\n").unwrap();
        assert_eq!(config.traversal.max_depth, 5);
        assert_eq!(config.traversal.max_concurrent_fetches, 8);
        assert_eq!(config.gateway, GatewayConfig::default());
    }

    #[test]
    fn test_null_max_parents_means_unlimited() {
        let config: LineageConfig = serde_yaml::from_str("gateway:\n  max-parents: null\n").unwrap();
        assert_eq!(config.gateway.max_parents, None);
        assert!(config.validate().is_ok());
    }

    #[rstest]
    #[case::depth_too_large("traversal:\n  max-depth: 65\n", "max-depth")]
    #[case::zero_fetches("traversal:\n  max-concurrent-fetches: 0\n", "max-concurrent-fetches")]
    #[case::zero_parents("gateway:\n  max-parents: 0\n", "max-parents")]
    fn test_validate_rejects(#[case] yaml: &str, #[case] expected: &str) {
        let config: LineageConfig = serde_yaml::from_str(yaml).unwrap();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains(expected), "unexpected error: {}", err);
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lineage.yaml");

        let mut config = LineageConfig::default();
        config.traversal.max_depth = 4;
        config.gateway.reject_cycles = true;
        config.save(&path).await.unwrap();

        let loaded = LineageConfig::load(&path).await.unwrap();
        assert_eq!(loaded, config);
    }

    #[tokio::test]
    async fn test_load_invalid_yaml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lineage.yaml");
        fs::write(&path, "traversal: [not, a, map]").await.unwrap();

        let result = LineageConfig::load(&path).await;
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
