//! Configuration for FieldLineage.
//!
//! Defines the JSON config format: database location, traversal depth
//! defaults and caps, and criticality markers. Loaded from a file with
//! serde; every field has a default so a partial (or absent) config works.

use std::path::Path;

use regex::RegexSet;
use serde::{Deserialize, Serialize};

use crate::error::{LineageError, Result};

// ---------------------------------------------------------------------------
// LineageConfig
// ---------------------------------------------------------------------------

/// Root configuration for FieldLineage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineageConfig {
    /// Path to the SQLite edge store.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Traversal depth used when the caller does not ask for one.
    #[serde(default = "default_max_depth")]
    pub default_max_depth: u32,

    /// Hard ceiling on requested traversal depth; larger requests are
    /// clamped down to this value.
    #[serde(default = "default_depth_cap")]
    pub depth_cap: u32,

    /// Dataset-name regexes marking business-critical tables. Empty means
    /// use the built-in markers.
    #[serde(default)]
    pub critical_dataset_patterns: Vec<String>,
}

impl Default for LineageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            default_max_depth: default_max_depth(),
            depth_cap: default_depth_cap(),
            critical_dataset_patterns: Vec::new(),
        }
    }
}

impl LineageConfig {
    /// Load a config file, falling back to defaults for absent fields.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check invariants that serde alone cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.default_max_depth < 1 {
            return Err(LineageError::Config(
                "default_max_depth must be at least 1".to_string(),
            ));
        }
        if self.depth_cap < 1 {
            return Err(LineageError::Config(
                "depth_cap must be at least 1".to_string(),
            ));
        }
        if self.default_max_depth > self.depth_cap {
            return Err(LineageError::Config(format!(
                "default_max_depth ({}) exceeds depth_cap ({})",
                self.default_max_depth, self.depth_cap
            )));
        }
        // Compile-check the markers now so a bad pattern fails at load
        // time rather than mid-analysis.
        RegexSet::new(&self.critical_dataset_patterns)?;
        Ok(())
    }

    /// Clamp a requested depth to the configured ceiling. Zero passes
    /// through unchanged; the engine rejects it with a proper error.
    pub fn clamp_depth(&self, requested: u32) -> u32 {
        requested.min(self.depth_cap)
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn default_database_path() -> String {
    "lineage.db".to_string()
}

fn default_max_depth() -> u32 {
    5
}

fn default_depth_cap() -> u32 {
    50
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq as pa_eq;
    use std::io::Write as _;

    #[test]
    fn test_default_config() {
        let config = LineageConfig::default();
        assert_eq!(config.database_path, "lineage.db");
        assert_eq!(config.default_max_depth, 5);
        assert_eq!(config.depth_cap, 50);
        assert!(config.critical_dataset_patterns.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: LineageConfig =
            serde_json::from_str(r#"{"database_path": "/var/lib/lineage.db"}"#).unwrap();
        assert_eq!(config.database_path, "/var/lib/lineage.db");
        assert_eq!(config.default_max_depth, 5);
        assert_eq!(config.depth_cap, 50);
    }

    #[test]
    fn test_empty_json_is_the_default() {
        let config: LineageConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.default_max_depth, LineageConfig::default().default_max_depth);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lineage.json");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            r#"{{"default_max_depth": 3, "depth_cap": 10, "critical_dataset_patterns": ["^kpi_"]}}"#
        )
        .unwrap();

        let config = LineageConfig::load(&path).unwrap();
        assert_eq!(config.default_max_depth, 3);
        assert_eq!(config.depth_cap, 10);
        assert_eq!(config.critical_dataset_patterns, ["^kpi_"]);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let result = LineageConfig::load(Path::new("/nonexistent/lineage.json"));
        assert!(matches!(result, Err(LineageError::Io(_))));
    }

    #[test]
    fn test_load_invalid_json_is_json_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{not json").unwrap();

        let result = LineageConfig::load(&path);
        assert!(matches!(result, Err(LineageError::Json(_))));
    }

    #[test]
    fn test_validate_rejects_zero_depths() {
        let mut config = LineageConfig::default();
        config.default_max_depth = 0;
        assert!(matches!(config.validate(), Err(LineageError::Config(_))));

        let mut config = LineageConfig::default();
        config.depth_cap = 0;
        assert!(matches!(config.validate(), Err(LineageError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_default_above_cap() {
        let mut config = LineageConfig::default();
        config.default_max_depth = 100;
        config.depth_cap = 10;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("exceeds depth_cap"));
    }

    #[test]
    fn test_validate_rejects_bad_pattern() {
        let mut config = LineageConfig::default();
        config.critical_dataset_patterns = vec!["(unclosed".to_string()];
        assert!(matches!(config.validate(), Err(LineageError::Pattern(_))));
    }

    #[test]
    fn test_clamp_depth() {
        let config = LineageConfig::default();
        assert_eq!(config.clamp_depth(3), 3);
        assert_eq!(config.clamp_depth(50), 50);
        assert_eq!(config.clamp_depth(500), 50);
        assert_eq!(config.clamp_depth(0), 0, "zero is the engine's to reject");
    }

    #[test]
    fn test_serde_round_trip() {
        let mut config = LineageConfig::default();
        config.database_path = "/data/lineage.db".to_string();
        config.critical_dataset_patterns = vec!["^fact_".to_string(), "report".to_string()];

        let json = serde_json::to_string(&config).unwrap();
        let back: LineageConfig = serde_json::from_str(&json).unwrap();
        pa_eq!(back.database_path, config.database_path);
        pa_eq!(back.default_max_depth, config.default_max_depth);
        pa_eq!(back.depth_cap, config.depth_cap);
        pa_eq!(back.critical_dataset_patterns, config.critical_dataset_patterns);
    }
}
