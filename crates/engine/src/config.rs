// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Engine configuration loaded from TOML files or constructed programmatically.
//!
//! # TOML Format
//! ```toml
//! memory_budget = "512M"            # optional; unbounded when absent
//! debug = false                     # reject NaN/Infinity uploads
//! check_shape_consistency = true    # reject ragged nested input
//! sync_read_warn_elements = 1000000 # warn on data_sync() of larger tensors
//! ```
//!
//! Every key is optional.

use crate::EngineError;
use data_storage::MemoryBudget;
use std::path::Path;
use tensor_core::Flags;

/// Configuration for an [`Engine`](crate::Engine).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Storage ceiling (human-readable, e.g. `"512M"`).
    pub memory_budget: Option<String>,
    /// Validate uploaded values.
    pub debug: bool,
    /// Validate that nested input is not ragged.
    pub check_shape_consistency: bool,
    /// Element count above which synchronous reads log a warning.
    pub sync_read_warn_elements: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            memory_budget: None,
            debug: false,
            check_shape_consistency: true,
            sync_read_warn_elements: 1_000_000,
        }
    }
}

impl EngineConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, EngineError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            EngineError::Config(format!("cannot read config '{}': {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, EngineError> {
        toml::from_str(toml_str)
            .map_err(|e| EngineError::Config(format!("TOML parse error: {e}")))
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, EngineError> {
        toml::to_string_pretty(self)
            .map_err(|e| EngineError::Config(format!("TOML serialise error: {e}")))
    }

    /// Parses the memory budget, if one is set.
    pub fn parse_budget(&self) -> Result<Option<MemoryBudget>, EngineError> {
        self.memory_budget
            .as_deref()
            .map(MemoryBudget::parse)
            .transpose()
            .map_err(|e| EngineError::Config(format!("invalid budget: {e}")))
    }

    /// Construction switches handed to tensor factories.
    pub fn flags(&self) -> Flags {
        Flags {
            debug: self.debug,
            check_shape_consistency: self.check_shape_consistency,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let c = EngineConfig::default();
        assert_eq!(c.memory_budget, None);
        assert!(!c.debug);
        assert!(c.check_shape_consistency);
        assert_eq!(c.sync_read_warn_elements, 1_000_000);
        assert_eq!(c.parse_budget().unwrap(), None);
    }

    #[test]
    fn test_parse_budget() {
        let c = EngineConfig {
            memory_budget: Some("256M".into()),
            ..Default::default()
        };
        assert_eq!(c.parse_budget().unwrap().unwrap().as_mb(), 256);

        let bad = EngineConfig {
            memory_budget: Some("plenty".into()),
            ..Default::default()
        };
        assert!(matches!(bad.parse_budget(), Err(EngineError::Config(_))));
    }

    #[test]
    fn test_from_toml() {
        let toml = r#"
memory_budget = "1G"
debug = true
check_shape_consistency = false
"#;
        let c = EngineConfig::from_toml(toml).unwrap();
        assert_eq!(c.memory_budget.as_deref(), Some("1G"));
        assert!(c.debug);
        assert!(!c.check_shape_consistency);
        assert_eq!(c.sync_read_warn_elements, 1_000_000);
    }

    #[test]
    fn test_from_empty_toml_is_default() {
        assert_eq!(EngineConfig::from_toml("").unwrap(), EngineConfig::default());
    }

    #[test]
    fn test_from_toml_rejects_garbage() {
        assert!(matches!(
            EngineConfig::from_toml("debug = \"very\""),
            Err(EngineError::Config(_))
        ));
    }

    #[test]
    fn test_to_toml_roundtrip() {
        let c = EngineConfig {
            memory_budget: Some("64M".into()),
            debug: true,
            ..Default::default()
        };
        let back = EngineConfig::from_toml(&c.to_toml().unwrap()).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn test_flags() {
        let c = EngineConfig {
            debug: true,
            ..Default::default()
        };
        assert_eq!(
            c.flags(),
            Flags {
                debug: true,
                check_shape_consistency: true
            }
        );
    }

    #[test]
    fn test_from_missing_file() {
        let err = EngineConfig::from_file(Path::new("/nonexistent/engine.toml")).unwrap_err();
        assert!(err.to_string().contains("cannot read config"));
    }
}
