//! Engine configuration.
//!
//! Configuration is plain data and can be loaded from JSON; missing fields
//! take their defaults.
//!
//! ```rust
//! use weft_core::EngineConfig;
//!
//! let config = EngineConfig::from_json(r#"{ "yield_threshold_ms": 4.0 }"#).unwrap();
//! assert_eq!(config.yield_threshold_ms, 4.0);
//! assert!(config.discard_abandoned_nodes);
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while loading a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("yield threshold must be a non-negative number of milliseconds, got {0}")]
    InvalidYieldThreshold(f64),
}

/// Tuning knobs for an [`Engine`](crate::Engine).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// The work loop stops starting new units once the deadline reports less
    /// than this many milliseconds remaining.
    #[serde(default = "default_yield_threshold_ms")]
    pub yield_threshold_ms: f64,

    /// Hand host nodes created by an abandoned pass back to the host via
    /// `HostAdapter::discard_node`.
    #[serde(default = "default_discard_abandoned_nodes")]
    pub discard_abandoned_nodes: bool,
}

fn default_yield_threshold_ms() -> f64 {
    1.0
}

fn default_discard_abandoned_nodes() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            yield_threshold_ms: default_yield_threshold_ms(),
            discard_abandoned_nodes: default_discard_abandoned_nodes(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that all values are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.yield_threshold_ms.is_nan() || self.yield_threshold_ms < 0.0 {
            return Err(ConfigError::InvalidYieldThreshold(self.yield_threshold_ms));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        assert_eq!(EngineConfig::from_json("{}").unwrap(), EngineConfig::default());
    }

    #[test]
    fn fields_override_defaults() {
        let config = EngineConfig::from_json(
            r#"{ "yield_threshold_ms": 0.5, "discard_abandoned_nodes": false }"#,
        )
        .unwrap();
        assert_eq!(config.yield_threshold_ms, 0.5);
        assert!(!config.discard_abandoned_nodes);
    }

    #[test]
    fn negative_threshold_is_rejected() {
        let err = EngineConfig::from_json(r#"{ "yield_threshold_ms": -1 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidYieldThreshold(v) if v == -1.0));
    }

    #[test]
    fn malformed_json_is_reported() {
        assert!(matches!(
            EngineConfig::from_json("{ nope"),
            Err(ConfigError::Json(_))
        ));
    }
}
