//! Runtime Configuration
//!
//! All fields have defaults, so an empty JSON object is a valid
//! configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ReactiveError, Result};

/// Tunables for one [`Runtime`](crate::reactive::Runtime).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// How many container levels the deep-version walk descends.
    pub deep_version_depth: usize,

    /// Safety timeout for exit transitions that never report completion.
    pub transition_timeout_ms: u64,

    /// Frame period used by [`TokioFrames`](crate::dom::TokioFrames).
    pub frame_interval_ms: u64,

    /// Upper bound on flush rounds drained by `Runtime::settle`.
    pub max_flush_rounds: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            deep_version_depth: 5,
            transition_timeout_ms: 1000,
            frame_interval_ms: 16,
            max_flush_rounds: 100,
        }
    }
}

impl RuntimeConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| ReactiveError::Config(e.to_string()))
    }

    pub fn transition_timeout(&self) -> Duration {
        Duration::from_millis(self.transition_timeout_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_uses_defaults() {
        let config = RuntimeConfig::from_json_str("{}").unwrap();
        assert_eq!(config, RuntimeConfig::default());
        assert_eq!(config.deep_version_depth, 5);
    }

    #[test]
    fn partial_override() {
        let config = RuntimeConfig::from_json_str(r#"{"transition_timeout_ms": 250}"#).unwrap();
        assert_eq!(config.transition_timeout(), Duration::from_millis(250));
        assert_eq!(config.frame_interval_ms, 16);
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let err = RuntimeConfig::from_json_str("{ nope").unwrap_err();
        assert!(matches!(err, ReactiveError::Config(_)));
    }
}
