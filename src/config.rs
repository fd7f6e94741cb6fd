//! Processor configuration

use crate::error::TelemetryError;
use crate::stats::SIGNIFICANCE_THRESHOLD;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default rolling window size in samples
pub const DEFAULT_WINDOW_SIZE: usize = 30;

/// Default minimum number of paired samples before a correlation is reported
pub const DEFAULT_MIN_CORRELATION_SAMPLES: usize = 3;

/// Settings for a [`TelemetryProcessor`](crate::pipeline::TelemetryProcessor)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Samples retained per series in each device window
    pub window_size: usize,
    /// |r| above which a correlation is flagged as significant
    pub significance_threshold: f64,
    /// Paired samples required before a correlation is reported
    pub min_correlation_samples: usize,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            significance_threshold: SIGNIFICANCE_THRESHOLD,
            min_correlation_samples: DEFAULT_MIN_CORRELATION_SAMPLES,
        }
    }
}

impl ProcessorConfig {
    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size;
        self
    }

    pub fn validate(&self) -> Result<(), TelemetryError> {
        if self.window_size == 0 {
            return Err(TelemetryError::InvalidConfig(
                "window_size must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.significance_threshold) {
            return Err(TelemetryError::InvalidConfig(format!(
                "significance_threshold must be within [0, 1], got {}",
                self.significance_threshold
            )));
        }
        if self.min_correlation_samples < 2 {
            return Err(TelemetryError::InvalidConfig(
                "min_correlation_samples must be at least 2".to_string(),
            ));
        }
        Ok(())
    }

    /// Parse and validate configuration JSON; missing fields take defaults
    pub fn from_json(json: &str) -> Result<Self, TelemetryError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, TelemetryError> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ProcessorConfig::default();
        assert_eq!(config.window_size, 30);
        assert_eq!(config.significance_threshold, 0.3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = ProcessorConfig::from_json(r#"{"window_size": 7}"#).unwrap();
        assert_eq!(config.window_size, 7);
        assert_eq!(config.min_correlation_samples, 3);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(ProcessorConfig::from_json(r#"{"window_size": 0}"#).is_err());
        assert!(ProcessorConfig::from_json(r#"{"significance_threshold": 1.5}"#).is_err());
        assert!(ProcessorConfig::from_json(r#"{"min_correlation_samples": 1}"#).is_err());
        assert!(ProcessorConfig::from_json("not json").is_err());
    }
}
