//! Serializable processor configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::types::validate_positive;
use crate::error::{ProcessorError, Result};
use crate::stretch::params::EngineTuning;

/// Initial parameters and engine tuning for a [`StretchProcessor`](crate::StretchProcessor).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Initial tempo factor.
    pub speed: f64,
    /// Initial frequency scale.
    pub pitch: f64,
    /// Pinned output rate; `None` keeps the input rate.
    pub output_sample_rate_hz: Option<u32>,
    pub engine: EngineTuning,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            speed: 1.0,
            pitch: 1.0,
            output_sample_rate_hz: None,
            engine: EngineTuning::default(),
        }
    }
}

impl ProcessorConfig {
    /// Checks every value the processor relies on.
    ///
    /// # Errors
    /// Returns `ProcessorError::InvalidParameter` naming the first bad field.
    pub fn validate(&self) -> Result<()> {
        validate_positive("speed", self.speed)?;
        validate_positive("pitch", self.pitch)?;
        if self.output_sample_rate_hz == Some(0) {
            return Err(ProcessorError::InvalidParameter {
                name: "output_sample_rate_hz",
                value: 0.0,
            });
        }
        self.engine.validate()
    }

    /// Parses and validates a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| ProcessorError::Config(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes the configuration as pretty-printed JSON.
    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ProcessorError::Config(format!("failed to serialize config: {}", e)))
    }
}

/// Writes a configuration as JSON.
pub fn write_config_json(path: &Path, config: &ProcessorConfig) -> Result<()> {
    std::fs::write(path, config.to_json_string()?)?;
    Ok(())
}

/// Reads and validates a configuration from JSON.
pub fn read_config_json(path: &Path) -> Result<ProcessorConfig> {
    let data = std::fs::read_to_string(path)?;
    ProcessorConfig::from_json_str(&data).map_err(|e| match e {
        ProcessorError::Config(msg) => {
            ProcessorError::Config(format!("{} ({})", msg, path.display()))
        }
        other => other,
    })
}
