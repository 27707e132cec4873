//! Coordinator configuration.
//!
//! Loaded from JSON; every field has a default so a partial document (or
//! `{}`) is valid.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::HubrisError;
use crate::tick::TickConfig;

/// Root configuration for a host running the coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubrisConfig {
    /// Tick broadcaster settings.
    pub tick: TickConfig,
    /// Host frames per second.
    pub frame_rate: f64,
}

impl Default for HubrisConfig {
    fn default() -> Self {
        Self {
            tick: TickConfig::default(),
            frame_rate: 60.0,
        }
    }
}

impl HubrisConfig {
    /// Parses and validates a config from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`HubrisError::Config`] on malformed JSON and a validation
    /// error if a value is out of range.
    pub fn from_json_str(s: &str) -> Result<Self, HubrisError> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a config file.
    ///
    /// # Errors
    ///
    /// Returns [`HubrisError::Io`] if the file cannot be read, otherwise as
    /// [`HubrisConfig::from_json_str`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, HubrisError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Checks every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`HubrisError::InvalidInterval`] or
    /// [`HubrisError::InvalidFrameRate`].
    pub fn validate(&self) -> Result<(), HubrisError> {
        self.tick.validate()?;
        if !(self.frame_rate.is_finite() && self.frame_rate > 0.0) {
            return Err(HubrisError::InvalidFrameRate(self.frame_rate));
        }
        Ok(())
    }

    /// Seconds per host frame.
    #[must_use]
    pub fn frame_secs(&self) -> f64 {
        1.0 / self.frame_rate
    }
}
