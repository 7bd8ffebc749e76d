//! Entity store configuration.

use crate::{StoreError, StoreResult};
use regex_lite::Regex;
use serde::Deserialize;
use std::time::Duration;

/// Tunables of the entity store, loadable from TOML.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Pattern every label must match in full.
    pub label_pattern: String,

    /// Maximum label length in characters.
    pub label_max_length: usize,

    /// Length cap for business attributes whose definition carries none.
    pub business_attribute_max_length: usize,

    /// Maximum custom attribute key length in characters.
    pub custom_attribute_key_max_length: usize,

    /// Maximum custom attribute value length in characters.
    pub custom_attribute_value_max_length: usize,

    /// How long to wait for advisory entity locks.
    pub lock_timeout_ms: u64,

    /// Whether import batches are reported to the change notifier.
    pub notify_on_import: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            label_pattern: "^[a-zA-Z0-9_-]+$".to_string(),
            label_max_length: 50,
            business_attribute_max_length: 50,
            custom_attribute_key_max_length: 50,
            custom_attribute_value_max_length: 500,
            lock_timeout_ms: 10_000,
            notify_on_import: true,
        }
    }
}

impl StoreConfig {
    /// Parse a TOML document; missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> StoreResult<Self> {
        let config: StoreConfig = toml::from_str(text)
            .map_err(|e| StoreError::invalid_parameters(format!("invalid store config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> StoreResult<()> {
        self.label_regex()?;
        if self.label_max_length == 0 {
            return Err(StoreError::invalid_parameters(
                "label_max_length must be greater than zero",
            ));
        }
        if self.business_attribute_max_length == 0 {
            return Err(StoreError::invalid_parameters(
                "business_attribute_max_length must be greater than zero",
            ));
        }
        if self.custom_attribute_key_max_length == 0 || self.custom_attribute_value_max_length == 0
        {
            return Err(StoreError::invalid_parameters(
                "custom attribute length limits must be greater than zero",
            ));
        }
        Ok(())
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    pub(crate) fn label_regex(&self) -> StoreResult<Regex> {
        Regex::new(&self.label_pattern).map_err(|e| {
            StoreError::invalid_parameters(format!(
                "invalid label_pattern {}: {}",
                self.label_pattern, e
            ))
        })
    }
}
