//! Context and diagnostic-log configuration

use serde::{Deserialize, Serialize};

use crate::{GlKitError, Result};

/// Bounds for the growing buffer used to read program info logs.
///
/// The driver only reports the copied length, so the fetcher retries with a
/// larger buffer until the text fits strictly inside it or `max_size` is reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InfoLogConfig {
    /// First buffer size in bytes
    pub initial_size: usize,

    /// Buffers of this size or larger are never attempted
    pub max_size: usize,

    /// Multiplier applied after each truncated read
    pub growth_factor: usize,
}

impl Default for InfoLogConfig {
    fn default() -> Self {
        Self {
            initial_size: 16 * 1024,
            max_size: 2 * 1024 * 1024,
            growth_factor: 2,
        }
    }
}

impl InfoLogConfig {
    /// Candidate buffer sizes in the order they are tried.
    pub fn buffer_sizes(&self) -> impl Iterator<Item = usize> {
        let growth = self.growth_factor.max(2);
        let max = self.max_size;
        std::iter::successors(Some(self.initial_size.max(2)), move |&size| {
            size.checked_mul(growth)
        })
        .take_while(move |&size| size < max)
    }
}

/// Graphics context configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Label used in log output
    pub label: String,

    /// Info-log fetch bounds for programs created in this context
    pub info_log: InfoLogConfig,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            label: "default".to_string(),
            info_log: InfoLogConfig::default(),
        }
    }
}

impl ContextConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| GlKitError::config_with_source("invalid context configuration", e))
    }

    /// Set the label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}
