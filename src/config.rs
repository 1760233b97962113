//! Scanner configuration
//!
//! Loaded from YAML; every field is optional and falls back to its default:
//!
//! ```yaml
//! sampling_interval_ms: 7000
//! capacity: 1024
//! max_consecutive_transport_errors: 10
//! event_queue_depth: 1024
//! ```
//!
//! The payload limit is not configurable: it is fixed by the 42-byte record layout.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::registry::validate_capacity;
use crate::types::{DEFAULT_CAPACITY, DEFAULT_SAMPLING_INTERVAL};
use crate::{BufferError, Result};

/// Runtime parameters of the scan buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScannerConfig {
    /// Sampling window length in milliseconds
    pub sampling_interval_ms: u64,

    /// Registry slots per window buffer (power of two)
    pub capacity: usize,

    /// Consecutive failed flushes after which transport errors are reported as
    /// degraded and only every n-th failure is logged at error level
    pub max_consecutive_transport_errors: u32,

    /// Bound of the queue between foreign radio threads and the event pump
    pub event_queue_depth: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            sampling_interval_ms: DEFAULT_SAMPLING_INTERVAL.as_millis() as u64,
            capacity: DEFAULT_CAPACITY,
            max_consecutive_transport_errors: 10,
            event_queue_depth: 1024,
        }
    }
}

impl ScannerConfig {
    /// Parse and validate a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)
            .map_err(|e| BufferError::parse("Scanner configuration", e.to_string()))?;
        config.validate()?;
        debug!(?config, "Loaded scanner configuration");
        Ok(config)
    }

    /// Read, parse and validate a YAML file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| BufferError::file_error(path.to_path_buf(), e))?;
        Self::from_yaml_str(&yaml)
    }

    /// Sampling window length
    pub fn sampling_interval(&self) -> Duration {
        Duration::from_millis(self.sampling_interval_ms)
    }

    /// Builder-style override of the sampling interval
    pub fn with_sampling_interval(mut self, interval: Duration) -> Self {
        self.sampling_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Builder-style override of the registry capacity
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Check every field against its allowed range
    pub fn validate(&self) -> Result<()> {
        if self.sampling_interval_ms == 0 {
            return Err(BufferError::config("sampling_interval_ms", "must be greater than zero"));
        }
        validate_capacity(self.capacity)?;
        if self.max_consecutive_transport_errors == 0 {
            return Err(BufferError::config(
                "max_consecutive_transport_errors",
                "must be at least 1",
            ));
        }
        if self.event_queue_depth == 0 {
            return Err(BufferError::config("event_queue_depth", "must be at least 1"));
        }
        Ok(())
    }
}
