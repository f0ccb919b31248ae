//! Data collection configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default cadence for recurring collectors that do not declare their own.
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_secs(5);

/// Default capacity of the trace persistence queue.
pub const DEFAULT_PERSISTENCE_QUEUE_CAPACITY: usize = 64;

/// Configuration for the collection side of the pipeline.
///
/// Values can be set via environment variables:
/// - `TRACELINE_SAMPLE_INTERVAL_SECS`: default collector cadence in seconds
/// - `TRACELINE_PERSISTENCE_QUEUE`: trace persistence queue capacity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionConfig {
    /// Default cadence for recurring collectors.
    pub sample_interval: Duration,

    /// Capacity of the bounded trace persistence queue.
    pub persistence_queue_capacity: usize,
}

impl CollectionConfig {
    /// Creates a configuration from environment variables, falling back to
    /// defaults for anything unset.
    ///
    /// # Errors
    ///
    /// Returns an error if a set variable cannot be parsed.
    pub fn from_env() -> anyhow::Result<Self> {
        let sample_interval = std::env::var("TRACELINE_SAMPLE_INTERVAL_SECS")
            .ok()
            .map(|v| v.parse::<u64>())
            .transpose()?
            .map_or(DEFAULT_SAMPLE_INTERVAL, Duration::from_secs);

        let persistence_queue_capacity = std::env::var("TRACELINE_PERSISTENCE_QUEUE")
            .ok()
            .map(|v| v.parse::<usize>())
            .transpose()?
            .unwrap_or(DEFAULT_PERSISTENCE_QUEUE_CAPACITY);

        Ok(Self {
            sample_interval,
            persistence_queue_capacity,
        })
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if an interval or capacity is zero.
    pub fn validate(&self) -> Result<(), String> {
        if self.sample_interval.is_zero() {
            return Err("Sample interval must be greater than zero".to_string());
        }
        if self.persistence_queue_capacity == 0 {
            return Err("Persistence queue capacity must be greater than zero".to_string());
        }
        Ok(())
    }
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
            persistence_queue_capacity: DEFAULT_PERSISTENCE_QUEUE_CAPACITY,
        }
    }
}
