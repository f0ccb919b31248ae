//! Flush scheduling configuration.
//!
//! Metrics and traces flush on independent cadences; each cycle reads the
//! unsent records, batches them, and hands them to the upload client.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default metric flush cadence.
pub const DEFAULT_METRIC_FLUSH_INTERVAL: Duration = Duration::from_secs(60);

/// Default trace flush cadence.
pub const DEFAULT_TRACE_FLUSH_INTERVAL: Duration = Duration::from_secs(30);

/// Configuration for the sending side of the pipeline.
///
/// Values can be set via environment variables:
/// - `TRACELINE_METRIC_FLUSH_SECS`: metric flush cadence in seconds
/// - `TRACELINE_TRACE_FLUSH_SECS`: trace flush cadence in seconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlushConfig {
    /// How often the metric flush job runs.
    pub metric_interval: Duration,

    /// How often the trace flush job runs.
    pub trace_interval: Duration,
}

impl FlushConfig {
    /// Creates a configuration from environment variables, falling back to
    /// defaults for anything unset.
    ///
    /// # Errors
    ///
    /// Returns an error if a set variable cannot be parsed.
    pub fn from_env() -> anyhow::Result<Self> {
        let metric_interval = std::env::var("TRACELINE_METRIC_FLUSH_SECS")
            .ok()
            .map(|v| v.parse::<u64>())
            .transpose()?
            .map_or(DEFAULT_METRIC_FLUSH_INTERVAL, Duration::from_secs);

        let trace_interval = std::env::var("TRACELINE_TRACE_FLUSH_SECS")
            .ok()
            .map(|v| v.parse::<u64>())
            .transpose()?
            .map_or(DEFAULT_TRACE_FLUSH_INTERVAL, Duration::from_secs);

        Ok(Self {
            metric_interval,
            trace_interval,
        })
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if either cadence is zero.
    pub fn validate(&self) -> Result<(), String> {
        if self.metric_interval.is_zero() {
            return Err("Metric flush interval must be greater than zero".to_string());
        }
        if self.trace_interval.is_zero() {
            return Err("Trace flush interval must be greater than zero".to_string());
        }
        Ok(())
    }
}

impl Default for FlushConfig {
    fn default() -> Self {
        Self {
            metric_interval: DEFAULT_METRIC_FLUSH_INTERVAL,
            trace_interval: DEFAULT_TRACE_FLUSH_INTERVAL,
        }
    }
}
