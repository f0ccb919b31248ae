//! Measurement formatters and their dispatch registry.
//!
//! Each formatter is a pure conversion from a [`MeasurementRecord`] to zero
//! or more canonical outputs. A record whose content is absent or of the
//! wrong type formats to an empty sequence - a transient unavailable
//! reading is an expected outcome, not a fault. Requesting a formatter for
//! an unregistered source type is a [`DispatchError`]: silently losing a
//! whole class of telemetry would be worse than a loud failure during
//! development.

pub mod cpu;
pub mod crash;
pub mod lifecycle;
pub mod memory;
pub mod network;
pub mod resource;

use std::collections::HashMap;

use shared::models::{
    CrashReport, DataSourceType, MeasurementRecord, Metric, ResourceLabel, Span,
};
use thiserror::Error;

pub use cpu::{AppCpuFormatter, SystemCpuFormatter};
pub use crash::CrashFormatter;
pub use lifecycle::{AppStartupFormatter, ViewLifecycleFormatter};
pub use memory::{AppMemoryFormatter, SystemMemoryFormatter};
pub use network::NetworkCallFormatter;
pub use resource::ResourceFormatter;

/// One formatted output of a measurement.
#[derive(Debug, Clone, PartialEq)]
pub enum FormattedOutput {
    /// A metric, persisted for the next metric flush.
    Metric(Metric),
    /// A resource label, persisted into the session snapshot.
    Resource(ResourceLabel),
    /// A span, routed to the trace manager.
    Span(Span),
    /// A crash report, uploaded immediately.
    Crash(CrashReport),
}

/// A pure conversion from one measurement kind to canonical outputs.
pub trait Formatter: Send + Sync {
    /// Formats a record.
    ///
    /// Returns an empty sequence for absent or wrong-typed content.
    fn format(&self, record: &MeasurementRecord) -> Vec<FormattedOutput>;
}

/// Error raised when no formatter is registered for a source type.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    /// The record's source type has no registered formatter.
    #[error("No formatter registered for data source: {0}")]
    Unregistered(DataSourceType),
}

/// Lookup table from source type to formatter, built at startup.
///
/// Exactly one formatter per registered source type.
#[derive(Default)]
pub struct FormatterRegistry {
    formatters: HashMap<DataSourceType, Box<dyn Formatter>>,
}

impl FormatterRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with every built-in formatter registered.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(DataSourceType::SystemCpu, Box::new(SystemCpuFormatter));
        registry.register(DataSourceType::AppCpu, Box::new(AppCpuFormatter));
        registry.register(DataSourceType::SystemMemory, Box::new(SystemMemoryFormatter));
        registry.register(DataSourceType::AppMemory, Box::new(AppMemoryFormatter));
        registry.register(DataSourceType::NetworkCall, Box::new(NetworkCallFormatter));
        registry.register(DataSourceType::Crash, Box::new(CrashFormatter));
        registry.register(
            DataSourceType::ViewLifecycle,
            Box::new(ViewLifecycleFormatter),
        );
        registry.register(DataSourceType::AppStartup, Box::new(AppStartupFormatter));
        for (source, key) in ResourceFormatter::CANONICAL_KEYS {
            registry.register(source, Box::new(ResourceFormatter::new(key)));
        }
        registry
    }

    /// Registers a formatter, replacing any previous one for the source.
    pub fn register(&mut self, source: DataSourceType, formatter: Box<dyn Formatter>) {
        self.formatters.insert(source, formatter);
    }

    /// Looks up the formatter for a source type.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Unregistered`] when no formatter is
    /// registered for the source.
    pub fn get(&self, source: DataSourceType) -> Result<&dyn Formatter, DispatchError> {
        self.formatters
            .get(&source)
            .map(|formatter| &**formatter)
            .ok_or(DispatchError::Unregistered(source))
    }

    /// Dispatches a record to its formatter.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Unregistered`] when the record's source has
    /// no formatter.
    pub fn format(
        &self,
        record: &MeasurementRecord,
    ) -> Result<Vec<FormattedOutput>, DispatchError> {
        Ok(self.get(record.source)?.format(record))
    }
}
