//! Memory measurement formatters.

use shared::models::{
    MeasurementRecord, Metric, MetricType, Point, PointValue, TimeSeries,
};

use super::{FormattedOutput, Formatter};

/// Descriptor name of the system memory metric.
pub const SYSTEM_MEMORY_METRIC: &str = "system.memory.bytes";
/// Descriptor name of the application memory metric.
pub const APP_MEMORY_METRIC: &str = "app.memory.bytes";

fn gauge_bytes(name: &str, description: &str, bytes: i64) -> FormattedOutput {
    FormattedOutput::Metric(
        Metric::new(name, MetricType::GaugeInt64)
            .with_description(description)
            .with_unit("bytes")
            .with_time_series(TimeSeries::new().with_point(Point::now(PointValue::Int64(bytes)))),
    )
}

/// Formats total system memory in use.
pub struct SystemMemoryFormatter;

impl Formatter for SystemMemoryFormatter {
    fn format(&self, record: &MeasurementRecord) -> Vec<FormattedOutput> {
        match record.value.as_integer() {
            Some(bytes) => vec![gauge_bytes(
                SYSTEM_MEMORY_METRIC,
                "System memory in use",
                bytes,
            )],
            None => Vec::new(),
        }
    }
}

/// Formats the application's memory footprint.
pub struct AppMemoryFormatter;

impl Formatter for AppMemoryFormatter {
    fn format(&self, record: &MeasurementRecord) -> Vec<FormattedOutput> {
        match record.value.as_integer() {
            Some(bytes) => vec![gauge_bytes(
                APP_MEMORY_METRIC,
                "Application memory in use",
                bytes,
            )],
            None => Vec::new(),
        }
    }
}
