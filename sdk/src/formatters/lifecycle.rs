//! Application lifecycle formatters.
//!
//! View lifecycle events become attribute-free INTERNAL spans - the view
//! spans `last_active_view_span` picks from. App startup durations become a
//! single-point metric.

use chrono::DateTime;
use shared::models::{
    MeasurementRecord, MeasurementValue, Metric, MetricType, Point, PointValue, Span, SpanKind,
    TimeSeries,
};

use super::{FormattedOutput, Formatter};

/// Descriptor name of the app startup metric.
pub const APP_STARTUP_METRIC: &str = "app.startup.ms";

/// Formats a view lifecycle event into a view span.
pub struct ViewLifecycleFormatter;

impl Formatter for ViewLifecycleFormatter {
    fn format(&self, record: &MeasurementRecord) -> Vec<FormattedOutput> {
        let MeasurementValue::View(event) = &record.value else {
            return Vec::new();
        };

        let (Some(start_time), Some(end_time)) = (
            DateTime::from_timestamp_millis(event.start_time_ms),
            DateTime::from_timestamp_millis(event.end_time_ms),
        ) else {
            return Vec::new();
        };

        let mut span = Span::new("", &event.span_id, &event.name)
            .with_kind(SpanKind::Internal)
            .with_start_time(start_time)
            .with_end_time(end_time);

        if let Some(parent) = &event.parent_span_id {
            span = span.with_parent(parent);
        }

        vec![FormattedOutput::Span(span)]
    }
}

/// Formats the app startup duration into a metric.
pub struct AppStartupFormatter;

impl Formatter for AppStartupFormatter {
    fn format(&self, record: &MeasurementRecord) -> Vec<FormattedOutput> {
        let Some(millis) = record.value.as_integer() else {
            return Vec::new();
        };

        let metric = Metric::new(APP_STARTUP_METRIC, MetricType::GaugeInt64)
            .with_description("Time from process start to first usable frame")
            .with_unit("ms")
            .with_time_series(
                TimeSeries::new().with_point(Point::now(PointValue::Int64(millis))),
            );

        vec![FormattedOutput::Metric(metric)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{DataSourceType, ViewEvent};

    #[test]
    fn test_view_event_becomes_view_span() {
        let record = MeasurementRecord::new(
            DataSourceType::ViewLifecycle,
            MeasurementValue::View(ViewEvent {
                name: "CheckoutScreen".to_string(),
                start_time_ms: 1_600_000_000_000,
                end_time_ms: 1_600_000_004_000,
                span_id: "aa00bb11cc22dd33".to_string(),
                parent_span_id: None,
            }),
        );

        let outputs = ViewLifecycleFormatter.format(&record);
        assert_eq!(outputs.len(), 1);

        let FormattedOutput::Span(span) = &outputs[0] else {
            panic!("expected a span");
        };
        assert_eq!(span.name, "CheckoutScreen");
        assert_eq!(span.kind, SpanKind::Internal);
        // View spans must stay attribute-free so they are not mistaken for
        // network spans.
        assert!(!span.is_network());
        assert_eq!(span.duration().num_milliseconds(), 4000);
    }

    #[test]
    fn test_app_startup_metric() {
        let record = MeasurementRecord::integer(DataSourceType::AppStartup, 1250);

        let outputs = AppStartupFormatter.format(&record);
        let FormattedOutput::Metric(metric) = &outputs[0] else {
            panic!("expected a metric");
        };
        assert_eq!(metric.descriptor_name, APP_STARTUP_METRIC);
        assert_eq!(metric.unit, "ms");
        assert_eq!(
            metric.time_series[0].points[0].value,
            PointValue::Int64(1250)
        );
    }

    #[test]
    fn test_null_and_wrong_type_format_to_nothing() {
        assert!(ViewLifecycleFormatter
            .format(&MeasurementRecord::null(DataSourceType::ViewLifecycle))
            .is_empty());
        assert!(AppStartupFormatter
            .format(&MeasurementRecord::double(DataSourceType::AppStartup, 1.0))
            .is_empty());
    }
}
