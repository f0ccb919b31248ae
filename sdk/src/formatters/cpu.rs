//! CPU measurement formatters.

use shared::models::{
    LabelKey, MeasurementRecord, MeasurementValue, Metric, MetricType, Point, PointValue,
    TimeSeries,
};

use super::{FormattedOutput, Formatter};

/// Descriptor name of the system CPU metric.
pub const SYSTEM_CPU_METRIC: &str = "system.cpu.pct";
/// Descriptor name of the application CPU metric.
pub const APP_CPU_METRIC: &str = "app.cpu.pct";
/// Label key distinguishing CPU states on the system metric.
pub const CPU_STATE_LABEL: &str = "cpu.state";

/// Formats a per-state system CPU sample into one metric with one time
/// series per state.
pub struct SystemCpuFormatter;

impl Formatter for SystemCpuFormatter {
    fn format(&self, record: &MeasurementRecord) -> Vec<FormattedOutput> {
        let MeasurementValue::CpuSample(sample) = &record.value else {
            return Vec::new();
        };

        let mut metric = Metric::new(SYSTEM_CPU_METRIC, MetricType::GaugeDouble)
            .with_description("System CPU usage per state")
            .with_unit("%")
            .with_label_key(LabelKey::new(CPU_STATE_LABEL, "CPU state"));

        for (state, value) in sample.states() {
            metric = metric.with_time_series(
                TimeSeries::new()
                    .with_label_value(state)
                    .with_point(Point::now(PointValue::Double(value))),
            );
        }

        vec![FormattedOutput::Metric(metric)]
    }
}

/// Formats the application's CPU percentage into a single-series metric.
pub struct AppCpuFormatter;

impl Formatter for AppCpuFormatter {
    fn format(&self, record: &MeasurementRecord) -> Vec<FormattedOutput> {
        let Some(pct) = record.value.as_double() else {
            return Vec::new();
        };

        let metric = Metric::new(APP_CPU_METRIC, MetricType::GaugeDouble)
            .with_description("Application CPU usage")
            .with_unit("%")
            .with_time_series(
                TimeSeries::new().with_point(Point::now(PointValue::Double(pct))),
            );

        vec![FormattedOutput::Metric(metric)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{DataSourceType, SystemCpuSample};

    fn sample() -> SystemCpuSample {
        SystemCpuSample {
            user: 42.0,
            system: 13.0,
            nice: 0.5,
            idle: 40.0,
            iowait: 2.5,
            irq: 1.0,
            softirq: 1.0,
        }
    }

    #[test]
    fn test_system_cpu_one_series_per_state() {
        let record = MeasurementRecord::new(
            DataSourceType::SystemCpu,
            MeasurementValue::CpuSample(sample()),
        );

        let outputs = SystemCpuFormatter.format(&record);
        assert_eq!(outputs.len(), 1);

        let FormattedOutput::Metric(metric) = &outputs[0] else {
            panic!("expected a metric");
        };
        assert_eq!(metric.descriptor_name, SYSTEM_CPU_METRIC);
        assert_eq!(metric.metric_type, MetricType::GaugeDouble);
        assert_eq!(metric.time_series.len(), 7);
        assert_eq!(metric.label_keys.len(), 1);
        assert_eq!(metric.label_keys[0].key, CPU_STATE_LABEL);
        assert_eq!(metric.time_series[0].label_values, vec!["user"]);
        assert_eq!(
            metric.time_series[0].points[0].value,
            PointValue::Double(42.0)
        );
    }

    #[test]
    fn test_system_cpu_null_formats_to_nothing() {
        let record = MeasurementRecord::null(DataSourceType::SystemCpu);
        assert!(SystemCpuFormatter.format(&record).is_empty());
    }

    #[test]
    fn test_system_cpu_wrong_type_formats_to_nothing() {
        let record = MeasurementRecord::double(DataSourceType::SystemCpu, 50.0);
        assert!(SystemCpuFormatter.format(&record).is_empty());
    }

    #[test]
    fn test_app_cpu_single_point() {
        let record = MeasurementRecord::double(DataSourceType::AppCpu, 17.5);

        let outputs = AppCpuFormatter.format(&record);
        let FormattedOutput::Metric(metric) = &outputs[0] else {
            panic!("expected a metric");
        };
        assert_eq!(metric.descriptor_name, APP_CPU_METRIC);
        assert_eq!(metric.point_count(), 1);
        assert!(metric.label_keys.is_empty());
    }

    #[test]
    fn test_app_cpu_integer_content_formats_to_nothing() {
        // An integer where a double is expected is wrong-typed content.
        let record = MeasurementRecord::integer(DataSourceType::AppCpu, 17);
        assert!(AppCpuFormatter.format(&record).is_empty());
    }
}
