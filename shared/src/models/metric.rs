//! Metric data model.
//!
//! A [`Metric`] is the canonical time-series representation formatters
//! produce and the batching layer merges: a descriptor (name, description,
//! unit, type, label keys) plus one [`TimeSeries`] per distinct label-value
//! combination.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::Validate;

/// Type of metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MetricType {
    /// A point-in-time integer observation (e.g. memory bytes).
    #[default]
    GaugeInt64,
    /// A point-in-time floating-point observation (e.g. CPU percent).
    GaugeDouble,
}

impl std::fmt::Display for MetricType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GaugeInt64 => write!(f, "gauge_int64"),
            Self::GaugeDouble => write!(f, "gauge_double"),
        }
    }
}

/// The value of a single point, matching the metric's declared type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PointValue {
    /// An integer observation.
    Int64(i64),
    /// A floating-point observation.
    Double(f64),
}

/// A single observation at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// When the observation was taken.
    pub timestamp: DateTime<Utc>,
    /// The observed value.
    pub value: PointValue,
}

impl Point {
    /// Creates a point with an explicit timestamp.
    #[must_use]
    pub fn new(timestamp: DateTime<Utc>, value: PointValue) -> Self {
        Self { timestamp, value }
    }

    /// Creates a point stamped with the current time.
    #[must_use]
    pub fn now(value: PointValue) -> Self {
        Self::new(Utc::now(), value)
    }
}

/// One time series of a metric.
///
/// `label_values` is position-correlated with the metric's `label_keys`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TimeSeries {
    /// Label values, one per descriptor label key, in key order.
    #[serde(default)]
    pub label_values: Vec<String>,
    /// The observations of this series.
    #[serde(default)]
    pub points: Vec<Point>,
}

impl TimeSeries {
    /// Creates an empty time series.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a label value.
    #[must_use]
    pub fn with_label_value(mut self, value: impl Into<String>) -> Self {
        self.label_values.push(value.into());
        self
    }

    /// Appends a point.
    #[must_use]
    pub fn with_point(mut self, point: Point) -> Self {
        self.points.push(point);
        self
    }
}

/// A descriptor label key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelKey {
    /// The key string (e.g. `cpu.state`).
    pub key: String,
    /// Human-readable description of the key.
    #[serde(default)]
    pub description: String,
}

impl LabelKey {
    /// Creates a new label key.
    #[must_use]
    pub fn new(key: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            description: description.into(),
        }
    }
}

/// A metric: descriptor plus time series.
///
/// # Example
///
/// ```
/// use shared::models::{Metric, MetricType, Point, PointValue, TimeSeries};
///
/// let metric = Metric::new("app.memory.bytes", MetricType::GaugeInt64)
///     .with_unit("bytes")
///     .with_time_series(TimeSeries::new().with_point(Point::now(PointValue::Int64(1024))));
///
/// assert!(!metric.is_empty());
/// assert!(metric.validate_metric().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default, Validate)]
pub struct Metric {
    /// Descriptor name (e.g. `system.cpu.pct`); empty marks the sentinel.
    ///
    /// The length rule only runs inside [`Metric::validate_metric`], so the
    /// sentinel remains constructible.
    #[validate(length(min = 1, message = "Metric descriptor name cannot be empty"))]
    pub descriptor_name: String,

    /// Human-readable description.
    #[serde(default)]
    pub description: String,

    /// Unit of the observations (e.g. `bytes`, `%`, `ms`).
    #[serde(default)]
    pub unit: String,

    /// The metric type.
    #[serde(default)]
    pub metric_type: MetricType,

    /// Descriptor label keys; order-insensitive, unique by key string.
    #[serde(default)]
    pub label_keys: Vec<LabelKey>,

    /// The metric's time series.
    #[serde(default)]
    pub time_series: Vec<TimeSeries>,
}

/// Errors that can occur during metric validation.
#[derive(Debug, Error)]
pub enum MetricValidationError {
    /// The descriptor name is empty.
    #[error("Metric descriptor name cannot be empty")]
    EmptyName,

    /// A time series carries more label values than the descriptor has keys.
    #[error("Time series has {values} label values but descriptor has {keys} keys")]
    LabelArityMismatch {
        /// Label values on the offending series.
        values: usize,
        /// Label keys on the descriptor.
        keys: usize,
    },

    /// Validation failed with details.
    #[error("Validation failed: {0}")]
    ValidationError(#[from] validator::ValidationErrors),
}

impl Metric {
    /// Creates a new metric with the given descriptor name and type.
    #[must_use]
    pub fn new(descriptor_name: impl Into<String>, metric_type: MetricType) -> Self {
        Self {
            descriptor_name: descriptor_name.into(),
            metric_type,
            ..Self::default()
        }
    }

    /// The canonical empty metric: the sentinel for "no data".
    ///
    /// Empty metrics are never persisted or uploaded; batching returns one
    /// for a group with no matching input and callers filter it out.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// True for the empty sentinel.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptor_name.is_empty()
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the unit.
    #[must_use]
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    /// Appends a label key.
    #[must_use]
    pub fn with_label_key(mut self, key: LabelKey) -> Self {
        self.label_keys.push(key);
        self
    }

    /// Appends a time series.
    #[must_use]
    pub fn with_time_series(mut self, series: TimeSeries) -> Self {
        self.time_series.push(series);
        self
    }

    /// Total number of points across all series.
    #[must_use]
    pub fn point_count(&self) -> usize {
        self.time_series.iter().map(|s| s.points.len()).sum()
    }

    /// Validates the metric before persistence.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The descriptor name is empty (the sentinel must not be persisted)
    /// - Any series carries more label values than the descriptor has keys
    pub fn validate_metric(&self) -> Result<(), MetricValidationError> {
        if self.descriptor_name.is_empty() {
            return Err(MetricValidationError::EmptyName);
        }

        for series in &self.time_series {
            if series.label_values.len() > self.label_keys.len() {
                return Err(MetricValidationError::LabelArityMismatch {
                    values: series.label_values.len(),
                    keys: self.label_keys.len(),
                });
            }
        }

        self.validate()?;
        Ok(())
    }
}
