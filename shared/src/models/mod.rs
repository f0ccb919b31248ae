//! Data models for the Traceline telemetry core.
//!
//! This module contains the core data structures for measurements, spans,
//! traces, metrics, resource labels, sessions, crash reports, and the
//! persisted entity wrappers.

pub mod crash;
pub mod entity;
pub mod measurement;
pub mod metric;
pub mod resource;
pub mod session;
pub mod span;

pub use crash::{CrashFrame, CrashReport, CrashThread};
pub use entity::{MetricEntity, ResourceEntity, TraceEntity};
pub use measurement::{
    CrashData, DataSourceType, ExceptionData, MeasurementRecord, MeasurementValue, NetworkCallData,
    StackFrame, SystemCpuSample, ThreadSnapshot, ViewEvent,
};
pub use metric::{
    LabelKey, Metric, MetricType, MetricValidationError, Point, PointValue, TimeSeries,
};
pub use resource::ResourceLabel;
pub use session::Session;
pub use span::{Span, SpanKind, SpanValidationError, Trace};
