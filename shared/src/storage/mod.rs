//! Storage traits and implementations.
//!
//! This module marks the boundary to the durable store the SDK writes
//! captured telemetry into and the flush jobs read from. The traits allow
//! different backends; the `InMemory*` implementations serve development
//! and testing. Every store call can fail, and callers must not assume
//! synchronous consistency with a concurrently running flush.

pub mod metric_store;
pub mod resource_store;
pub mod trace_store;

pub use metric_store::{InMemoryMetricStore, MetricStore, MetricStoreError};
pub use resource_store::{InMemoryResourceStore, ResourceStore, ResourceStoreError};
pub use trace_store::{InMemoryTraceStore, TraceStore, TraceStoreError};
