//! Traceline Shared Library
//!
//! This crate contains the shared types, models, and utilities used across
//! the Traceline telemetry SDK.
//!
//! # Modules
//!
//! - [`models`] - Data models for measurements, spans, traces, metrics,
//!   resource labels, sessions, and crash reports
//! - [`batching`] - Merging of same-named metrics into upload batches
//! - [`storage`] - Storage traits and in-memory implementations
//! - [`ids`] - Span and trace identifier generation
//! - [`config`] - Collection and flush configuration
//!
//! # Example
//!
//! ```
//! use shared::models::{Span, SpanKind, Trace};
//!
//! let mut trace = Trace::new("session-1");
//! trace.add_span(Span::new("", "0011223344556677", "MainScreen").with_kind(SpanKind::Internal));
//!
//! assert_eq!(trace.spans[0].trace_id, trace.trace_id);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod batching;
pub mod config;
pub mod ids;
pub mod models;
pub mod storage;

/// Re-export common dependencies for convenience.
pub use chrono;
pub use serde;
pub use serde_json;
pub use validator;
