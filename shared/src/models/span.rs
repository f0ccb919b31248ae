//! Span and trace data models.
//!
//! A [`Trace`] is the in-memory representation of one user-visible episode:
//! an ordered collection of [`Span`]s contributed concurrently by multiple
//! instrumentation sources, bound to the session that was active when the
//! trace began.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use validator::Validate;

use crate::ids;

/// Kind of span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SpanKind {
    /// The span represents a client making a request.
    Client,
    /// The span represents a server handling a request.
    Server,
    /// An internal operation (view/activity spans use this).
    Internal,
    /// No kind was recorded.
    #[default]
    Unspecified,
}

impl std::fmt::Display for SpanKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Client => write!(f, "client"),
            Self::Server => write!(f, "server"),
            Self::Internal => write!(f, "internal"),
            Self::Unspecified => write!(f, "unspecified"),
        }
    }
}

/// A span representing one timed operation inside a trace.
///
/// Spans are value objects; once constructed they are only rewritten in one
/// place, when [`Trace::add_span`] re-binds the span to the trace it lands
/// in. Network spans are distinguished from view spans purely by their
/// attributes: HTTP instrumentation populates `attributes`, view
/// instrumentation leaves it empty.
///
/// # Example
///
/// ```
/// use shared::models::{Span, SpanKind};
///
/// let span = Span::new("", "0011223344556677", "MainScreen")
///     .with_kind(SpanKind::Internal);
///
/// assert!(!span.is_network());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Span {
    /// Identifier of the trace this span belongs to.
    ///
    /// May be empty at construction; the active trace rewrites it on insert.
    pub trace_id: String,

    /// Unique identifier for this span.
    #[validate(length(min = 1, message = "Span ID cannot be empty"))]
    pub span_id: String,

    /// The parent span ID (None for root spans).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_span_id: Option<String>,

    /// The name/operation of this span.
    #[validate(length(min = 1, message = "Span name cannot be empty"))]
    pub name: String,

    /// The kind of span.
    #[serde(default)]
    pub kind: SpanKind,

    /// Timestamp when the span started.
    pub start_time: DateTime<Utc>,

    /// Timestamp when the span ended.
    pub end_time: DateTime<Utc>,

    /// String attributes; non-empty marks the span as network-style.
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

/// Errors that can occur during span validation.
#[derive(Debug, Error)]
pub enum SpanValidationError {
    /// The span ID is empty.
    #[error("Span ID cannot be empty")]
    EmptySpanId,

    /// The span name is empty.
    #[error("Span name cannot be empty")]
    EmptyName,

    /// The end time is before the start time.
    #[error("End time cannot be before start time")]
    InvalidTimeRange,

    /// Validation failed with details.
    #[error("Validation failed: {0}")]
    ValidationError(#[from] validator::ValidationErrors),
}

impl Span {
    /// Creates a new span with the current time as both start and end.
    #[must_use]
    pub fn new(
        trace_id: impl Into<String>,
        span_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            trace_id: trace_id.into(),
            span_id: span_id.into(),
            parent_span_id: None,
            name: name.into(),
            kind: SpanKind::default(),
            start_time: now,
            end_time: now,
            attributes: HashMap::new(),
        }
    }

    /// Sets the parent span ID.
    #[must_use]
    pub fn with_parent(mut self, parent_span_id: impl Into<String>) -> Self {
        self.parent_span_id = Some(parent_span_id.into());
        self
    }

    /// Sets the span kind.
    #[must_use]
    pub fn with_kind(mut self, kind: SpanKind) -> Self {
        self.kind = kind;
        self
    }

    /// Sets the start time.
    #[must_use]
    pub fn with_start_time(mut self, start_time: DateTime<Utc>) -> Self {
        self.start_time = start_time;
        self
    }

    /// Sets the end time.
    #[must_use]
    pub fn with_end_time(mut self, end_time: DateTime<Utc>) -> Self {
        self.end_time = end_time;
        self
    }

    /// Adds an attribute to the span.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Returns the duration of the span.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.end_time - self.start_time
    }

    /// True when this span was produced by network instrumentation.
    ///
    /// Network spans are exactly the spans carrying attributes (HTTP
    /// labels); view/activity spans carry none.
    #[must_use]
    pub fn is_network(&self) -> bool {
        !self.attributes.is_empty()
    }

    /// Returns true if this is a root span (no parent).
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent_span_id.is_none()
    }

    /// Validates the span.
    ///
    /// The trace id is deliberately not checked: spans are routinely built
    /// before any trace exists and re-bound on insert.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The span ID is empty
    /// - The name is empty
    /// - The end time is before the start time
    pub fn validate_span(&self) -> Result<(), SpanValidationError> {
        if self.span_id.is_empty() {
            return Err(SpanValidationError::EmptySpanId);
        }
        if self.name.is_empty() {
            return Err(SpanValidationError::EmptyName);
        }
        if self.end_time < self.start_time {
            return Err(SpanValidationError::InvalidTimeRange);
        }
        self.validate()?;
        Ok(())
    }
}

/// A trace: the spans collected between one start/stop boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    /// The trace ID.
    pub trace_id: String,

    /// The session that was active when the trace began.
    pub session_id: String,

    /// All spans in this trace, in arrival order.
    ///
    /// Arrival order is not wall-clock order: a producer that finishes late
    /// appends after one that started later but finished earlier.
    pub spans: Vec<Span>,
}

impl Trace {
    /// Creates an empty trace with a fresh trace id, bound to a session.
    #[must_use]
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            trace_id: ids::new_trace_id(),
            session_id: session_id.into(),
            spans: Vec::new(),
        }
    }

    /// Creates a trace with an explicit trace id.
    #[must_use]
    pub fn with_trace_id(trace_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            trace_id: trace_id.into(),
            session_id: session_id.into(),
            spans: Vec::new(),
        }
    }

    /// Appends a span, rewriting its trace id to this trace's.
    ///
    /// A span constructed before any trace existed is attributed to
    /// whichever trace is active at insertion time, so every span in
    /// `spans` carries this trace's id.
    pub fn add_span(&mut self, mut span: Span) {
        span.trace_id = self.trace_id.clone();
        self.spans.push(span);
    }

    /// Returns the number of spans in this trace.
    #[must_use]
    pub fn span_count(&self) -> usize {
        self.spans.len()
    }

    /// Returns true when the trace holds no spans.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// The most recently started non-network span, if any.
    ///
    /// This answers "what screen was active when this event happened"
    /// without a separate UI-state tracker. Truth table:
    ///
    /// - no spans: `None`
    /// - one network span: `None`
    /// - one view span: that span, without comparison
    /// - several spans: the candidate starts at the first span and is
    ///   replaced by any later-starting non-network span; a candidate that
    ///   is still network-style after the scan yields `None`
    #[must_use]
    pub fn last_active_view_span(&self) -> Option<&Span> {
        let first = self.spans.first()?;

        if self.spans.len() == 1 {
            return if first.is_network() { None } else { Some(first) };
        }

        let mut candidate = first;
        for span in &self.spans[1..] {
            if !span.is_network() && span.start_time > candidate.start_time {
                candidate = span;
            }
        }

        if candidate.is_network() {
            None
        } else {
            Some(candidate)
        }
    }
}
