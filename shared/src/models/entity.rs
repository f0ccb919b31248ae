//! Persisted entity wrappers.
//!
//! Entities associate a metric, trace, or resource label with a generated
//! record id, the owning session's id, and a capture timestamp. They are
//! what the persistent store holds between capture and upload; the flush
//! jobs read unsent entities and delete them by record id after a
//! successful send.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids;
use crate::models::{Metric, ResourceLabel, Session, Trace};

/// A metric awaiting upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricEntity {
    /// Generated record identifier.
    pub record_id: String,
    /// The session the metric was captured in.
    pub session_id: String,
    /// When the metric was captured.
    pub captured_at: DateTime<Utc>,
    /// The metric payload.
    pub metric: Metric,
}

impl MetricEntity {
    /// Wraps a metric for persistence under the given session.
    #[must_use]
    pub fn new(session: &Session, metric: Metric) -> Self {
        Self {
            record_id: ids::new_span_id(),
            session_id: session.id.clone(),
            captured_at: Utc::now(),
            metric,
        }
    }
}

/// A finalized trace awaiting upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntity {
    /// Generated record identifier.
    pub record_id: String,
    /// The session the trace belongs to.
    pub session_id: String,
    /// When the trace was detached from the active slot.
    pub captured_at: DateTime<Utc>,
    /// The trace payload.
    pub trace: Trace,
}

impl TraceEntity {
    /// Wraps a detached trace for persistence.
    ///
    /// The session id comes from the trace itself, which was bound to the
    /// session active at trace start.
    #[must_use]
    pub fn from_trace(trace: Trace) -> Self {
        Self {
            record_id: ids::new_span_id(),
            session_id: trace.session_id.clone(),
            captured_at: Utc::now(),
            trace,
        }
    }
}

/// A resource label awaiting upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceEntity {
    /// Generated record identifier.
    pub record_id: String,
    /// The session the fact was captured in.
    pub session_id: String,
    /// When the fact was captured.
    pub captured_at: DateTime<Utc>,
    /// The label payload.
    pub label: ResourceLabel,
}

impl ResourceEntity {
    /// Wraps a resource label for persistence under the given session.
    #[must_use]
    pub fn new(session: &Session, label: ResourceLabel) -> Self {
        Self {
            record_id: ids::new_span_id(),
            session_id: session.id.clone(),
            captured_at: Utc::now(),
            label,
        }
    }
}
