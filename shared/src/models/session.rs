//! Session data model.
//!
//! One session is active at a time, process-wide. Traces, metric entities,
//! and resource entities all require an active session to be constructed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single SDK session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Time-ordered session identifier.
    pub id: String,

    /// When the session started.
    pub start_time: DateTime<Utc>,

    /// When the session ended; `None` while the session is active.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
}

impl Session {
    /// Creates a session starting now with the given identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            start_time: Utc::now(),
            end_time: None,
        }
    }

    /// True while the session has not been closed.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.end_time.is_none()
    }

    /// Closes the session at the current instant.
    pub fn close(&mut self) {
        self.end_time = Some(Utc::now());
    }
}
