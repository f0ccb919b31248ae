//! Crash report data model.
//!
//! The upload-ready shape an uncaught exception is formatted into: a title
//! and description derived from the root cause, the full cause-chain
//! summary, and one record per captured thread stack.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One frame of a reported thread stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrashFrame {
    /// Fully qualified class or module name.
    pub class_name: String,
    /// Function or method name.
    pub function: String,
    /// Source file, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Line number, `0` when unknown.
    pub line: i64,
    /// Zero-based position of this frame within its thread.
    pub sequence: u32,
}

/// One thread's stack in a crash report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrashThread {
    /// Thread name.
    pub name: String,
    /// Thread id.
    pub id: i64,
    /// True for the thread the exception was thrown on.
    pub crashed: bool,
    /// The thread's frames, sequence-numbered from zero.
    pub frames: Vec<CrashFrame>,
}

/// An upload-ready crash report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrashReport {
    /// The root cause's exception class name.
    pub title: String,
    /// The root cause's message; empty when the exception had none.
    pub description: String,
    /// Every exception class name in the cause chain, comma-separated;
    /// empty when the thrown exception had no chain.
    pub all_exception_names: String,
    /// One record per captured thread stack.
    pub threads: Vec<CrashThread>,
    /// When the crash happened.
    pub crashed_at: DateTime<Utc>,
}

impl CrashReport {
    /// The crashing thread's record, if one was captured.
    #[must_use]
    pub fn crashed_thread(&self) -> Option<&CrashThread> {
        self.threads.iter().find(|t| t.crashed)
    }
}
