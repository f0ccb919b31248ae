//! Upload client boundary.
//!
//! The core batches telemetry; HTTP transport, retries, and backoff belong
//! to the collaborator behind [`Uploader`]. Batches carry the owning
//! session's resource snapshot so the backend can attribute them without a
//! second lookup.

use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared::models::{CrashReport, Metric, ResourceLabel, Trace};
use thiserror::Error;
use tracing::info;

/// Errors an upload attempt can signal.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The transport failed; the batch should be retried next cycle.
    #[error("Upload transport error: {0}")]
    Transport(String),
}

/// A batch of merged metrics plus the session resource snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricBatch {
    /// The session the metrics were captured in.
    pub session_id: String,
    /// Merged metrics, one per descriptor name.
    pub metrics: Vec<Metric>,
    /// The session's resource snapshot.
    pub resources: Vec<ResourceLabel>,
}

/// A batch of finished traces plus the session resource snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceBatch {
    /// The session the traces belong to.
    pub session_id: String,
    /// The finished traces.
    pub traces: Vec<Trace>,
    /// The session's resource snapshot.
    pub resources: Vec<ResourceLabel>,
}

/// The upload client the flush jobs hand batches to.
#[async_trait]
pub trait Uploader: Send + Sync {
    /// Sends a metric batch.
    ///
    /// # Errors
    ///
    /// Returns an error when the batch could not be delivered; the caller
    /// keeps the records for the next cycle.
    async fn send_metrics(&self, batch: MetricBatch) -> Result<(), UploadError>;

    /// Sends a trace batch.
    ///
    /// # Errors
    ///
    /// Returns an error when the batch could not be delivered; the caller
    /// keeps the records for the next cycle.
    async fn send_traces(&self, batch: TraceBatch) -> Result<(), UploadError>;

    /// Sends a crash report immediately.
    ///
    /// # Errors
    ///
    /// Returns an error when the report could not be delivered.
    async fn send_crash_report(&self, report: CrashReport) -> Result<(), UploadError>;
}

/// An uploader that logs payload summaries instead of sending them.
///
/// Used by the demo binary and anywhere a backend is not wired up.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingUploader;

#[async_trait]
impl Uploader for LoggingUploader {
    async fn send_metrics(&self, batch: MetricBatch) -> Result<(), UploadError> {
        info!(
            session_id = %batch.session_id,
            metrics = batch.metrics.len(),
            points = batch.metrics.iter().map(Metric::point_count).sum::<usize>(),
            resources = batch.resources.len(),
            "Would upload metric batch"
        );
        tracing::debug!(
            payload = %serde_json::to_string(&batch).unwrap_or_default(),
            "Metric batch payload"
        );
        Ok(())
    }

    async fn send_traces(&self, batch: TraceBatch) -> Result<(), UploadError> {
        info!(
            session_id = %batch.session_id,
            traces = batch.traces.len(),
            spans = batch.traces.iter().map(Trace::span_count).sum::<usize>(),
            "Would upload trace batch"
        );
        tracing::debug!(
            payload = %serde_json::to_string(&batch).unwrap_or_default(),
            "Trace batch payload"
        );
        Ok(())
    }

    async fn send_crash_report(&self, report: CrashReport) -> Result<(), UploadError> {
        info!(
            title = %report.title,
            threads = report.threads.len(),
            "Would upload crash report"
        );
        Ok(())
    }
}

/// An uploader that records everything it receives; test double.
#[derive(Debug, Default)]
pub struct RecordingUploader {
    /// Received metric batches.
    pub metric_batches: Mutex<Vec<MetricBatch>>,
    /// Received trace batches.
    pub trace_batches: Mutex<Vec<TraceBatch>>,
    /// Received crash reports.
    pub crash_reports: Mutex<Vec<CrashReport>>,
    /// When true, every send fails with a transport error.
    pub fail_sends: std::sync::atomic::AtomicBool,
}

impl RecordingUploader {
    /// Creates an empty recording uploader.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent sends fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.fail_sends
            .store(failing, std::sync::atomic::Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), UploadError> {
        if self.fail_sends.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(UploadError::Transport("simulated failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Uploader for RecordingUploader {
    async fn send_metrics(&self, batch: MetricBatch) -> Result<(), UploadError> {
        self.check()?;
        self.metric_batches
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(batch);
        Ok(())
    }

    async fn send_traces(&self, batch: TraceBatch) -> Result<(), UploadError> {
        self.check()?;
        self.trace_batches
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(batch);
        Ok(())
    }

    async fn send_crash_report(&self, report: CrashReport) -> Result<(), UploadError> {
        self.check()?;
        self.crash_reports
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(report);
        Ok(())
    }
}
