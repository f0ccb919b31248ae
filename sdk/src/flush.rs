//! Periodic flush jobs.
//!
//! Two independent jobs read unsent records from the store, batch them,
//! and hand them to the upload client: one for metrics (running them
//! through the batching reducer first) and one for traces. Records are
//! deleted only after a successful send; on failure they stay for the
//! next cycle.

use std::sync::Arc;

use shared::batching;
use shared::models::ResourceLabel;
use shared::storage::{
    MetricStore, MetricStoreError, ResourceStore, ResourceStoreError, TraceStore, TraceStoreError,
};
use thiserror::Error;
use tracing::debug;

use crate::uploader::{MetricBatch, TraceBatch, UploadError, Uploader};

/// Errors a flush cycle can fail with.
#[derive(Debug, Error)]
pub enum FlushError {
    /// Reading or deleting metric records failed.
    #[error(transparent)]
    MetricStore(#[from] MetricStoreError),

    /// Reading or deleting trace records failed.
    #[error(transparent)]
    TraceStore(#[from] TraceStoreError),

    /// Reading the resource snapshot failed.
    #[error(transparent)]
    ResourceStore(#[from] ResourceStoreError),

    /// The upload client rejected the batch; records were kept.
    #[error(transparent)]
    Upload(#[from] UploadError),
}

fn resource_snapshot(
    store: &dyn ResourceStore,
    session_id: &str,
) -> Result<Vec<ResourceLabel>, ResourceStoreError> {
    Ok(store
        .for_session(session_id)?
        .into_iter()
        .map(|entity| entity.label)
        .collect())
}

/// The metric flush job.
pub struct MetricFlusher {
    metrics: Arc<dyn MetricStore>,
    resources: Arc<dyn ResourceStore>,
    uploader: Arc<dyn Uploader>,
}

impl MetricFlusher {
    /// Creates a flusher over the given stores and upload client.
    #[must_use]
    pub fn new(
        metrics: Arc<dyn MetricStore>,
        resources: Arc<dyn ResourceStore>,
        uploader: Arc<dyn Uploader>,
    ) -> Self {
        Self {
            metrics,
            resources,
            uploader,
        }
    }

    /// Runs one flush cycle.
    ///
    /// Returns the number of records flushed; zero when there was nothing
    /// to send. Batches are keyed by session: records from an earlier
    /// session flush in their own batch.
    ///
    /// # Errors
    ///
    /// Returns an error when the store fails or the upload is rejected; in
    /// both cases the unsent records remain stored.
    pub async fn flush(&self) -> Result<usize, FlushError> {
        let entities = self.metrics.unsent()?;
        if entities.is_empty() {
            return Ok(0);
        }

        let mut session_ids: Vec<String> = Vec::new();
        for entity in &entities {
            if !session_ids.contains(&entity.session_id) {
                session_ids.push(entity.session_id.clone());
            }
        }

        let mut flushed = 0;
        for session_id in session_ids {
            let (records, record_ids): (Vec<_>, Vec<_>) = entities
                .iter()
                .filter(|e| e.session_id == session_id)
                .map(|e| (e.metric.clone(), e.record_id.clone()))
                .unzip();

            let batch = MetricBatch {
                metrics: batching::batch_metrics(&records),
                resources: resource_snapshot(self.resources.as_ref(), &session_id)?,
                session_id,
            };

            debug!(
                metrics = batch.metrics.len(),
                records = record_ids.len(),
                "Flushing metric batch"
            );
            self.uploader.send_metrics(batch).await?;
            self.metrics.delete(&record_ids)?;
            flushed += record_ids.len();
        }

        Ok(flushed)
    }
}

/// The trace flush job.
pub struct TraceFlusher {
    traces: Arc<dyn TraceStore>,
    resources: Arc<dyn ResourceStore>,
    uploader: Arc<dyn Uploader>,
}

impl TraceFlusher {
    /// Creates a flusher over the given stores and upload client.
    #[must_use]
    pub fn new(
        traces: Arc<dyn TraceStore>,
        resources: Arc<dyn ResourceStore>,
        uploader: Arc<dyn Uploader>,
    ) -> Self {
        Self {
            traces,
            resources,
            uploader,
        }
    }

    /// Runs one flush cycle.
    ///
    /// Returns the number of traces flushed.
    ///
    /// # Errors
    ///
    /// Returns an error when the store fails or the upload is rejected; in
    /// both cases the unsent records remain stored.
    pub async fn flush(&self) -> Result<usize, FlushError> {
        let entities = self.traces.unsent()?;
        if entities.is_empty() {
            return Ok(0);
        }

        let mut session_ids: Vec<String> = Vec::new();
        for entity in &entities {
            if !session_ids.contains(&entity.session_id) {
                session_ids.push(entity.session_id.clone());
            }
        }

        let mut flushed = 0;
        for session_id in session_ids {
            let (traces, record_ids): (Vec<_>, Vec<_>) = entities
                .iter()
                .filter(|e| e.session_id == session_id)
                .map(|e| (e.trace.clone(), e.record_id.clone()))
                .unzip();

            let batch = TraceBatch {
                traces,
                resources: resource_snapshot(self.resources.as_ref(), &session_id)?,
                session_id,
            };

            debug!(
                traces = batch.traces.len(),
                "Flushing trace batch"
            );
            self.uploader.send_traces(batch).await?;
            self.traces.delete(&record_ids)?;
            flushed += record_ids.len();
        }

        Ok(flushed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uploader::RecordingUploader;
    use shared::models::{
        Metric, MetricEntity, MetricType, Point, PointValue, ResourceEntity, ResourceLabel,
        Session, Span, TimeSeries, Trace, TraceEntity,
    };
    use shared::storage::{InMemoryMetricStore, InMemoryResourceStore, InMemoryTraceStore};

    fn cpu_entity(session: &Session, value: f64) -> MetricEntity {
        MetricEntity::new(
            session,
            Metric::new("app.cpu.pct", MetricType::GaugeDouble)
                .with_unit("%")
                .with_time_series(
                    TimeSeries::new().with_point(Point::now(PointValue::Double(value))),
                ),
        )
    }

    fn trace_entity(session: &Session) -> TraceEntity {
        let mut trace = Trace::new(&session.id);
        trace.add_span(Span::new("", "0011223344556677", "MainScreen"));
        TraceEntity::from_trace(trace)
    }

    struct Rig {
        metrics: Arc<InMemoryMetricStore>,
        traces: Arc<InMemoryTraceStore>,
        resources: Arc<InMemoryResourceStore>,
        uploader: Arc<RecordingUploader>,
    }

    impl Rig {
        fn new() -> Self {
            Self {
                metrics: InMemoryMetricStore::new_shared(),
                traces: InMemoryTraceStore::new_shared(),
                resources: InMemoryResourceStore::new_shared(),
                uploader: Arc::new(RecordingUploader::new()),
            }
        }

        fn metric_flusher(&self) -> MetricFlusher {
            MetricFlusher::new(
                self.metrics.clone(),
                self.resources.clone(),
                self.uploader.clone(),
            )
        }

        fn trace_flusher(&self) -> TraceFlusher {
            TraceFlusher::new(
                self.traces.clone(),
                self.resources.clone(),
                self.uploader.clone(),
            )
        }
    }

    #[tokio::test]
    async fn test_metric_flush_batches_and_deletes() {
        let rig = Rig::new();
        let session = Session::new("s-1");

        rig.metrics.save(cpu_entity(&session, 10.0)).unwrap();
        rig.metrics.save(cpu_entity(&session, 20.0)).unwrap();
        rig.metrics.save(cpu_entity(&session, 30.0)).unwrap();

        let flushed = rig.metric_flusher().flush().await.unwrap();

        assert_eq!(flushed, 3);
        assert_eq!(rig.metrics.count().unwrap(), 0);

        let batches = rig.uploader.metric_batches.lock().unwrap();
        assert_eq!(batches.len(), 1);
        // Three same-named samples collapse into one metric with three points.
        assert_eq!(batches[0].metrics.len(), 1);
        assert_eq!(batches[0].metrics[0].point_count(), 3);
    }

    #[tokio::test]
    async fn test_metric_flush_empty_store_sends_nothing() {
        let rig = Rig::new();

        let flushed = rig.metric_flusher().flush().await.unwrap();

        assert_eq!(flushed, 0);
        assert!(rig.uploader.metric_batches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_metric_flush_failure_keeps_records() {
        let rig = Rig::new();
        let session = Session::new("s-1");
        rig.metrics.save(cpu_entity(&session, 10.0)).unwrap();
        rig.uploader.set_failing(true);

        let result = rig.metric_flusher().flush().await;

        assert!(matches!(result, Err(FlushError::Upload(_))));
        assert_eq!(rig.metrics.count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_metric_flush_attaches_resource_snapshot() {
        let rig = Rig::new();
        let session = Session::new("s-1");

        rig.resources
            .save(ResourceEntity::new(
                &session,
                ResourceLabel::new("device.model", "Pixel 8"),
            ))
            .unwrap();
        rig.metrics.save(cpu_entity(&session, 10.0)).unwrap();

        rig.metric_flusher().flush().await.unwrap();

        let batches = rig.uploader.metric_batches.lock().unwrap();
        assert_eq!(batches[0].resources.len(), 1);
        assert_eq!(batches[0].resources[0].value, "Pixel 8");
    }

    #[tokio::test]
    async fn test_metric_flush_splits_batches_by_session() {
        let rig = Rig::new();
        let first = Session::new("s-1");
        let second = Session::new("s-2");

        rig.metrics.save(cpu_entity(&first, 10.0)).unwrap();
        rig.metrics.save(cpu_entity(&second, 20.0)).unwrap();

        let flushed = rig.metric_flusher().flush().await.unwrap();

        assert_eq!(flushed, 2);
        let batches = rig.uploader.metric_batches.lock().unwrap();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].session_id, "s-1");
        assert_eq!(batches[1].session_id, "s-2");
    }

    #[tokio::test]
    async fn test_trace_flush_sends_and_deletes() {
        let rig = Rig::new();
        let session = Session::new("s-1");

        rig.traces.save(trace_entity(&session)).unwrap();
        rig.traces.save(trace_entity(&session)).unwrap();

        let flushed = rig.trace_flusher().flush().await.unwrap();

        assert_eq!(flushed, 2);
        assert_eq!(rig.traces.count().unwrap(), 0);

        let batches = rig.uploader.trace_batches.lock().unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].traces.len(), 2);
    }

    #[tokio::test]
    async fn test_trace_flush_failure_keeps_records() {
        let rig = Rig::new();
        let session = Session::new("s-1");
        rig.traces.save(trace_entity(&session)).unwrap();
        rig.uploader.set_failing(true);

        let result = rig.trace_flusher().flush().await;

        assert!(matches!(result, Err(FlushError::Upload(_))));
        assert_eq!(rig.traces.count().unwrap(), 1);
    }
}
