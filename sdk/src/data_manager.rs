//! The data manager: single ingress point and lifecycle owner.
//!
//! Every producer delivers its records to [`DataManager::handle_received_data`],
//! which dispatches them to the right formatter and routes the outputs:
//! spans to the trace manager, metrics and resource labels synchronously
//! into the store, crash reports straight to the upload client. The manager
//! also owns the collection lifecycle (scheduling collectors, starting
//! listeners) and the sending lifecycle (the two periodic flush jobs).
//!
//! The manager is built once by the composition root with its dependencies
//! passed in explicitly; there is no global instance.

use std::sync::{Arc, Mutex, Weak};

use shared::config::FlushConfig;
use shared::models::{MeasurementRecord, MetricEntity, ResourceEntity, Session};
use shared::storage::{MetricStore, ResourceStore};
use tracing::{debug, error, info, warn};

use crate::flush::{MetricFlusher, TraceFlusher};
use crate::formatters::{DispatchError, FormattedOutput, FormatterRegistry};
use crate::persistence::PersistenceHandle;
use crate::producers::{
    ConfigurationProvider, DataListener, MeasurementSink, Permission, PermissionGate,
};
use crate::scheduler::PeriodicScheduler;
use crate::session::SessionProvider;
use crate::trace_manager::TraceManager;
use crate::uploader::Uploader;

/// Mutable collection state behind its own lock.
#[derive(Default)]
struct CollectionState {
    active: bool,
    listeners: Vec<Arc<dyn DataListener>>,
}

/// Everything the data manager depends on, assembled by the composition
/// root.
pub struct DataManagerDeps {
    /// Formatter lookup table.
    pub registry: FormatterRegistry,
    /// The trace manager spans are routed to.
    pub trace_manager: Arc<TraceManager>,
    /// Store for formatted metrics.
    pub metric_store: Arc<dyn MetricStore>,
    /// Store for formatted resource labels.
    pub resource_store: Arc<dyn ResourceStore>,
    /// Source of the active session.
    pub sessions: Arc<dyn SessionProvider>,
    /// Source of the registered producers.
    pub provider: Arc<dyn ConfigurationProvider>,
    /// Permission oracle consulted before starting producers.
    pub permissions: Arc<dyn PermissionGate>,
    /// Upload client; receives crash reports immediately and flush batches
    /// on cadence.
    pub uploader: Arc<dyn Uploader>,
    /// Handle used to drain the persistence worker at shutdown.
    pub persistence: PersistenceHandle,
    /// Sending-side configuration.
    pub flush_config: FlushConfig,
}

/// Coordinates measurement dispatch and the collection/sending lifecycle.
pub struct DataManager {
    /// Weak handle to this manager, for scheduled closures and sinks.
    weak_self: Weak<DataManager>,
    registry: FormatterRegistry,
    trace_manager: Arc<TraceManager>,
    metric_store: Arc<dyn MetricStore>,
    resource_store: Arc<dyn ResourceStore>,
    sessions: Arc<dyn SessionProvider>,
    provider: Arc<dyn ConfigurationProvider>,
    permissions: Arc<dyn PermissionGate>,
    uploader: Arc<dyn Uploader>,
    persistence: PersistenceHandle,
    flush_config: FlushConfig,
    collection: Mutex<CollectionState>,
    collection_scheduler: PeriodicScheduler,
    sending_scheduler: PeriodicScheduler,
    metric_flusher: Arc<MetricFlusher>,
    trace_flusher: Arc<TraceFlusher>,
}

impl DataManager {
    /// Creates a data manager from its dependencies.
    ///
    /// Returns an `Arc` because scheduled collector closures and listener
    /// sinks hold weak handles back to the manager. The trace flusher reads
    /// the same store the persistence worker writes, so both sides are
    /// handed in through [`DataManagerDeps`].
    #[must_use]
    pub fn new(deps: DataManagerDeps, trace_flusher: TraceFlusher) -> Arc<Self> {
        let metric_flusher = Arc::new(MetricFlusher::new(
            deps.metric_store.clone(),
            deps.resource_store.clone(),
            deps.uploader.clone(),
        ));

        Arc::new_cyclic(|weak_self| Self {
            weak_self: weak_self.clone(),
            registry: deps.registry,
            trace_manager: deps.trace_manager,
            metric_store: deps.metric_store,
            resource_store: deps.resource_store,
            sessions: deps.sessions,
            provider: deps.provider,
            permissions: deps.permissions,
            uploader: deps.uploader,
            persistence: deps.persistence,
            flush_config: deps.flush_config,
            collection: Mutex::new(CollectionState::default()),
            collection_scheduler: PeriodicScheduler::new(),
            sending_scheduler: PeriodicScheduler::new(),
            metric_flusher,
            trace_flusher: Arc::new(trace_flusher),
        })
    }

    /// The session every persisted entity must bind to.
    ///
    /// # Panics
    ///
    /// Panics when no session is active: persisting telemetry before SDK
    /// initialization is a programmer error.
    fn require_session(&self) -> Session {
        self.sessions
            .active_session()
            .expect("no active session: start a session before collecting")
    }

    fn permissions_granted(&self, required: &[Permission]) -> bool {
        required.iter().all(|p| {
            let granted = self.permissions.is_granted(*p);
            if !granted {
                warn!(permission = %p, "Producer skipped, permission not granted");
            }
            granted
        })
    }

    /// Receives one record from a producer and routes its outputs.
    ///
    /// Safe to call concurrently from many producer threads. Metric and
    /// resource persistence is synchronous (producers run off the main
    /// thread); span routing and crash upload never block on I/O. An empty
    /// formatter output means the sensor had nothing to report and causes
    /// no further action.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] when the record's source type has no
    /// registered formatter. Store failures are logged, not returned:
    /// losing one write must not take down the producer.
    ///
    /// # Panics
    ///
    /// Panics when a metric or resource output must be persisted and no
    /// session is active.
    pub fn handle_received_data(&self, record: &MeasurementRecord) -> Result<(), DispatchError> {
        let outputs = self.registry.format(record)?;
        if outputs.is_empty() {
            debug!(source = %record.source, "Measurement had no reportable content");
            return Ok(());
        }

        for output in outputs {
            match output {
                FormattedOutput::Span(span) => {
                    self.trace_manager.add_span_to_active_trace(span);
                }
                FormattedOutput::Metric(metric) => {
                    if metric.is_empty() {
                        continue;
                    }
                    if let Err(e) = metric.validate_metric() {
                        warn!(source = %record.source, error = %e, "Dropping invalid metric");
                        continue;
                    }
                    let session = self.require_session();
                    if let Err(e) = self.metric_store.save(MetricEntity::new(&session, metric)) {
                        error!(source = %record.source, error = %e, "Failed to persist metric");
                    }
                }
                FormattedOutput::Resource(label) => {
                    let session = self.require_session();
                    if let Err(e) = self
                        .resource_store
                        .save(ResourceEntity::new(&session, label))
                    {
                        error!(source = %record.source, error = %e, "Failed to persist resource");
                    }
                }
                FormattedOutput::Crash(report) => {
                    // A crashing process cannot wait for the next flush
                    // cadence; hand the report to the uploader now.
                    let uploader = Arc::clone(&self.uploader);
                    tokio::spawn(async move {
                        if let Err(e) = uploader.send_crash_report(report).await {
                            error!(error = %e, "Failed to upload crash report");
                        }
                    });
                }
            }
        }

        Ok(())
    }

    /// Starts the registered producers. Idempotent: a second call while
    /// collection is active does nothing.
    ///
    /// Collectors whose permissions are granted get a periodic schedule at
    /// their declared interval; listeners get a sink and register with
    /// their sources.
    pub fn start_collection(&self) {
        let mut state = self
            .collection
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if state.active {
            debug!("Collection already active");
            return;
        }

        let collectors = self.provider.recurring_collectors();
        let listeners = self.provider.listeners();
        info!(
            collectors = collectors.len(),
            listeners = listeners.len(),
            "Starting collection"
        );

        for collector in collectors {
            if !self.permissions_granted(&collector.required_permissions()) {
                continue;
            }
            let manager = self.weak_self.clone();
            let interval = collector.interval();
            self.collection_scheduler.schedule(interval, move || {
                let manager = manager.clone();
                let collector = Arc::clone(&collector);
                async move {
                    let Some(manager) = manager.upgrade() else {
                        return;
                    };
                    let record = collector.collect();
                    if let Err(e) = manager.handle_received_data(&record) {
                        error!(error = %e, "Collector record was not dispatched");
                    }
                }
            });
        }

        let sink = self.measurement_sink();
        for listener in &listeners {
            if !self.permissions_granted(&listener.required_permissions()) {
                continue;
            }
            listener.start(sink.clone());
            state.listeners.push(Arc::clone(listener));
        }

        state.active = true;
    }

    /// Stops and clears all active collectors and listeners.
    pub fn stop_collection(&self) {
        let mut state = self
            .collection
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if !state.active {
            return;
        }

        self.collection_scheduler.cancel_all();
        for listener in state.listeners.drain(..) {
            listener.stop();
        }
        state.active = false;
        info!("Collection stopped");
    }

    /// Schedules the two flush jobs, stopping any previous schedule first.
    pub fn start_sending(&self) {
        self.stop_sending();

        let metric_flusher = Arc::clone(&self.metric_flusher);
        self.sending_scheduler
            .schedule(self.flush_config.metric_interval, move || {
                let flusher = Arc::clone(&metric_flusher);
                async move {
                    match flusher.flush().await {
                        Ok(0) => {}
                        Ok(count) => debug!(records = count, "Metric flush complete"),
                        Err(e) => warn!(error = %e, "Metric flush failed"),
                    }
                }
            });

        let trace_flusher = Arc::clone(&self.trace_flusher);
        self.sending_scheduler
            .schedule(self.flush_config.trace_interval, move || {
                let flusher = Arc::clone(&trace_flusher);
                async move {
                    match flusher.flush().await {
                        Ok(0) => {}
                        Ok(count) => debug!(records = count, "Trace flush complete"),
                        Err(e) => warn!(error = %e, "Trace flush failed"),
                    }
                }
            });

        info!(
            metric_interval_secs = self.flush_config.metric_interval.as_secs(),
            trace_interval_secs = self.flush_config.trace_interval.as_secs(),
            "Sending started"
        );
    }

    /// Cancels both scheduled flush jobs.
    pub fn stop_sending(&self) {
        self.sending_scheduler.cancel_all();
    }

    /// Number of jobs currently scheduled on the sending side.
    #[must_use]
    pub fn sending_job_count(&self) -> usize {
        self.sending_scheduler.job_count()
    }

    /// A sink delivering records back into this manager.
    #[must_use]
    pub fn measurement_sink(&self) -> MeasurementSink {
        let manager = self.weak_self.clone();
        MeasurementSink::new(move |record| {
            let Some(manager) = manager.upgrade() else {
                return;
            };
            if let Err(e) = manager.handle_received_data(&record) {
                error!(error = %e, "Listener record was not dispatched");
            }
        })
    }

    /// Runs one metric flush cycle immediately (outside the schedule).
    ///
    /// # Errors
    ///
    /// Propagates the flush error; records stay stored.
    pub async fn flush_metrics_now(&self) -> Result<usize, crate::flush::FlushError> {
        self.metric_flusher.flush().await
    }

    /// Runs one trace flush cycle immediately (outside the schedule).
    ///
    /// # Errors
    ///
    /// Propagates the flush error; records stay stored.
    pub async fn flush_traces_now(&self) -> Result<usize, crate::flush::FlushError> {
        self.trace_flusher.flush().await
    }

    /// Tears the pipeline down: stops collection and sending, finalizes
    /// the active trace, and drains the persistence worker.
    ///
    /// Supports re-initialization and tests; not a normal runtime path.
    pub async fn shutdown(&self) {
        self.stop_collection();
        self.stop_sending();
        self.trace_manager.stop_trace();
        self.persistence.shutdown().await;
        info!("Data manager shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::PersistenceWorker;
    use crate::producers::{
        AllowAllPermissions, DataCollector, StaticConfigurationProvider,
    };
    use crate::session::SessionManager;
    use crate::uploader::RecordingUploader;
    use shared::models::{DataSourceType, MeasurementValue, NetworkCallData};
    use shared::storage::{
        InMemoryMetricStore, InMemoryResourceStore, InMemoryTraceStore, MetricStore,
        ResourceStore, TraceStore,
    };
    use std::time::Duration;

    struct Rig {
        manager: Arc<DataManager>,
        metric_store: Arc<InMemoryMetricStore>,
        resource_store: Arc<InMemoryResourceStore>,
        trace_store: Arc<InMemoryTraceStore>,
        trace_manager: Arc<TraceManager>,
        uploader: Arc<RecordingUploader>,
    }

    fn rig_custom(provider: Arc<dyn ConfigurationProvider>, registry: FormatterRegistry) -> Rig {
        let metric_store = InMemoryMetricStore::new_shared();
        let resource_store = InMemoryResourceStore::new_shared();
        let trace_store = InMemoryTraceStore::new_shared();
        let uploader = Arc::new(RecordingUploader::new());

        let sessions = Arc::new(SessionManager::new());
        sessions.start_session();
        let sessions: Arc<dyn SessionProvider> = sessions;

        let (worker, persistence) = PersistenceWorker::new(trace_store.clone(), 16);
        tokio::spawn(worker.run());

        let trace_manager = Arc::new(TraceManager::new(
            sessions.clone(),
            persistence.clone(),
        ));

        let trace_flusher = TraceFlusher::new(
            trace_store.clone(),
            resource_store.clone(),
            uploader.clone(),
        );

        let manager = DataManager::new(
            DataManagerDeps {
                registry,
                trace_manager: trace_manager.clone(),
                metric_store: metric_store.clone(),
                resource_store: resource_store.clone(),
                sessions,
                provider,
                permissions: Arc::new(AllowAllPermissions),
                uploader: uploader.clone(),
                persistence,
                flush_config: FlushConfig::default(),
            },
            trace_flusher,
        );

        Rig {
            manager,
            metric_store,
            resource_store,
            trace_store,
            trace_manager,
            uploader,
        }
    }

    fn rig_with_provider(provider: Arc<dyn ConfigurationProvider>) -> Rig {
        rig_custom(provider, FormatterRegistry::with_defaults())
    }

    fn rig() -> Rig {
        rig_with_provider(Arc::new(StaticConfigurationProvider::new()))
    }

    #[tokio::test]
    async fn test_metric_output_is_persisted() {
        let rig = rig();

        rig.manager
            .handle_received_data(&MeasurementRecord::double(DataSourceType::AppCpu, 12.5))
            .unwrap();

        assert_eq!(rig.metric_store.count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_resource_output_is_persisted() {
        let rig = rig();

        rig.manager
            .handle_received_data(&MeasurementRecord::text(
                DataSourceType::DeviceModel,
                "Pixel 8",
            ))
            .unwrap();

        assert_eq!(rig.resource_store.count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_span_output_reaches_trace_manager() {
        let rig = rig();

        let call = NetworkCallData {
            method: "GET".to_string(),
            url: "https://bitrise.io/segment/other".to_string(),
            status_code: 200,
            request_size: 0,
            response_size: 100,
            start_time_ms: 1_600_000_000_000,
            end_time_ms: 1_600_000_000_100,
            span_id: "00aa11bb22cc33dd".to_string(),
            parent_span_id: None,
        };
        rig.manager
            .handle_received_data(&MeasurementRecord::new(
                DataSourceType::NetworkCall,
                MeasurementValue::Network(call),
            ))
            .unwrap();

        let trace = rig.trace_manager.active_trace().unwrap();
        assert_eq!(trace.span_count(), 1);
        assert_eq!(trace.spans[0].trace_id, trace.trace_id);
    }

    #[tokio::test]
    async fn test_null_content_causes_no_action() {
        let rig = rig();

        rig.manager
            .handle_received_data(&MeasurementRecord::null(DataSourceType::AppCpu))
            .unwrap();

        assert_eq!(rig.metric_store.count().unwrap(), 0);
        assert!(!rig.trace_manager.has_active_trace());
    }

    #[tokio::test]
    async fn test_unregistered_source_is_an_error() {
        let mut registry = FormatterRegistry::new();
        registry.register(
            DataSourceType::AppCpu,
            Box::new(crate::formatters::AppCpuFormatter),
        );
        let rig = rig_custom(Arc::new(StaticConfigurationProvider::new()), registry);

        let result = rig
            .manager
            .handle_received_data(&MeasurementRecord::integer(DataSourceType::AppMemory, 1));

        assert_eq!(
            result.unwrap_err(),
            DispatchError::Unregistered(DataSourceType::AppMemory)
        );
    }

    struct CountingCollector {
        calls: std::sync::atomic::AtomicUsize,
    }

    impl DataCollector for CountingCollector {
        fn source(&self) -> DataSourceType {
            DataSourceType::AppCpu
        }

        fn interval(&self) -> Duration {
            Duration::from_millis(10)
        }

        fn collect(&self) -> MeasurementRecord {
            self.calls
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            MeasurementRecord::double(DataSourceType::AppCpu, 5.0)
        }
    }

    #[tokio::test]
    async fn test_collection_schedules_collectors() {
        let provider = Arc::new(
            StaticConfigurationProvider::new().with_collector(Arc::new(CountingCollector {
                calls: std::sync::atomic::AtomicUsize::new(0),
            })),
        );
        let rig = rig_with_provider(provider);

        rig.manager.start_collection();
        tokio::time::sleep(Duration::from_millis(100)).await;
        rig.manager.stop_collection();

        assert!(rig.metric_store.count().unwrap() >= 2);
    }

    #[tokio::test]
    async fn test_start_collection_is_idempotent() {
        let provider = Arc::new(
            StaticConfigurationProvider::new().with_collector(Arc::new(CountingCollector {
                calls: std::sync::atomic::AtomicUsize::new(0),
            })),
        );
        let rig = rig_with_provider(provider);

        rig.manager.start_collection();
        rig.manager.start_collection();

        // A duplicate start must not double the schedule.
        tokio::time::sleep(Duration::from_millis(45)).await;
        rig.manager.stop_collection();

        let count = rig.metric_store.count().unwrap();
        assert!(count <= 5, "duplicate schedules detected: {count} records");
    }

    #[tokio::test]
    async fn test_start_sending_schedules_two_jobs() {
        let rig = rig();

        rig.manager.start_sending();
        assert_eq!(rig.manager.sending_job_count(), 2);

        // Restarting replaces, not accumulates.
        rig.manager.start_sending();
        assert_eq!(rig.manager.sending_job_count(), 2);

        rig.manager.stop_sending();
        assert_eq!(rig.manager.sending_job_count(), 0);
    }

    #[tokio::test]
    async fn test_crash_report_goes_straight_to_uploader() {
        use shared::models::{CrashData, ExceptionData};

        let rig = rig();
        let crash = CrashData {
            exception: ExceptionData {
                class_name: "java.lang.OutOfMemoryError".to_string(),
                message: None,
                frames: Vec::new(),
                cause: None,
            },
            threads: Vec::new(),
            crashed_at_ms: 1_600_000_000_000,
        };

        rig.manager
            .handle_received_data(&MeasurementRecord::new(
                DataSourceType::Crash,
                MeasurementValue::Crash(crash),
            ))
            .unwrap();

        // The upload is spawned; give it a beat.
        tokio::time::sleep(Duration::from_millis(20)).await;

        let reports = rig.uploader.crash_reports.lock().unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].title, "java.lang.OutOfMemoryError");
    }

    #[tokio::test]
    async fn test_shutdown_finalizes_active_trace() {
        let rig = rig();

        rig.manager
            .handle_received_data(&MeasurementRecord::new(
                DataSourceType::ViewLifecycle,
                MeasurementValue::View(shared::models::ViewEvent {
                    name: "MainScreen".to_string(),
                    start_time_ms: 1_600_000_000_000,
                    end_time_ms: 1_600_000_001_000,
                    span_id: "aa00bb11cc22dd33".to_string(),
                    parent_span_id: None,
                }),
            ))
            .unwrap();

        rig.manager.shutdown().await;
        // The worker drains asynchronously after the shutdown command.
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(!rig.trace_manager.has_active_trace());
        assert_eq!(rig.trace_store.count().unwrap(), 1);
    }
}
