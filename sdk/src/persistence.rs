//! Background trace persistence.
//!
//! `stop_trace` must never block its caller on storage I/O, so detached
//! traces travel through a bounded command queue to a dedicated worker
//! task that owns the store writes. Back-pressure is explicit: a full
//! queue drops the trace with a warning instead of blocking or panicking.
//! Shutdown drains whatever is still queued before the worker exits.

use std::sync::Arc;

use shared::models::TraceEntity;
use shared::storage::TraceStore;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

/// Commands accepted by the persistence worker.
#[derive(Debug)]
pub enum PersistenceCommand {
    /// Persist a detached trace.
    SaveTrace(TraceEntity),
    /// Drain the queue and stop.
    Shutdown,
}

/// Sending side of the persistence queue.
#[derive(Clone)]
pub struct PersistenceHandle {
    tx: mpsc::Sender<PersistenceCommand>,
}

impl PersistenceHandle {
    /// Enqueues a trace for persistence, fire-and-forget.
    ///
    /// The active-trace slot may be cleared once this returns: the
    /// persistence call has been issued even though its completion is
    /// asynchronous. On a full queue the trace is dropped and a warning
    /// logged.
    pub fn save_trace(&self, entity: TraceEntity) {
        match self.tx.try_send(PersistenceCommand::SaveTrace(entity)) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(command)) => {
                if let PersistenceCommand::SaveTrace(entity) = command {
                    warn!(
                        trace_id = %entity.trace.trace_id,
                        spans = entity.trace.span_count(),
                        "Persistence queue full, dropping trace"
                    );
                }
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!("Persistence worker stopped, dropping trace");
            }
        }
    }

    /// Asks the worker to drain the queue and stop.
    pub async fn shutdown(&self) {
        let _ = self.tx.send(PersistenceCommand::Shutdown).await;
    }
}

/// Dedicated consumer of the persistence queue.
pub struct PersistenceWorker {
    store: Arc<dyn TraceStore>,
    rx: mpsc::Receiver<PersistenceCommand>,
}

impl PersistenceWorker {
    /// Creates a worker and its handle with the given queue capacity.
    #[must_use]
    pub fn new(store: Arc<dyn TraceStore>, capacity: usize) -> (Self, PersistenceHandle) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { store, rx }, PersistenceHandle { tx })
    }

    fn save(&self, entity: TraceEntity) {
        let trace_id = entity.trace.trace_id.clone();
        if let Err(e) = self.store.save(entity) {
            error!(%trace_id, error = %e, "Failed to persist trace");
        }
    }

    /// Runs until shutdown, writing queued traces to the store.
    pub async fn run(mut self) {
        debug!("Trace persistence worker started");

        while let Some(command) = self.rx.recv().await {
            match command {
                PersistenceCommand::SaveTrace(entity) => self.save(entity),
                PersistenceCommand::Shutdown => {
                    // Drain anything enqueued before the shutdown request.
                    while let Ok(command) = self.rx.try_recv() {
                        if let PersistenceCommand::SaveTrace(entity) = command {
                            self.save(entity);
                        }
                    }
                    break;
                }
            }
        }

        debug!("Trace persistence worker stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{Span, Trace};
    use shared::storage::InMemoryTraceStore;

    fn entity(session_id: &str) -> TraceEntity {
        let mut trace = Trace::new(session_id);
        trace.add_span(Span::new("", "0011223344556677", "MainScreen"));
        TraceEntity::from_trace(trace)
    }

    #[tokio::test]
    async fn test_worker_persists_traces() {
        let store = InMemoryTraceStore::new_shared();
        let (worker, handle) = PersistenceWorker::new(store.clone(), 8);
        let task = tokio::spawn(worker.run());

        handle.save_trace(entity("s-1"));
        handle.save_trace(entity("s-1"));
        handle.shutdown().await;
        task.await.unwrap();

        assert_eq!(store.count().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_shutdown_drains_queue() {
        let store = InMemoryTraceStore::new_shared();
        let (worker, handle) = PersistenceWorker::new(store.clone(), 8);

        // Enqueue before the worker even starts; everything must still land.
        for _ in 0..5 {
            handle.save_trace(entity("s-1"));
        }
        handle.shutdown().await;

        worker.run().await;

        assert_eq!(store.count().unwrap(), 5);
    }

    #[tokio::test]
    async fn test_full_queue_drops_without_blocking() {
        let store = InMemoryTraceStore::new_shared();
        let (worker, handle) = PersistenceWorker::new(store.clone(), 1);

        // Worker not running yet; only the first send fits the queue.
        handle.save_trace(entity("s-1"));
        handle.save_trace(entity("s-1"));
        handle.save_trace(entity("s-1"));

        let task = tokio::spawn(worker.run());
        handle.shutdown().await;
        task.await.unwrap();

        assert_eq!(store.count().unwrap(), 1);
    }
}
