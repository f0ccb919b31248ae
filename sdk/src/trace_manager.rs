//! The trace manager: owner of the single active trace.
//!
//! All instrumentation sources contribute spans to one process-wide active
//! trace. The manager serializes those contributions, owns the root-span-id
//! cache, and governs the start/stop state machine. Every transition runs
//! under one lock, so two producers adding spans "simultaneously" can never
//! interleave with a stop/start cycle in a way that loses a span or
//! attaches it to a trace already being persisted.

use std::sync::{Arc, Mutex};

use shared::ids;
use shared::models::{Session, Span, Trace, TraceEntity};
use tracing::debug;

use crate::persistence::PersistenceHandle;
use crate::session::SessionProvider;

/// Mutable state behind the trace manager's lock.
#[derive(Debug, Default)]
struct ActiveTraceState {
    /// The active trace; `None` between stop and the next start.
    active: Option<Trace>,
    /// Cached root span id of the active trace.
    root_span_id: Option<String>,
}

/// Owns the active trace and its lifecycle.
pub struct TraceManager {
    state: Mutex<ActiveTraceState>,
    sessions: Arc<dyn SessionProvider>,
    persistence: PersistenceHandle,
}

impl TraceManager {
    /// Creates a manager with no active trace.
    #[must_use]
    pub fn new(sessions: Arc<dyn SessionProvider>, persistence: PersistenceHandle) -> Self {
        Self {
            state: Mutex::new(ActiveTraceState::default()),
            sessions,
            persistence,
        }
    }

    /// The session a new trace must bind to.
    ///
    /// # Panics
    ///
    /// Panics when no session is active: a trace-creating operation before
    /// SDK initialization is a programmer error, not a recoverable state.
    fn require_session(&self) -> Session {
        self.sessions
            .active_session()
            .expect("no active session: start a session before tracing")
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, ActiveTraceState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Detaches the active trace, if any, and submits it for persistence.
    ///
    /// Runs under the caller's lock so the swap-out and the persistence
    /// submission are atomic with respect to span contributions.
    fn finish_locked(&self, state: &mut ActiveTraceState) {
        state.root_span_id = None;
        if let Some(trace) = state.active.take() {
            debug!(
                trace_id = %trace.trace_id,
                spans = trace.span_count(),
                "Stopping trace"
            );
            self.persistence.save_trace(TraceEntity::from_trace(trace));
        }
    }

    fn start_locked(&self, state: &mut ActiveTraceState) {
        let session = self.require_session();
        let trace = Trace::new(session.id);
        debug!(trace_id = %trace.trace_id, "Starting trace");
        state.active = Some(trace);
        state.root_span_id = None;
    }

    /// Starts a fresh trace, stopping (and persisting) any previous one.
    ///
    /// # Panics
    ///
    /// Panics when no session is active.
    pub fn start_trace(&self) {
        let mut state = self.lock_state();
        if state.active.is_some() {
            self.finish_locked(&mut state);
        }
        self.start_locked(&mut state);
    }

    /// Stops the active trace; a no-op when none is active.
    ///
    /// The detached trace is handed to the persistence queue before the
    /// lock is released; the caller never blocks on storage I/O.
    pub fn stop_trace(&self) {
        let mut state = self.lock_state();
        if state.active.is_none() {
            debug!("stop_trace with no active trace");
            return;
        }
        self.finish_locked(&mut state);
    }

    /// Adds a span to the active trace, starting one implicitly if needed.
    ///
    /// The span's trace id is rewritten to the active trace's: a span
    /// constructed before any trace existed is attributed to whichever
    /// trace is active at insertion time.
    ///
    /// # Panics
    ///
    /// Panics when no session is active and a trace must be created.
    pub fn add_span_to_active_trace(&self, span: Span) {
        let mut state = self.lock_state();
        if state.active.is_none() {
            self.start_locked(&mut state);
        }
        // Guarded by the branch above.
        if let Some(trace) = state.active.as_mut() {
            trace.add_span(span);
        }
    }

    /// Generates a span id; when `is_root`, caches it as the root span id,
    /// replacing the previous cached value.
    #[must_use]
    pub fn create_span_id(&self, is_root: bool) -> String {
        let span_id = ids::new_span_id();
        if is_root {
            self.lock_state().root_span_id = Some(span_id.clone());
        }
        span_id
    }

    /// The cached root span id, if one exists for the active trace.
    #[must_use]
    pub fn root_span_id(&self) -> Option<String> {
        self.lock_state().root_span_id.clone()
    }

    /// True while a trace is active.
    #[must_use]
    pub fn has_active_trace(&self) -> bool {
        self.lock_state().active.is_some()
    }

    /// A snapshot of the active trace, if any (diagnostics and tests).
    #[must_use]
    pub fn active_trace(&self) -> Option<Trace> {
        self.lock_state().active.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::PersistenceWorker;
    use crate::session::SessionManager;
    use shared::storage::{InMemoryTraceStore, TraceStore};

    fn manager_with_store() -> (Arc<TraceManager>, Arc<InMemoryTraceStore>, tokio::task::JoinHandle<()>, PersistenceHandle)
    {
        let store = InMemoryTraceStore::new_shared();
        let (worker, handle) = PersistenceWorker::new(store.clone(), 16);
        let worker_task = tokio::spawn(worker.run());

        let sessions = Arc::new(SessionManager::new());
        sessions.start_session();

        let manager = Arc::new(TraceManager::new(sessions, handle.clone()));
        (manager, store, worker_task, handle)
    }

    async fn drain(handle: PersistenceHandle, worker_task: tokio::task::JoinHandle<()>) {
        handle.shutdown().await;
        worker_task.await.unwrap();
    }

    fn span(span_id: &str, name: &str) -> Span {
        Span::new("stale", span_id, name)
    }

    #[tokio::test]
    async fn test_spans_carry_active_trace_id() {
        let (manager, store, worker_task, handle) = manager_with_store();

        manager.start_trace();
        manager.add_span_to_active_trace(span("a", "ScreenOne"));
        manager.add_span_to_active_trace(span("b", "ScreenTwo"));
        manager.stop_trace();

        drain(handle, worker_task).await;

        let traces = store.unsent().unwrap();
        assert_eq!(traces.len(), 1);
        let trace = &traces[0].trace;
        assert_eq!(trace.span_count(), 2);
        for span in &trace.spans {
            assert_eq!(span.trace_id, trace.trace_id);
        }
    }

    #[tokio::test]
    async fn test_add_span_starts_trace_implicitly() {
        let (manager, store, worker_task, handle) = manager_with_store();

        assert!(!manager.has_active_trace());
        manager.add_span_to_active_trace(span("a", "ScreenOne"));
        assert!(manager.has_active_trace());

        manager.stop_trace();
        drain(handle, worker_task).await;

        let traces = store.unsent().unwrap();
        assert_eq!(traces.len(), 1);
        assert_eq!(traces[0].trace.span_count(), 1);
    }

    #[tokio::test]
    async fn test_restart_invalidates_root_span_id() {
        let (manager, _store, worker_task, handle) = manager_with_store();

        manager.start_trace();
        let root = manager.create_span_id(true);
        assert_eq!(manager.root_span_id(), Some(root));

        manager.start_trace();
        assert!(manager.root_span_id().is_none());

        drain(handle, worker_task).await;
    }

    #[tokio::test]
    async fn test_create_span_id_non_root_keeps_cache() {
        let (manager, _store, worker_task, handle) = manager_with_store();

        manager.start_trace();
        let root = manager.create_span_id(true);
        let child = manager.create_span_id(false);

        assert_ne!(root, child);
        assert_eq!(manager.root_span_id(), Some(root));

        drain(handle, worker_task).await;
    }

    #[tokio::test]
    async fn test_stop_without_active_trace_is_a_noop() {
        let (manager, store, worker_task, handle) = manager_with_store();

        manager.stop_trace();
        drain(handle, worker_task).await;

        assert_eq!(store.count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_start_trace_flushes_previous() {
        let (manager, store, worker_task, handle) = manager_with_store();

        manager.start_trace();
        manager.add_span_to_active_trace(span("a", "ScreenOne"));
        let first_id = manager.active_trace().unwrap().trace_id;

        manager.start_trace();
        let second_id = manager.active_trace().unwrap().trace_id;
        assert_ne!(first_id, second_id);

        manager.stop_trace();
        drain(handle, worker_task).await;

        let traces = store.unsent().unwrap();
        assert_eq!(traces.len(), 2);
        assert_eq!(traces[0].trace.trace_id, first_id);
    }

    #[tokio::test]
    async fn test_trace_binds_to_active_session() {
        let store = InMemoryTraceStore::new_shared();
        let (worker, handle) = PersistenceWorker::new(store.clone(), 16);
        let worker_task = tokio::spawn(worker.run());

        let sessions = Arc::new(SessionManager::new());
        let session = sessions.start_session();
        let manager = TraceManager::new(sessions, handle.clone());

        manager.start_trace();
        manager.stop_trace();
        drain(handle, worker_task).await;

        let traces = store.unsent().unwrap();
        assert_eq!(traces[0].session_id, session.id);
    }

    #[tokio::test]
    #[should_panic(expected = "no active session")]
    async fn test_trace_without_session_panics() {
        let store = InMemoryTraceStore::new_shared();
        let (_worker, handle) = PersistenceWorker::new(store, 16);
        let manager = TraceManager::new(Arc::new(SessionManager::new()), handle);

        manager.start_trace();
    }

    #[tokio::test]
    async fn test_concurrent_span_contributions_all_land() {
        let (manager, store, worker_task, handle) = manager_with_store();

        manager.start_trace();

        let mut tasks = Vec::new();
        for i in 0..16 {
            let manager = Arc::clone(&manager);
            tasks.push(tokio::task::spawn_blocking(move || {
                manager.add_span_to_active_trace(Span::new("", format!("span-{i}"), "Screen"));
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        manager.stop_trace();
        drain(handle, worker_task).await;

        let traces = store.unsent().unwrap();
        assert_eq!(traces.len(), 1);
        assert_eq!(traces[0].trace.span_count(), 16);
    }
}
