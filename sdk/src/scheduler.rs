//! Periodic task scheduling.
//!
//! A [`PeriodicScheduler`] wraps `tokio::time::interval` loops behind a
//! cancel-all handle. The data manager runs one scheduler for recurring
//! collectors and a separate one for the two flush jobs, so stopping
//! collection and stopping sending stay independent.

use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use tokio::task::JoinHandle;

/// Holds the spawned interval loops of one scheduling domain.
///
/// Cancellation aborts the loops; it does not interrupt a task body that is
/// already running, it only prevents further scheduled invocations.
#[derive(Debug, Default)]
pub struct PeriodicScheduler {
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl PeriodicScheduler {
    /// Creates a scheduler with no scheduled jobs.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `task` to run every `every`, starting one interval from now.
    ///
    /// The factory is invoked once per tick; its future is awaited before
    /// the next tick is considered, so a slow run delays later runs instead
    /// of overlapping them.
    pub fn schedule<F, Fut>(&self, every: Duration, task: F)
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut tick = tokio::time::interval(every);
            // The first tick of a tokio interval fires immediately.
            tick.tick().await;
            loop {
                tick.tick().await;
                task().await;
            }
        });

        self.handles
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(handle);
    }

    /// Number of currently scheduled jobs.
    #[must_use]
    pub fn job_count(&self) -> usize {
        self.handles
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    /// Aborts every scheduled job and clears the handle set.
    pub fn cancel_all(&self) {
        let mut handles = self
            .handles
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        for handle in handles.drain(..) {
            handle.abort();
        }
    }
}

impl Drop for PeriodicScheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_scheduled_task_runs_repeatedly() {
        let scheduler = PeriodicScheduler::new();
        let runs = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&runs);
        scheduler.schedule(Duration::from_millis(10), move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(runs.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn test_cancel_all_stops_jobs() {
        let scheduler = PeriodicScheduler::new();
        let runs = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&runs);
        scheduler.schedule(Duration::from_millis(10), move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        assert_eq!(scheduler.job_count(), 1);
        scheduler.cancel_all();
        assert_eq!(scheduler.job_count(), 0);

        let before = runs.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(runs.load(Ordering::SeqCst), before);
    }

    #[tokio::test]
    async fn test_first_run_waits_one_interval() {
        let scheduler = PeriodicScheduler::new();
        let runs = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&runs);
        scheduler.schedule(Duration::from_secs(60), move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }
}
