//! Background task tracker.
//!
//! Webhook deliveries are acknowledged before reconciliation finishes, so the
//! work is spawned here. Tracking the tasks lets shutdown wait for them
//! instead of dropping acknowledged events mid-allocation.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::{JoinError, JoinSet};
use tracing::{error, info, warn};

/// Returned when work is offered after shutdown has begun.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Background scheduler is shutting down")]
pub struct SchedulerClosed;

/// Outcome of [`BackgroundTasks::drain`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrainReport {
    pub completed: usize,
    pub aborted: usize,
}

/// Tracks spawned background work until it completes.
#[derive(Debug, Default)]
pub struct BackgroundTasks {
    tasks: Mutex<JoinSet<()>>,
    closed: AtomicBool,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns `task` on the runtime and tracks it.
    ///
    /// Finished tasks are reaped on every call so the set stays small.
    pub async fn spawn<F>(&self, task: F) -> Result<(), SchedulerClosed>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.tasks.lock().await;
        if self.closed.load(Ordering::Acquire) {
            return Err(SchedulerClosed);
        }

        while let Some(result) = tasks.try_join_next() {
            log_join_result(result);
        }
        tasks.spawn(task);
        Ok(())
    }

    /// Number of tasks not yet reaped.
    pub async fn len(&self) -> usize {
        self.tasks.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tasks.lock().await.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Stops accepting work and waits up to `timeout` for tracked tasks.
    ///
    /// Tasks still running at the deadline are aborted.
    pub async fn drain(&self, timeout: Duration) -> DrainReport {
        let mut tasks = {
            let mut guard = self.tasks.lock().await;
            self.closed.store(true, Ordering::Release);
            std::mem::take(&mut *guard)
        };

        let pending = tasks.len();
        info!(pending, "Draining background tasks");

        let mut completed = 0;
        let finished = tokio::time::timeout(timeout, async {
            while let Some(result) = tasks.join_next().await {
                log_join_result(result);
                completed += 1;
            }
        })
        .await;

        let mut report = DrainReport {
            completed,
            aborted: 0,
        };
        if finished.is_err() {
            report.aborted = tasks.len();
            warn!(
                aborted = report.aborted,
                "Background tasks did not finish before the drain deadline"
            );
            tasks.abort_all();
        }
        report
    }
}

fn log_join_result(result: Result<(), JoinError>) {
    if let Err(err) = result {
        if err.is_panic() {
            error!(error = %err, "Background task panicked");
        }
    }
}
