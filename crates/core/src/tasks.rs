//! Runs long operations (scanning, indexing) on the blocking pool and hands
//! back exactly one outcome. The caller may poll progress while it waits.

use crate::error::{PdfSearchError, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinError, JoinHandle};
use tracing::debug;

#[derive(Debug, Default)]
pub struct TaskProgress {
    completed: AtomicUsize,
    total: AtomicUsize,
}

impl TaskProgress {
    pub fn set_total(&self, total: usize) {
        self.total.store(total, Ordering::Relaxed);
    }

    pub fn advance(&self, steps: usize) {
        self.completed.fetch_add(steps, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            completed: self.completed.load(Ordering::Relaxed),
            total: self.total.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProgressSnapshot {
    pub completed: usize,
    pub total: usize,
}

impl ProgressSnapshot {
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.completed as f64 / self.total as f64).min(1.0)
    }
}

pub struct BackgroundTask<T> {
    label: String,
    handle: JoinHandle<Result<T>>,
    progress: Arc<TaskProgress>,
}

impl<T> BackgroundTask<T>
where
    T: Send + 'static,
{
    /// Must be called from within a tokio runtime.
    pub fn spawn<F>(label: impl Into<String>, operation: F) -> Self
    where
        F: FnOnce(&TaskProgress) -> Result<T> + Send + 'static,
    {
        let label = label.into();
        let progress = Arc::new(TaskProgress::default());
        let worker_progress = Arc::clone(&progress);

        debug!(task = %label, "starting background task");
        let handle = tokio::task::spawn_blocking(move || operation(&worker_progress));

        Self {
            label,
            handle,
            progress,
        }
    }

    pub fn progress(&self) -> ProgressSnapshot {
        self.progress.snapshot()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub async fn wait(self) -> Result<T> {
        let joined = self.handle.await;
        settle(&self.label, joined)
    }

    /// Waits for the outcome, reporting progress every `interval`.
    pub async fn wait_with_progress<P>(self, interval: Duration, mut on_tick: P) -> Result<T>
    where
        P: FnMut(ProgressSnapshot),
    {
        let Self {
            label,
            mut handle,
            progress,
        } = self;
        let mut ticker = tokio::time::interval(interval);

        loop {
            tokio::select! {
                joined = &mut handle => return settle(&label, joined),
                _ = ticker.tick() => on_tick(progress.snapshot()),
            }
        }
    }
}

fn settle<T>(label: &str, joined: std::result::Result<Result<T>, JoinError>) -> Result<T> {
    match joined {
        Ok(outcome) => {
            debug!(task = %label, success = outcome.is_ok(), "background task finished");
            outcome
        }
        Err(join_error) => Err(PdfSearchError::Task(format!("{label}: {join_error}"))),
    }
}

pub async fn run_in_background<T, F>(label: impl Into<String>, operation: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&TaskProgress) -> Result<T> + Send + 'static,
{
    BackgroundTask::spawn(label, operation).wait().await
}
