//! Progress counters for crawl units
//!
//! Counters are process-local and reset with the process. A background
//! reporter logs them periodically until the crawl finishes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Started/finished counters shared by every crawl task
#[derive(Debug, Default)]
pub struct ProgressTracker {
    started: AtomicU64,
    finished: AtomicU64,
}

/// Marks one crawl unit as finished when dropped
#[must_use = "the unit finishes as soon as the guard is dropped"]
pub struct UnitGuard<'a> {
    tracker: &'a ProgressTracker,
}

impl Drop for UnitGuard<'_> {
    fn drop(&mut self) {
        self.tracker.finished.fetch_add(1, Ordering::Relaxed);
    }
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts a unit as started; it finishes when the guard drops
    pub fn start(&self) -> UnitGuard<'_> {
        self.started.fetch_add(1, Ordering::Relaxed);
        UnitGuard { tracker: self }
    }

    pub fn started(&self) -> u64 {
        self.started.load(Ordering::Relaxed)
    }

    pub fn finished(&self) -> u64 {
        self.finished.load(Ordering::Relaxed)
    }

    /// Units started but not yet finished
    pub fn active(&self) -> u64 {
        // finished is read first so the difference never underflows
        let finished = self.finished();
        self.started().saturating_sub(finished)
    }
}

/// Spawns a task that logs the counters every `interval` until `stop` fires
pub fn spawn_reporter(
    tracker: Arc<ProgressTracker>,
    interval: Duration,
    stop: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // the first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    tracing::info!(
                        "Progress: started {}, finished {}, active {}",
                        tracker.started(),
                        tracker.finished(),
                        tracker.active()
                    );
                }
                _ = stop.cancelled() => break,
            }
        }
    })
}
