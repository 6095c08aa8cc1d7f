//! Process-local counters for runs, steps, and written files.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Shared counters, updated by the engine and read by observers.
///
/// Plain atomics behind an `Arc`: counts are monotonic and a snapshot only
/// needs to be internally plausible, not transactional.
#[derive(Debug, Default)]
pub struct Metrics {
    runs_started: AtomicU64,
    runs_completed: AtomicU64,
    runs_failed: AtomicU64,
    steps_executed: AtomicU64,
    steps_failed: AtomicU64,
    files_written: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub runs_started: u64,
    pub runs_completed: u64,
    pub runs_failed: u64,
    pub steps_executed: u64,
    pub steps_failed: u64,
    pub files_written: u64,
}

impl Metrics {
    pub fn record_run_started(&self) {
        self.runs_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_run_completed(&self) {
        self.runs_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_run_failed(&self) {
        self.runs_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_step_executed(&self) {
        self.steps_executed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_step_failed(&self) {
        self.steps_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_file_written(&self) {
        self.files_written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            runs_started: self.runs_started.load(Ordering::Relaxed),
            runs_completed: self.runs_completed.load(Ordering::Relaxed),
            runs_failed: self.runs_failed.load(Ordering::Relaxed),
            steps_executed: self.steps_executed.load(Ordering::Relaxed),
            steps_failed: self.steps_failed.load(Ordering::Relaxed),
            files_written: self.files_written.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_recorded_counts() {
        let metrics = Metrics::default();
        metrics.record_run_started();
        metrics.record_step_executed();
        metrics.record_step_executed();
        metrics.record_step_failed();
        metrics.record_file_written();
        metrics.record_run_failed();

        let snap = metrics.snapshot();
        assert_eq!(snap.runs_started, 1);
        assert_eq!(snap.runs_completed, 0);
        assert_eq!(snap.runs_failed, 1);
        assert_eq!(snap.steps_executed, 2);
        assert_eq!(snap.steps_failed, 1);
        assert_eq!(snap.files_written, 1);
    }
}
