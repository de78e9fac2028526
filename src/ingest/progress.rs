//! Progress reporting hooks for long fan-outs.

use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::info;

/// Receives progress of one stage at a time.
pub trait Progress: Send + Sync {
    fn start(&self, stage: &str, total: usize);
    fn advance(&self, stage: &str);
    fn finish(&self, stage: &str);
}

/// Discards all progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn start(&self, _stage: &str, _total: usize) {}
    fn advance(&self, _stage: &str) {}
    fn finish(&self, _stage: &str) {}
}

/// Logs every tenth of a stage at `info`.
#[derive(Debug, Default)]
pub struct LogProgress {
    total: AtomicUsize,
    done: AtomicUsize,
}

impl LogProgress {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Progress for LogProgress {
    fn start(&self, stage: &str, total: usize) {
        self.total.store(total, Ordering::Relaxed);
        self.done.store(0, Ordering::Relaxed);
        info!(stage, total, "stage started");
    }

    fn advance(&self, stage: &str) {
        let done = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        let total = self.total.load(Ordering::Relaxed);
        let step = (total / 10).max(1);
        if done % step == 0 && done < total {
            info!(stage, done, total, "progress");
        }
    }

    fn finish(&self, stage: &str) {
        info!(
            stage,
            done = self.done.load(Ordering::Relaxed),
            total = self.total.load(Ordering::Relaxed),
            "stage finished"
        );
    }
}
