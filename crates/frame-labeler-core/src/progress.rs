use std::time::{Duration, Instant};

/// Per-worker counters. Owned and mutated by exactly one worker; reporters only
/// ever see a shared reference.
#[derive(Debug, Clone)]
pub struct ProgressState {
    pub rank: usize,
    pub total: usize,
    pub processed: usize,
    pub inserted: usize,
    pub duplicates: usize,
    pub skipped: usize,
    pub last_item: Option<String>,
    started: Instant,
}

impl ProgressState {
    pub fn new(rank: usize, total: usize) -> Self {
        Self {
            rank,
            total,
            processed: 0,
            inserted: 0,
            duplicates: 0,
            skipped: 0,
            last_item: None,
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Items handled so far, whether labeled or skipped.
    pub fn attempted(&self) -> usize {
        self.processed + self.skipped
    }
}

/// Trait for reporting pipeline progress.
///
/// CLI implements with indicatif bars; tests use [`SilentReporter`].
/// All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_triage_start(&self, _total_files: usize) {}
    fn on_triage_progress(&self, _checked: usize, _total_files: usize) {}
    fn on_triage_complete(&self, _clean: usize, _relocated: usize, _duration_secs: f64) {}
    fn on_worker_start(&self, _rank: usize, _shard_len: usize) {}
    fn on_worker_progress(&self, _state: &ProgressState) {}
    fn on_worker_complete(&self, _state: &ProgressState) {}
    fn on_worker_failed(&self, _rank: usize, _reason: &str) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
