use colored::*;
use frame_labeler_core::{ProgressReporter, ProgressState};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

/// CLI progress reporter using indicatif progress bars.
///
/// - Triage phase: one bar over all candidate files
/// - Labeling phase: one bar per device rank, showing the last file seen
pub struct CliReporter {
    multi: MultiProgress,
    triage: Mutex<Option<ProgressBar>>,
    workers: Mutex<BTreeMap<usize, ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            triage: Mutex::new(None),
            workers: Mutex::new(BTreeMap::new()),
        }
    }

    fn with_worker_bar(&self, rank: usize, f: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.workers.lock() {
            if let Some(pb) = guard.get(&rank) {
                f(pb);
            }
        }
    }
}

fn bar_style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("━╸─")
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
}

impl ProgressReporter for CliReporter {
    fn on_triage_start(&self, total_files: usize) {
        let pb = self.multi.add(ProgressBar::new(total_files as u64));
        pb.set_style(bar_style(
            "  {spinner:.cyan} Checking for corrupt images [{bar:30.cyan/dim}] {pos}/{len} files ({eta} remaining)",
        ));
        pb.enable_steady_tick(Duration::from_millis(80));
        if let Ok(mut guard) = self.triage.lock() {
            *guard = Some(pb);
        }
    }

    fn on_triage_progress(&self, checked: usize, _total_files: usize) {
        if let Ok(guard) = self.triage.lock() {
            if let Some(pb) = guard.as_ref() {
                pb.set_position(checked as u64);
            }
        }
    }

    fn on_triage_complete(&self, clean: usize, relocated: usize, duration_secs: f64) {
        if let Ok(mut guard) = self.triage.lock() {
            if let Some(pb) = guard.take() {
                pb.finish_and_clear();
            }
        }
        let _ = self
            .multi
            .println(triage_complete_line(clean, relocated, duration_secs));
    }

    fn on_worker_start(&self, rank: usize, shard_len: usize) {
        let pb = self.multi.add(ProgressBar::new(shard_len as u64));
        pb.set_style(bar_style(
            "{prefix:>10}: |{bar:30.cyan/dim}| {percent:>3}% [{pos}/{len}, {per_sec}] {msg}",
        ));
        pb.set_prefix(format!("Device {}", rank));
        if let Ok(mut guard) = self.workers.lock() {
            guard.insert(rank, pb);
        }
    }

    fn on_worker_progress(&self, state: &ProgressState) {
        self.with_worker_bar(state.rank, |pb| {
            pb.set_position(state.attempted() as u64);
            if let Some(last) = &state.last_item {
                pb.set_message(format!("Last File: {}", last));
            }
        });
    }

    fn on_worker_complete(&self, state: &ProgressState) {
        self.with_worker_bar(state.rank, |pb| {
            pb.finish_with_message(format!(
                "{} labeled, {} skipped in {:.2}s",
                state.processed,
                state.skipped,
                state.elapsed().as_secs_f64()
            ));
        });
    }

    fn on_worker_failed(&self, rank: usize, reason: &str) {
        self.with_worker_bar(rank, |pb| {
            pb.abandon_with_message(worker_failed_message(reason));
        });
    }
}

fn triage_complete_line(clean: usize, relocated: usize, duration_secs: f64) -> String {
    format!(
        "  {} Triage complete: {} clean, {} quarantined in {:.2}s",
        "✓".green(),
        clean,
        relocated,
        duration_secs
    )
}

fn worker_failed_message(reason: &str) -> String {
    format!("{}: {}", "failed".red(), reason)
}
