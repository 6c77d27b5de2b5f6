use crate::config::AppConfig;
use crate::error::Error;
use crate::inference::EngineFactory;
use crate::progress::ProgressReporter;
use crate::scanner::{self, ImageFile, TriageReport};
use crate::shard::{self, Shard};
use crate::storage::Database;
use crate::worker::{self, WorkerContext, WorkerOutcome};
use std::any::Any;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

pub struct LabelPipeline {
    config: AppConfig,
    cancel: Arc<AtomicBool>,
}

#[derive(Debug, Default)]
pub struct PipelineSummary {
    pub run_id: i64,
    pub files_clean: usize,
    pub files_relocated: usize,
    pub move_failures: usize,
    /// Clean files whose `(series_id, item_id)` was already taken by another file.
    pub identity_clashes: usize,
    /// Items labeled and submitted to the store by workers that finished.
    pub total_items: usize,
    pub inserted: usize,
    pub duplicates: usize,
    pub skipped: usize,
    pub workers: Vec<WorkerOutcome>,
    pub failed_workers: Vec<(usize, String)>,
    pub cancelled: bool,
    pub triage_duration: Duration,
    pub label_duration: Duration,
    pub elapsed: Duration,
}

impl PipelineSummary {
    /// True when workers were started and none of them finished.
    pub fn all_workers_failed(&self) -> bool {
        self.workers.is_empty() && !self.failed_workers.is_empty()
    }
}

impl LabelPipeline {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Setting this flag stops triage before its next check or move and every
    /// worker before its next item.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Run only the corruption filter.
    pub fn triage(&self, reporter: &dyn ProgressReporter) -> Result<TriageReport, Error> {
        self.config.validate()?;
        scanner::scan(&self.config, reporter, &self.cancel)
    }

    /// Full pipeline: triage, plan shards, one worker per device, join, summarize.
    pub fn run(
        &self,
        factory: &dyn EngineFactory,
        reporter: &dyn ProgressReporter,
    ) -> Result<PipelineSummary, Error> {
        let start = Instant::now();
        self.config.validate()?;

        let db = Database::open(&self.config.db_path)?;
        let run_id = db.create_run(&self.config.input_path, self.config.device_count)?;

        let triage = match scanner::scan(&self.config, reporter, &self.cancel) {
            Ok(triage) => triage,
            Err(err) => {
                db.complete_run(run_id, "failed", 0, 0, 0)?;
                return Err(err);
            }
        };

        let mut files = triage.clean;
        files.sort_by(|a, b| a.path.cmp(&b.path));
        let clashes = scanner::identity_clashes(&files);
        for (first, other) in &clashes {
            warn!(
                "{} and {} share identity ({}, {}); only one label will be kept",
                first.path.display(),
                other.path.display(),
                other.series_id,
                other.item_id
            );
        }
        let identity_clashes = clashes.len();

        if triage.cancelled {
            db.complete_run(run_id, "cancelled", 0, 0, triage.relocated.len())?;
            return Ok(PipelineSummary {
                run_id,
                files_clean: files.len(),
                files_relocated: triage.relocated.len(),
                move_failures: triage.move_failures.len(),
                identity_clashes,
                cancelled: true,
                triage_duration: triage.duration,
                elapsed: start.elapsed(),
                ..PipelineSummary::default()
            });
        }

        let shards = shard::plan(files.len(), self.config.device_count)?;
        info!(
            "Processing {} images using {} devices...",
            files.len(),
            self.config.device_count
        );
        for shard in &shards {
            debug!("Rank {} owns items [{}, {})", shard.rank, shard.start, shard.end);
        }

        let label_start = Instant::now();
        let results = self.spawn_workers(&files, &shards, factory, reporter);
        let label_duration = label_start.elapsed();

        let mut summary = PipelineSummary {
            run_id,
            files_clean: files.len(),
            files_relocated: triage.relocated.len(),
            move_failures: triage.move_failures.len(),
            identity_clashes,
            triage_duration: triage.duration,
            label_duration,
            ..PipelineSummary::default()
        };

        for (rank, result) in results {
            match result {
                Ok(outcome) => {
                    summary.total_items += outcome.processed;
                    summary.inserted += outcome.inserted;
                    summary.duplicates += outcome.duplicates;
                    summary.skipped += outcome.skipped;
                    summary.cancelled |= outcome.cancelled;
                    summary.workers.push(outcome);
                }
                Err(reason) => {
                    error!("Worker {} failed: {}", rank, reason);
                    reporter.on_worker_failed(rank, &reason);
                    summary.failed_workers.push((rank, reason));
                }
            }
        }

        let status = if summary.cancelled {
            "cancelled"
        } else if summary.failed_workers.is_empty() {
            "completed"
        } else {
            warn!("{} of {} workers failed", summary.failed_workers.len(), shards.len());
            "partial"
        };
        db.complete_run(
            run_id,
            status,
            summary.total_items,
            summary.inserted,
            summary.files_relocated,
        )?;

        summary.elapsed = start.elapsed();
        info!(
            "Total processing time: {:.2} seconds",
            summary.elapsed.as_secs_f64()
        );
        Ok(summary)
    }

    /// One thread per shard, each owning its engine and store connection.
    /// Returns once every worker has joined, in rank order.
    fn spawn_workers(
        &self,
        files: &[ImageFile],
        shards: &[Shard],
        factory: &dyn EngineFactory,
        reporter: &dyn ProgressReporter,
    ) -> Vec<(usize, Result<WorkerOutcome, String>)> {
        let db_path = self.config.db_path.as_str();
        let params = self.config.inference.decoding_params();
        let cancel: &AtomicBool = &self.cancel;

        thread::scope(|s| {
            let handles: Vec<_> = shards
                .iter()
                .map(|shard| {
                    let ctx = WorkerContext {
                        rank: shard.rank,
                        items: shard.slice(files),
                        params,
                        reporter,
                        cancel,
                    };
                    let spawned = thread::Builder::new()
                        .name(format!("labeler-{}", shard.rank))
                        .spawn_scoped(s, move || -> Result<WorkerOutcome, Error> {
                            let store = Database::open(db_path)?;
                            worker::run(&ctx, factory, &store)
                        });
                    (shard.rank, spawned)
                })
                .collect();

            handles
                .into_iter()
                .map(|(rank, spawned)| {
                    let result = match spawned {
                        Ok(handle) => match handle.join() {
                            Ok(Ok(outcome)) => Ok(outcome),
                            Ok(Err(err)) => Err(err.to_string()),
                            Err(payload) => Err(panic_message(payload)),
                        },
                        Err(err) => Err(format!("could not spawn worker thread: {}", err)),
                    };
                    (rank, result)
                })
                .collect()
        })
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("worker panicked: {}", msg)
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("worker panicked: {}", msg)
    } else {
        "worker panicked".to_string()
    }
}
