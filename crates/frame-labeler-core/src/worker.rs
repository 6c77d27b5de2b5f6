use crate::error::Error;
use crate::inference::{
    self, DecodingParams, EngineFactory, GenerationRequest, LABELING_INSTRUCTIONS,
};
use crate::progress::{ProgressReporter, ProgressState};
use crate::scanner::ImageFile;
use crate::storage::{Database, LabelRecord};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// What one worker did with its shard.
#[derive(Debug, Clone, Default)]
pub struct WorkerOutcome {
    pub rank: usize,
    pub shard_len: usize,
    /// Items that made it through inference and were submitted to the store.
    pub processed: usize,
    pub inserted: usize,
    pub duplicates: usize,
    /// Items dropped because of a load, inference or store failure.
    pub skipped: usize,
    pub cancelled: bool,
    pub elapsed: Duration,
}

/// Everything a worker needs besides its engine and its store handle, which
/// it builds itself.
pub struct WorkerContext<'a> {
    pub rank: usize,
    pub items: &'a [ImageFile],
    pub params: DecodingParams,
    pub reporter: &'a dyn ProgressReporter,
    pub cancel: &'a AtomicBool,
}

/// Label every item of the shard in order. Only failing to bind the engine
/// to the device is an error; per-item failures are logged and counted.
pub fn run(
    ctx: &WorkerContext<'_>,
    factory: &dyn EngineFactory,
    store: &Database,
) -> Result<WorkerOutcome, Error> {
    let mut state = ProgressState::new(ctx.rank, ctx.items.len());
    ctx.reporter.on_worker_start(ctx.rank, ctx.items.len());

    if ctx.items.is_empty() {
        debug!("Worker {} has an empty shard", ctx.rank);
        ctx.reporter.on_worker_complete(&state);
        return Ok(outcome(&state, false));
    }

    let mut engine = factory.acquire(ctx.rank)?;
    info!("Worker {} labeling {} images", ctx.rank, ctx.items.len());

    let mut cancelled = false;
    for file in ctx.items {
        if ctx.cancel.load(Ordering::Relaxed) {
            warn!(
                "Worker {} cancelled after {} of {} images",
                ctx.rank,
                state.attempted(),
                state.total
            );
            cancelled = true;
            break;
        }

        match label_one(file, engine.as_mut(), &ctx.params) {
            Ok(label_text) => {
                let record = LabelRecord {
                    series_id: file.series_id.clone(),
                    item_id: file.item_id.clone(),
                    label_text,
                };
                match store.insert_if_absent(&record) {
                    Ok(true) => {
                        state.processed += 1;
                        state.inserted += 1;
                    }
                    Ok(false) => {
                        debug!(
                            "Label for ({}, {}) already stored",
                            record.series_id, record.item_id
                        );
                        state.processed += 1;
                        state.duplicates += 1;
                    }
                    Err(err) => {
                        warn!("Error storing label for {}: {}", file.path.display(), err);
                        state.skipped += 1;
                    }
                }
            }
            Err(err) => {
                warn!("Skipping {}: {}", file.path.display(), err);
                state.skipped += 1;
            }
        }

        state.last_item = Some(file.file_name());
        ctx.reporter.on_worker_progress(&state);
    }

    debug!(
        "Worker {} finished in {:.2}s: {} processed, {} inserted, {} skipped",
        ctx.rank,
        state.elapsed().as_secs_f64(),
        state.processed,
        state.inserted,
        state.skipped
    );
    ctx.reporter.on_worker_complete(&state);
    Ok(outcome(&state, cancelled))
}

fn label_one(
    file: &ImageFile,
    engine: &mut dyn inference::InferenceEngine,
    params: &DecodingParams,
) -> Result<String, Error> {
    let image = inference::load_image(&file.path)?;
    let request = GenerationRequest {
        image: &image,
        prompt: LABELING_INSTRUCTIONS,
        params,
    };
    let output = engine.generate(&request)?;
    Ok(inference::extract_continuation(LABELING_INSTRUCTIONS, &output))
}

fn outcome(state: &ProgressState, cancelled: bool) -> WorkerOutcome {
    WorkerOutcome {
        rank: state.rank,
        shard_len: state.total,
        processed: state.processed,
        inserted: state.inserted,
        duplicates: state.duplicates,
        skipped: state.skipped,
        cancelled,
        elapsed: state.elapsed(),
    }
}
