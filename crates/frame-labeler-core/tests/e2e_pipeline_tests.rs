use frame_labeler_core::inference::{EngineFactory, GenerationRequest, InferenceEngine};
use frame_labeler_core::storage::Database;
use frame_labeler_core::{AppConfig, Error, LabelPipeline, SilentReporter};
use std::fs;
use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Mutex;
use tempfile::{tempdir, TempDir};

/// Echoes the prompt back in front of a fixed label, like a raw decoder does.
struct EchoEngine {
    device: usize,
    panic_after: Option<usize>,
    calls: usize,
}

impl InferenceEngine for EchoEngine {
    fn generate(&mut self, request: &GenerationRequest<'_>) -> Result<String, Error> {
        self.calls += 1;
        if let Some(limit) = self.panic_after {
            if self.calls > limit {
                panic!("device {} fell over", self.device);
            }
        }
        Ok(format!(
            "{}\ncup, ball ({}x{})",
            request.prompt,
            request.image.width(),
            request.image.height()
        ))
    }
}

#[derive(Default)]
struct MockFactory {
    unavailable: Vec<usize>,
    panicking: Vec<usize>,
    acquired: Mutex<Vec<usize>>,
}

impl EngineFactory for MockFactory {
    fn acquire(&self, device: usize) -> Result<Box<dyn InferenceEngine>, Error> {
        self.acquired.lock().unwrap().push(device);
        if self.unavailable.contains(&device) {
            return Err(Error::DeviceAcquisition {
                device,
                reason: "out of memory".to_string(),
            });
        }
        let panic_after = self.panicking.contains(&device).then_some(1);
        Ok(Box::new(EchoEngine {
            device,
            panic_after,
            calls: 0,
        }))
    }
}

struct Fixture {
    _tmp: TempDir,
    config: AppConfig,
}

/// `good` valid frames split across two sessions plus `bad` undecodable ones.
fn fixture(good: usize, bad: usize, devices: usize) -> Fixture {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("frames");
    fs::create_dir_all(&root).unwrap();

    for i in 0..good {
        let session = if i % 2 == 0 { "sessionA" } else { "sessionB" };
        let path = root.join(format!("{}_frame{:03}.png", session, i));
        image::RgbImage::from_pixel(6, 5, image::Rgb([i as u8, 0, 0]))
            .save(&path)
            .unwrap();
    }
    for i in 0..bad {
        fs::write(root.join(format!("broken_frame{:03}.jpg", i)), b"not an image").unwrap();
    }

    let mut config = AppConfig::new(root.to_str().unwrap());
    config.device_count = devices;
    config.db_path = tmp
        .path()
        .join("labels.db")
        .to_string_lossy()
        .into_owned();
    config.check_threads = Some(2);
    Fixture { _tmp: tmp, config }
}

#[test]
fn test_full_pipeline_labels_every_clean_frame() {
    let fx = fixture(10, 2, 3);
    let pipeline = LabelPipeline::new(fx.config.clone());
    let factory = MockFactory::default();

    let summary = pipeline.run(&factory, &SilentReporter).unwrap();

    assert_eq!(summary.files_clean, 10);
    assert_eq!(summary.files_relocated, 2);
    assert_eq!(summary.total_items, 10);
    assert_eq!(summary.inserted, 10);
    assert_eq!(summary.duplicates, 0);
    assert_eq!(summary.skipped, 0);
    assert!(summary.failed_workers.is_empty());

    let mut shard_sizes: Vec<(usize, usize)> = summary
        .workers
        .iter()
        .map(|w| (w.rank, w.shard_len))
        .collect();
    shard_sizes.sort();
    assert_eq!(shard_sizes, vec![(0, 3), (1, 3), (2, 4)]);

    let quarantine = Path::new(&fx.config.input_path).join("corrupt_images");
    assert!(quarantine.join("broken_frame000.jpg").exists());
    assert!(quarantine.join("broken_frame001.jpg").exists());

    let db = Database::open(&fx.config.db_path).unwrap();
    assert_eq!(db.count_labels().unwrap(), 10);
    let label = db.get_label("sessionA", "frame004").unwrap().unwrap();
    assert_eq!(label.label_text, "cup, ball (6x5)");
    assert!(db.get_label("broken", "frame000").unwrap().is_none());

    let run = db.get_run(summary.run_id).unwrap().unwrap();
    assert_eq!(run.status, "completed");
    assert_eq!(run.items_processed, 10);
    assert_eq!(run.files_relocated, 2);
}

#[test]
fn test_rerun_inserts_nothing_new() {
    let fx = fixture(7, 0, 2);
    let factory = MockFactory::default();

    let first = LabelPipeline::new(fx.config.clone())
        .run(&factory, &SilentReporter)
        .unwrap();
    assert_eq!(first.inserted, 7);

    let second = LabelPipeline::new(fx.config.clone())
        .run(&factory, &SilentReporter)
        .unwrap();
    assert_eq!(second.total_items, 7);
    assert_eq!(second.inserted, 0);
    assert_eq!(second.duplicates, 7);

    let db = Database::open(&fx.config.db_path).unwrap();
    assert_eq!(db.count_labels().unwrap(), 7);
}

#[test]
fn test_failed_device_does_not_stop_other_workers() {
    let fx = fixture(9, 0, 3);
    let factory = MockFactory {
        unavailable: vec![1],
        ..MockFactory::default()
    };

    let summary = LabelPipeline::new(fx.config.clone())
        .run(&factory, &SilentReporter)
        .unwrap();

    assert_eq!(summary.failed_workers.len(), 1);
    assert_eq!(summary.failed_workers[0].0, 1);
    assert!(summary.failed_workers[0].1.contains("out of memory"));
    assert_eq!(summary.workers.len(), 2);
    assert_eq!(summary.total_items, 6);

    let db = Database::open(&fx.config.db_path).unwrap();
    assert_eq!(db.count_labels().unwrap(), 6);
    assert_eq!(db.get_run(summary.run_id).unwrap().unwrap().status, "partial");
}

#[test]
fn test_panicking_worker_is_isolated() {
    let fx = fixture(8, 0, 2);
    let factory = MockFactory {
        panicking: vec![0],
        ..MockFactory::default()
    };

    let summary = LabelPipeline::new(fx.config.clone())
        .run(&factory, &SilentReporter)
        .unwrap();

    assert_eq!(summary.failed_workers.len(), 1);
    assert_eq!(summary.failed_workers[0].0, 0);
    assert!(summary.failed_workers[0].1.contains("fell over"));
    assert_eq!(summary.total_items, 4);

    // the first item of the panicking shard was stored before the panic
    let db = Database::open(&fx.config.db_path).unwrap();
    assert_eq!(db.count_labels().unwrap(), 5);
}

#[test]
fn test_empty_shards_never_acquire_a_device() {
    let fx = fixture(2, 0, 4);
    let factory = MockFactory::default();

    let summary = LabelPipeline::new(fx.config.clone())
        .run(&factory, &SilentReporter)
        .unwrap();

    assert_eq!(summary.total_items, 2);
    assert_eq!(summary.workers.len(), 4);
    assert_eq!(*factory.acquired.lock().unwrap(), vec![3]);
}

#[test]
fn test_invalid_device_count_aborts_before_side_effects() {
    let mut fx = fixture(3, 1, 1);
    fx.config.device_count = 0;
    let factory = MockFactory::default();

    let result = LabelPipeline::new(fx.config.clone()).run(&factory, &SilentReporter);

    assert!(matches!(result, Err(Error::Configuration(_))));
    assert!(!Path::new(&fx.config.db_path).exists());
    assert!(!Path::new(&fx.config.input_path)
        .join("corrupt_images")
        .exists());
    assert!(Path::new(&fx.config.input_path)
        .join("broken_frame000.jpg")
        .exists());
    assert!(factory.acquired.lock().unwrap().is_empty());
}

#[test]
fn test_missing_input_dir_aborts() {
    let mut fx = fixture(0, 0, 1);
    fx.config.input_path = Path::new(&fx.config.input_path)
        .join("missing")
        .to_string_lossy()
        .into_owned();

    let result = LabelPipeline::new(fx.config.clone()).run(&MockFactory::default(), &SilentReporter);
    assert!(matches!(result, Err(Error::Configuration(_))));
}

#[test]
fn test_cancelled_run_labels_nothing() {
    let fx = fixture(6, 0, 2);
    let pipeline = LabelPipeline::new(fx.config.clone());
    pipeline.cancel_flag().store(true, Ordering::Relaxed);

    let summary = pipeline.run(&MockFactory::default(), &SilentReporter).unwrap();

    assert!(summary.cancelled);
    assert_eq!(summary.total_items, 0);
    let db = Database::open(&fx.config.db_path).unwrap();
    assert_eq!(db.count_labels().unwrap(), 0);
    assert_eq!(db.get_run(summary.run_id).unwrap().unwrap().status, "cancelled");
}

#[test]
fn test_triage_only_leaves_database_alone() {
    let fx = fixture(4, 3, 2);
    let report = LabelPipeline::new(fx.config.clone())
        .triage(&SilentReporter)
        .unwrap();

    assert_eq!(report.clean.len(), 4);
    assert_eq!(report.relocated_count(), 3);
    assert!(!Path::new(&fx.config.db_path).exists());
}

#[test]
fn test_cancel_before_triage_quarantines_nothing() {
    let fx = fixture(4, 2, 2);
    let pipeline = LabelPipeline::new(fx.config.clone());
    pipeline.cancel_flag().store(true, Ordering::Relaxed);
    let factory = MockFactory::default();

    let summary = pipeline.run(&factory, &SilentReporter).unwrap();

    assert!(summary.cancelled);
    assert_eq!(summary.files_relocated, 0);
    assert!(summary.workers.is_empty());
    assert!(factory.acquired.lock().unwrap().is_empty());
    assert!(Path::new(&fx.config.input_path)
        .join("broken_frame000.jpg")
        .exists());
}

#[test]
fn test_every_worker_failing_is_reported() {
    let fx = fixture(4, 0, 2);
    let factory = MockFactory {
        unavailable: vec![0, 1],
        ..MockFactory::default()
    };

    let summary = LabelPipeline::new(fx.config.clone())
        .run(&factory, &SilentReporter)
        .unwrap();

    assert!(summary.all_workers_failed());
    assert_eq!(summary.failed_workers.len(), 2);
    assert_eq!(summary.total_items, 0);

    let db = Database::open(&fx.config.db_path).unwrap();
    assert_eq!(db.get_run(summary.run_id).unwrap().unwrap().status, "partial");
}

#[test]
fn test_partial_failure_is_not_total_failure() {
    let fx = fixture(4, 0, 2);
    let factory = MockFactory {
        unavailable: vec![0],
        ..MockFactory::default()
    };

    let summary = LabelPipeline::new(fx.config.clone())
        .run(&factory, &SilentReporter)
        .unwrap();

    assert!(!summary.all_workers_failed());
}

#[test]
fn test_same_identity_across_extensions_keeps_one_label() {
    let fx = fixture(0, 0, 1);
    let root = Path::new(&fx.config.input_path);
    image::RgbImage::from_pixel(6, 5, image::Rgb([1, 2, 3]))
        .save(root.join("sessionA_frame007.png"))
        .unwrap();
    image::RgbImage::from_pixel(9, 4, image::Rgb([4, 5, 6]))
        .save(root.join("sessionA_frame007.jpg"))
        .unwrap();

    let summary = LabelPipeline::new(fx.config.clone())
        .run(&MockFactory::default(), &SilentReporter)
        .unwrap();

    assert_eq!(summary.identity_clashes, 1);
    assert_eq!(summary.inserted, 1);
    assert_eq!(summary.duplicates, 1);

    // sorted by path, the .jpg is labeled first
    let db = Database::open(&fx.config.db_path).unwrap();
    let label = db.get_label("sessionA", "frame007").unwrap().unwrap();
    assert_eq!(label.label_text, "cup, ball (9x4)");
}
