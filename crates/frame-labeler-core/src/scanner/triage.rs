use super::walk;
use super::ImageFile;
use crate::config::AppConfig;
use crate::error::Error;
use crate::progress::ProgressReporter;
use image::{ImageError, ImageReader};
use rayon::prelude::*;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Outcome of the corruption filter.
#[derive(Debug, Default)]
pub struct TriageReport {
    /// Decodable files, in enumeration order.
    pub clean: Vec<ImageFile>,
    /// Quarantine destinations of the files that failed to decode.
    pub relocated: Vec<PathBuf>,
    /// Corrupt files that could not be moved, with the reason.
    pub move_failures: Vec<(PathBuf, String)>,
    /// Files left untouched because cancellation arrived first.
    pub unchecked: usize,
    pub cancelled: bool,
    pub duration: Duration,
}

impl TriageReport {
    pub fn relocated_count(&self) -> usize {
        self.relocated.len()
    }
}

/// Scan `config.input_path`, decode every candidate on a CPU-sized thread
/// pool, move the undecodable ones into the quarantine directory and return
/// the survivors. Once `cancel` is set the remaining checks and moves are
/// skipped; unchecked files are neither clean nor quarantined.
pub fn scan(
    config: &AppConfig,
    reporter: &dyn ProgressReporter,
    cancel: &AtomicBool,
) -> Result<TriageReport, Error> {
    let start = Instant::now();
    let input = Path::new(&config.input_path);
    let quarantine = config.quarantine_path();

    let candidates = walk::list_image_files(input, &config.image_extensions)?;
    let total = candidates.len();
    info!("Checking {} images for corruption...", total);
    reporter.on_triage_start(total);

    let verdicts = check_all(&candidates, config.check_threads, reporter, cancel)?;

    let mut report = TriageReport::default();
    let mut corrupt: Vec<PathBuf> = Vec::new();
    for (path, verdict) in candidates.iter().zip(verdicts) {
        match verdict {
            Some(true) => corrupt.push(path.clone()),
            Some(false) => report
                .clean
                .push(ImageFile::from_path(path, &config.id_separator)),
            None => report.unchecked += 1,
        }
    }

    fs::create_dir_all(&quarantine)?;
    for (moved, path) in corrupt.iter().enumerate() {
        if cancel.load(Ordering::Relaxed) {
            report.unchecked += corrupt.len() - moved;
            break;
        }
        match move_to_quarantine(path, &quarantine) {
            Ok(dest) => {
                debug!("Quarantined {} -> {}", path.display(), dest.display());
                report.relocated.push(dest);
            }
            Err(err) => {
                error!("Error moving corrupt image {}: {}", path.display(), err);
                report.move_failures.push((path.clone(), err.to_string()));
            }
        }
    }

    if report.unchecked > 0 {
        report.cancelled = true;
        warn!("Triage cancelled with {} files left unchecked", report.unchecked);
    }

    report.duration = start.elapsed();
    info!(
        "Moved {} corrupt images to {}",
        report.relocated_count(),
        quarantine.display()
    );
    reporter.on_triage_complete(
        report.clean.len(),
        report.relocated_count(),
        report.duration.as_secs_f64(),
    );

    Ok(report)
}

/// Decode-check every path in parallel. The returned verdicts line up with
/// `paths` index for index regardless of completion order; `None` marks a
/// path skipped after `cancel` was set.
pub fn check_all(
    paths: &[PathBuf],
    threads: Option<usize>,
    reporter: &dyn ProgressReporter,
    cancel: &AtomicBool,
) -> Result<Vec<Option<bool>>, Error> {
    let threads = threads.unwrap_or_else(default_parallelism).max(1);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("triage-{}", i))
        .build()
        .map_err(|e| Error::Other(format!("Failed to build triage pool: {}", e)))?;

    let total = paths.len();
    let checked = AtomicUsize::new(0);
    pool.install(|| {
        paths
            .par_iter()
            .map(|path| -> Result<Option<bool>, Error> {
                if cancel.load(Ordering::Relaxed) {
                    return Ok(None);
                }
                let verdict = is_corrupt(path)?;
                let done = checked.fetch_add(1, Ordering::Relaxed) + 1;
                reporter.on_triage_progress(done, total);
                Ok(Some(verdict))
            })
            .collect()
    })
}

/// `Ok(true)` when the file cannot be read, is structurally malformed, or is
/// in a format nobody recognizes. Any other decoder failure is returned as an
/// error since it points at the environment rather than the file.
pub fn is_corrupt(path: &Path) -> Result<bool, Error> {
    match decode(path) {
        Ok(()) => Ok(false),
        Err(ImageError::IoError(_))
        | Err(ImageError::Decoding(_))
        | Err(ImageError::Unsupported(_)) => Ok(true),
        Err(other) => Err(Error::Image(other)),
    }
}

fn decode(path: &Path) -> Result<(), ImageError> {
    let reader = ImageReader::open(path)?.with_guessed_format()?;
    reader.decode()?;
    Ok(())
}

fn move_to_quarantine(path: &Path, quarantine: &Path) -> io::Result<PathBuf> {
    let file_name = path.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} has no file name", path.display()),
        )
    })?;
    let dest = unique_destination(quarantine, Path::new(file_name));

    if fs::rename(path, &dest).is_err() {
        // rename cannot cross filesystems
        fs::copy(path, &dest)?;
        fs::remove_file(path)?;
    }
    Ok(dest)
}

/// `quarantine/name`, or `quarantine/stem-N.ext` with the lowest free `N`
/// when that name is already taken.
fn unique_destination(quarantine: &Path, file_name: &Path) -> PathBuf {
    let dest = quarantine.join(file_name);
    if !dest.exists() {
        return dest;
    }
    let stem = file_name
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = file_name
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    (1..)
        .map(|n| quarantine.join(format!("{stem}-{n}{ext}")))
        .find(|candidate| !candidate.exists())
        .unwrap_or(dest)
}

fn default_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
