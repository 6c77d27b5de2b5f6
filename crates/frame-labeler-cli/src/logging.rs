use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_LOG_FILE: &str = "logs/frame-labeler.log";

/// Pretty stdout layer plus a plain file layer at `LOG_FILE_PATH`. Worker
/// and triage threads are named, so both layers print thread names.
pub fn init_logger() -> impl Drop {
    let filter = env::var("TRACING_LEVEL").unwrap_or_else(|_| "info".to_string());
    let filter_layer = EnvFilter::new(filter);

    let log_file_path = env::var("LOG_FILE_PATH").unwrap_or_else(|_| DEFAULT_LOG_FILE.to_string());
    let (log_dir, log_file) = split_log_path(Path::new(&log_file_path));
    if let Err(err) = fs::create_dir_all(&log_dir) {
        eprintln!("Could not create log directory {}: {}", log_dir.display(), err);
    }

    let file_appender = tracing_appender::rolling::never(&log_dir, log_file);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stdout)
                .pretty()
                .with_file(false)
                .with_thread_names(true)
                .without_time()
                .with_ansi(true),
        )
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_thread_names(true)
                .with_ansi(false),
        )
        .with(filter_layer)
        .init();

    debug!("Logging to stdout and {}", log_file_path);

    guard
}

/// Directory and file name of a log path; a bare file name lives in `.`.
fn split_log_path(path: &Path) -> (PathBuf, OsString) {
    let file = path
        .file_name()
        .map(|f| f.to_os_string())
        .unwrap_or_else(|| OsString::from("frame-labeler.log"));
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    (dir, file)
}
