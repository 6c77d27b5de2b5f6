mod commands;
mod logging;
mod progress;

use std::path::Path;
use std::process;
use std::sync::atomic::Ordering;

use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands, Overrides};
use frame_labeler_core::export::export_labels_csv;
use frame_labeler_core::inference::HttpEngineFactory;
use frame_labeler_core::storage::Database;
use frame_labeler_core::{AppConfig, Error, LabelPipeline};
use dotenv::dotenv;
use progress::CliReporter;
use tracing::{error, info, warn};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    let guard = logging::init_logger();

    let args = Cli::parse();

    let mut config = match frame_labeler_core::config::load_configuration() {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            drop(guard);
            process::exit(1);
        }
    };
    apply_overrides(&mut config, args.overrides);

    let result = match args.command {
        Some(Commands::Process) => run_process(config),
        Some(Commands::Triage) => run_triage(config),
        Some(Commands::Export { output }) => run_export(&config, &output),
        Some(Commands::CountLabels) => run_count_labels(&config),
        Some(Commands::PrintConfig) => {
            println!("Configuration: {:#?}", config);
            Ok(())
        }
        None => {
            let _ = Cli::command().print_long_help();
            Ok(())
        }
    };

    if let Err(err) = result {
        error!("Error: {}", err);
        drop(guard);
        process::exit(1);
    }

    Ok(())
}

fn apply_overrides(config: &mut AppConfig, overrides: Overrides) {
    if let Some(input_path) = overrides.input_path {
        config.input_path = input_path;
    }
    if let Some(num_devices) = overrides.num_devices {
        config.device_count = num_devices;
    }
    if let Some(corrupt_folder) = overrides.corrupt_folder {
        config.quarantine_dir = corrupt_folder;
    }
    if let Some(db_path) = overrides.db_path {
        config.db_path = db_path;
    }
}

fn run_process(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting image labeling pipeline...");
    config.validate()?;
    config.validate_endpoints()?;
    let factory = HttpEngineFactory::new(&config.inference);
    let pipeline = LabelPipeline::new(config);

    // first Ctrl-C drains, second one exits
    let cancel = pipeline.cancel_flag();
    ctrlc::set_handler(move || {
        if cancel.swap(true, Ordering::SeqCst) {
            eprintln!("Interrupted again, exiting");
            process::exit(130);
        }
        warn!("Cancelling: finishing current items, press Ctrl-C again to exit now");
    })?;

    let reporter = CliReporter::new();
    let summary = pipeline.run(&factory, &reporter)?;

    println!();
    info!(
        "Triage: {}, Labeling: {}, Total: {}",
        format!("{:.2}s", summary.triage_duration.as_secs_f64()).green(),
        format!("{:.2}s", summary.label_duration.as_secs_f64()).green(),
        format!("{:.2}s", summary.elapsed.as_secs_f64()).green(),
    );
    info!(
        "{} images labeled ({} new, {} already stored), {} skipped, {} quarantined",
        format!("{}", summary.total_items).cyan(),
        format!("{}", summary.inserted).cyan(),
        format!("{}", summary.duplicates).cyan(),
        format!("{}", summary.skipped).yellow(),
        format!("{}", summary.files_relocated).red(),
    );
    if summary.move_failures > 0 {
        warn!(
            "{} corrupt images could not be quarantined",
            format!("{}", summary.move_failures).red()
        );
    }
    if summary.identity_clashes > 0 {
        warn!(
            "{} images share a (series, item) identity with another image and were not stored",
            format!("{}", summary.identity_clashes).yellow()
        );
    }
    for (rank, reason) in &summary.failed_workers {
        warn!("Device {} did not run: {}", rank, reason);
    }
    if summary.cancelled {
        warn!("Run was cancelled before every image was labeled");
    }

    if summary.all_workers_failed() {
        return Err(Error::Other(format!(
            "all {} workers failed, nothing was labeled",
            summary.failed_workers.len()
        ))
        .into());
    }
    Ok(())
}

fn run_triage(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let pipeline = LabelPipeline::new(config);
    let reporter = CliReporter::new();
    let report = pipeline.triage(&reporter)?;

    info!(
        "{} clean images, {} moved to {}",
        format!("{}", report.clean.len()).green(),
        format!("{}", report.relocated_count()).red(),
        pipeline.config().quarantine_path().display(),
    );
    for (path, reason) in &report.move_failures {
        warn!("Could not quarantine {}: {}", path.display(), reason);
    }
    Ok(())
}

fn run_export(config: &AppConfig, output: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open(&config.db_path)?;
    let written = export_labels_csv(&db, output)?;
    info!(
        "{} labels written to {}",
        format!("{}", written).green(),
        output.display()
    );
    Ok(())
}

fn run_count_labels(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open(&config.db_path)?;
    info!("Total labels in {}: {}", config.db_path, db.count_labels()?);
    Ok(())
}
