use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "frame-labeler")]
#[command(about = "Label head-camera frames across multiple devices", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub overrides: Overrides,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Values that take precedence over Config.toml and LABELER__* variables.
#[derive(Debug, Args)]
pub struct Overrides {
    /// Directory holding the extracted frames
    #[arg(long, global = true)]
    pub input_path: Option<String>,
    /// Number of devices, one worker each
    #[arg(long, global = true)]
    pub num_devices: Option<usize>,
    /// Quarantine folder name, created inside the input directory
    #[arg(long, global = true)]
    pub corrupt_folder: Option<String>,
    /// SQLite database file for labels
    #[arg(long, global = true)]
    pub db_path: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Quarantine corrupt frames, then label the rest on every device
    Process,
    /// Only quarantine corrupt frames
    Triage,
    /// Write all stored labels to a CSV file
    Export {
        #[arg(long, short)]
        output: PathBuf,
    },
    /// Display the number of labels in the database
    CountLabels,
    /// Print configuration values
    PrintConfig,
}
