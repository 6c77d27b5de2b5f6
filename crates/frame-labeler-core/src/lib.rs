pub mod config;
pub mod error;
pub mod export;
pub mod inference;
pub mod pipeline;
pub mod progress;
pub mod scanner;
pub mod shard;
pub mod storage;
pub mod worker;

pub use config::AppConfig;
pub use error::Error;
pub use pipeline::{LabelPipeline, PipelineSummary};
pub use progress::{ProgressReporter, ProgressState, SilentReporter};
pub use scanner::ImageFile;
