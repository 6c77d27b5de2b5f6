use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Device {device} unavailable: {reason}")]
    DeviceAcquisition { device: usize, reason: String },

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("{0}")]
    Other(String),
}
