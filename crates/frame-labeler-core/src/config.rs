use crate::error::Error;
use crate::inference::DecodingParams;
use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub input_path: String,
    #[serde(default = "default_quarantine_dir")]
    pub quarantine_dir: String,
    #[serde(default = "default_device_count")]
    pub device_count: usize,
    #[serde(default = "default_db_path")]
    pub db_path: String,
    #[serde(default = "default_image_extensions")]
    pub image_extensions: Vec<String>,
    #[serde(default = "default_id_separator")]
    pub id_separator: String,
    /// Thread count for the corruption check. Defaults to available CPU parallelism.
    #[serde(default)]
    pub check_threads: Option<usize>,
    #[serde(default)]
    pub inference: InferenceConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InferenceConfig {
    /// One server URL per device rank.
    #[serde(default)]
    pub endpoints: Vec<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_max_new_tokens")]
    pub max_new_tokens: u32,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

fn default_quarantine_dir() -> String {
    "corrupt_images".to_string()
}

fn default_device_count() -> usize {
    1
}

fn default_db_path() -> String {
    "ImageContents.db".to_string()
}

fn default_image_extensions() -> Vec<String> {
    vec!["png".to_string(), "jpg".to_string(), "jpeg".to_string()]
}

fn default_id_separator() -> String {
    "_".to_string()
}

fn default_model() -> String {
    "llama3.2-vision:11b".to_string()
}

fn default_temperature() -> f32 {
    1.0
}

fn default_top_p() -> f32 {
    0.9
}

fn default_max_new_tokens() -> u32 {
    512
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            endpoints: Vec::new(),
            model: default_model(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            max_new_tokens: default_max_new_tokens(),
            request_timeout_secs: None,
        }
    }
}

impl InferenceConfig {
    pub fn decoding_params(&self) -> DecodingParams {
        DecodingParams {
            temperature: self.temperature,
            top_p: self.top_p,
            max_new_tokens: self.max_new_tokens,
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

impl AppConfig {
    pub fn new(input_path: &str) -> Self {
        Self {
            input_path: input_path.to_string(),
            quarantine_dir: default_quarantine_dir(),
            device_count: default_device_count(),
            db_path: default_db_path(),
            image_extensions: default_image_extensions(),
            id_separator: default_id_separator(),
            check_threads: None,
            inference: InferenceConfig::default(),
        }
    }

    pub fn quarantine_path(&self) -> PathBuf {
        Path::new(&self.input_path).join(&self.quarantine_dir)
    }

    /// Pre-flight checks. Nothing on disk is touched before this passes.
    pub fn validate(&self) -> Result<(), Error> {
        if self.device_count == 0 {
            return Err(Error::Configuration(
                "device_count must be at least 1".to_string(),
            ));
        }
        if self.input_path.trim().is_empty() {
            return Err(Error::Configuration("input_path is required".to_string()));
        }
        let input = Path::new(&self.input_path);
        if !input.is_dir() {
            return Err(Error::Configuration(format!(
                "input path {} is not a readable directory",
                input.display()
            )));
        }
        if self.quarantine_dir.trim().is_empty() {
            return Err(Error::Configuration(
                "quarantine_dir must not be empty".to_string(),
            ));
        }
        if self.id_separator.is_empty() {
            return Err(Error::Configuration(
                "id_separator must not be empty".to_string(),
            ));
        }
        if self.image_extensions.is_empty() {
            return Err(Error::Configuration(
                "image_extensions must list at least one extension".to_string(),
            ));
        }
        Ok(())
    }

    /// The HTTP engine maps rank `r` to `inference.endpoints[r]`; every rank
    /// needs one before the run starts.
    pub fn validate_endpoints(&self) -> Result<(), Error> {
        let configured = self.inference.endpoints.len();
        if configured < self.device_count {
            return Err(Error::Configuration(format!(
                "{} devices requested but only {} inference endpoints configured",
                self.device_count, configured
            )));
        }
        Ok(())
    }
}

/// Load `Config.toml` (optional) and `LABELER__*` environment variables.
pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("Config").required(false))
        .add_source(
            Environment::with_prefix("LABELER")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("image_extensions")
                .with_list_parse_key("inference.endpoints"),
        )
        .build()?;
    builder.try_deserialize::<AppConfig>()
}
