pub mod http;
pub mod prompt;

use crate::error::Error;
use image::DynamicImage;
use std::path::Path;

pub use http::{HttpEngine, HttpEngineFactory};
pub use prompt::LABELING_INSTRUCTIONS;

/// Sampling settings passed with every generation call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodingParams {
    pub temperature: f32,
    pub top_p: f32,
    pub max_new_tokens: u32,
}

impl Default for DecodingParams {
    fn default() -> Self {
        Self {
            temperature: 1.0,
            top_p: 0.9,
            max_new_tokens: 512,
        }
    }
}

/// One multi-modal request: the image followed by the instruction text.
pub struct GenerationRequest<'a> {
    pub image: &'a DynamicImage,
    pub prompt: &'a str,
    pub params: &'a DecodingParams,
}

/// A vision-language model bound to a single device.
pub trait InferenceEngine {
    /// Returns the decoded model output. Engines may echo the prompt in front
    /// of the continuation; see [`extract_continuation`].
    fn generate(&mut self, request: &GenerationRequest<'_>) -> Result<String, Error>;
}

/// Builds one engine per worker. Construction is expensive, so workers call
/// `acquire` once and reuse the engine for their whole shard.
pub trait EngineFactory: Send + Sync {
    fn acquire(&self, device: usize) -> Result<Box<dyn InferenceEngine>, Error>;
}

/// Decode an image from disk and normalize it to RGB.
pub fn load_image(path: &Path) -> Result<DynamicImage, Error> {
    let image = image::open(path)?;
    Ok(DynamicImage::ImageRgb8(image.to_rgb8()))
}

/// The part of `output` strictly after `prompt`. Outputs that do not start
/// with the prompt are already bare continuations.
pub fn extract_continuation(prompt: &str, output: &str) -> String {
    output
        .strip_prefix(prompt)
        .unwrap_or(output)
        .trim()
        .to_string()
}
