use super::{EngineFactory, GenerationRequest, InferenceEngine};
use crate::config::InferenceConfig;
use crate::error::Error;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::ImageFormat;
use reqwest::blocking::Client as HttpClient;
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::time::Duration;
use tracing::{debug, trace};

/// Hands out one [`HttpEngine`] per device, each talking to the model server
/// listed for that rank in `endpoints`.
pub struct HttpEngineFactory {
    endpoints: Vec<String>,
    model: String,
    timeout: Option<Duration>,
}

impl HttpEngineFactory {
    pub fn new(config: &InferenceConfig) -> Self {
        Self {
            endpoints: config
                .endpoints
                .iter()
                .map(|e| e.trim_end_matches('/').to_string())
                .collect(),
            model: config.model.clone(),
            timeout: config.request_timeout(),
        }
    }

    pub fn endpoint_for(&self, device: usize) -> Option<&str> {
        self.endpoints.get(device).map(|e| e.as_str())
    }
}

impl EngineFactory for HttpEngineFactory {
    fn acquire(&self, device: usize) -> Result<Box<dyn InferenceEngine>, Error> {
        let unavailable = |reason: String| Error::DeviceAcquisition { device, reason };

        let endpoint = self
            .endpoint_for(device)
            .ok_or_else(|| unavailable("no endpoint configured for this rank".to_string()))?
            .to_string();

        let client = HttpClient::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| unavailable(e.to_string()))?;

        client
            .get(format!("{}/api/tags", endpoint))
            .send()
            .and_then(|response| response.error_for_status())
            .map_err(|e| unavailable(e.to_string()))?;
        debug!("Device {} bound to {}", device, endpoint);

        Ok(Box::new(HttpEngine {
            client,
            endpoint,
            model: self.model.clone(),
        }))
    }
}

pub struct HttpEngine {
    client: HttpClient,
    endpoint: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct GenerateBody<'a> {
    model: &'a str,
    prompt: &'a str,
    images: Vec<String>,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    top_p: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateReply {
    response: String,
}

impl InferenceEngine for HttpEngine {
    fn generate(&mut self, request: &GenerationRequest<'_>) -> Result<String, Error> {
        let mut png = Vec::new();
        request
            .image
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;

        let body = GenerateBody {
            model: &self.model,
            prompt: request.prompt,
            images: vec![STANDARD.encode(&png)],
            stream: false,
            options: GenerateOptions {
                temperature: request.params.temperature,
                top_p: request.params.top_p,
                num_predict: request.params.max_new_tokens,
            },
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.endpoint))
            .json(&body)
            .send()?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().unwrap_or_default();
            return Err(Error::Inference(format!("{} returned {}: {}", self.endpoint, status, text)));
        }

        let reply: GenerateReply = response.json()?;
        trace!("{} generated {} bytes", self.endpoint, reply.response.len());
        Ok(reply.response)
    }
}
