//! Stability AI text-to-image client
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use log::{debug, info, warn};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::core::Config;

/// Failure modes of a single generation call
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("prompt is empty")]
    EmptyPrompt,

    #[error("request to generation service failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("generation service returned HTTP {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("generation service returned malformed JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("no artifacts found in the response")]
    NoArtifacts,

    #[error("first artifact has no base64 image data")]
    MissingBase64,

    #[error("artifact base64 could not be decoded: {0}")]
    Decode(#[from] base64::DecodeError),
}

/// Fixed sampling configuration sent with every request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub cfg_scale: f32,
    pub samples: u32,
    pub steps: u32,
    pub height: u32,
    pub width: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            cfg_scale: 7.0,
            samples: 1,
            steps: 30,
            height: 1024,
            width: 1024,
        }
    }
}

#[derive(Debug, Serialize)]
struct TextPrompt<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct TextToImageRequest<'a> {
    text_prompts: [TextPrompt<'a>; 1],
    cfg_scale: f32,
    samples: u32,
    steps: u32,
    height: u32,
    width: u32,
}

#[derive(Debug, Deserialize)]
struct TextToImageResponse {
    #[serde(default)]
    artifacts: Vec<Artifact>,
}

#[derive(Debug, Deserialize)]
struct Artifact {
    base64: Option<String>,
    seed: Option<u64>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

/// A decoded image plus whatever metadata the service attached
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub bytes: Vec<u8>,
    pub seed: Option<u64>,
    pub finish_reason: Option<String>,
}

/// Anything that can turn a prompt into image bytes
#[async_trait]
pub trait ImageBackend: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<GeneratedImage, GenerationError>;
}

/// Client for the Stability AI v1 text-to-image endpoint
#[derive(Clone)]
pub struct ImageGenerator {
    client: Client,
    api_host: String,
    engine_id: String,
    api_key: String,
    params: GenerationParams,
}

impl ImageGenerator {
    pub fn new(
        api_host: impl Into<String>,
        engine_id: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GenerationError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_host: api_host.into().trim_end_matches('/').to_string(),
            engine_id: engine_id.into(),
            api_key: api_key.into(),
            params: GenerationParams::default(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, GenerationError> {
        Self::new(
            config.api_host.as_str(),
            config.engine_id.as_str(),
            config.stability_api_key.as_str(),
            config.request_timeout,
        )
    }

    pub fn endpoint(&self) -> String {
        format!(
            "{}/v1/generation/{}/text-to-image",
            self.api_host, self.engine_id
        )
    }

    pub fn params(&self) -> GenerationParams {
        self.params
    }

    /// Generate one image for `prompt`
    pub async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage, GenerationError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(GenerationError::EmptyPrompt);
        }

        let body = TextToImageRequest {
            text_prompts: [TextPrompt { text: prompt }],
            cfg_scale: self.params.cfg_scale,
            samples: self.params.samples,
            steps: self.params.steps,
            height: self.params.height,
            width: self.params.width,
        };

        info!(
            "Requesting image | Engine: {} | Prompt: '{}'",
            self.engine_id,
            prompt.chars().take(100).collect::<String>()
        );

        let response = self
            .client
            .post(self.endpoint())
            .header(reqwest::header::ACCEPT, "application/json")
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if status != StatusCode::OK {
            return Err(GenerationError::Status { status, body: text });
        }

        debug!("Generation response received | {} bytes", text.len());
        parse_response(&text)
    }
}

#[async_trait]
impl ImageBackend for ImageGenerator {
    async fn generate(&self, prompt: &str) -> Result<GeneratedImage, GenerationError> {
        self.generate_image(prompt).await
    }
}

/// Decode the first artifact of a successful response body
pub fn parse_response(body: &str) -> Result<GeneratedImage, GenerationError> {
    let parsed: TextToImageResponse = serde_json::from_str(body)?;

    let artifact = parsed
        .artifacts
        .into_iter()
        .next()
        .ok_or(GenerationError::NoArtifacts)?;

    let encoded = artifact
        .base64
        .filter(|b| !b.trim().is_empty())
        .ok_or(GenerationError::MissingBase64)?;

    let bytes = BASE64.decode(encoded.trim().as_bytes())?;

    if let Some(reason) = artifact.finish_reason.as_deref() {
        if reason != "SUCCESS" {
            warn!("Artifact finish reason: {reason}");
        }
    }

    Ok(GeneratedImage {
        bytes,
        seed: artifact.seed,
        finish_reason: artifact.finish_reason,
    })
}
