//! # Prompt Relay Feature
//!
//! Takes a prompt from a chat, generates an image, hands it back, cleans up.
//! Each prompt runs `Idle → Generating → Delivering → Idle` on its own;
//! nothing carries over between prompts.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

pub mod replier;

pub use replier::{
    ChannelReplier, InteractionReplier, InteractionRoute, PromptReplier, ResponseTracker,
};

use anyhow::{Context as _, Result};
use log::{debug, error, info, warn};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::core::response::{generating_notice, GENERATION_FAILED_NOTICE};
use crate::features::image_gen::{
    GenerationError, ImageBackend, ImageStore, StorageError, StoredImage,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Idle,
    Generating,
    Delivering,
}

impl fmt::Display for RelayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RelayState::Idle => "idle",
            RelayState::Generating => "generating",
            RelayState::Delivering => "delivering",
        };
        f.write_str(name)
    }
}

/// Why a prompt ended with the failure notice instead of an image
#[derive(Debug, thiserror::Error)]
pub enum RelayFailure {
    #[error("generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("saving the image failed: {0}")]
    Storage(#[from] StorageError),
}

#[derive(Debug)]
pub enum RelayOutcome {
    /// The image went out; `size` is its length in bytes
    Delivered { filename: String, size: usize },
    /// The user got the failure notice
    Failed(RelayFailure),
}

impl RelayOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, RelayOutcome::Delivered { .. })
    }
}

#[derive(Clone)]
pub struct PromptRelay {
    backend: Arc<dyn ImageBackend>,
    store: ImageStore,
    permits: Arc<Semaphore>,
}

impl PromptRelay {
    /// `max_concurrent` caps how many generation calls run at once
    pub fn new(backend: Arc<dyn ImageBackend>, store: ImageStore, max_concurrent: usize) -> Self {
        Self {
            backend,
            store,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    pub fn store(&self) -> &ImageStore {
        &self.store
    }

    /// Run one prompt through generation and delivery.
    ///
    /// Upstream and storage failures are reported to the user and returned as
    /// [`RelayOutcome::Failed`]. Errors talking to the chat itself are
    /// returned as `Err`.
    pub async fn relay(&self, prompt: &str, replier: &dyn PromptReplier) -> Result<RelayOutcome> {
        let request_id = Uuid::new_v4();
        let start_time = Instant::now();
        let prompt = prompt.trim();

        info!(
            "[{request_id}] 📥 Prompt received | Length: {} | Prompt: '{}'",
            prompt.len(),
            prompt.chars().take(100).collect::<String>()
        );

        if prompt.is_empty() {
            warn!("[{request_id}] Empty prompt, skipping generation");
            replier.send_text(GENERATION_FAILED_NOTICE).await?;
            return Ok(RelayOutcome::Failed(GenerationError::EmptyPrompt.into()));
        }

        replier.send_text(&generating_notice(prompt)).await?;

        self.log_state(request_id, RelayState::Generating);
        let generated = {
            let _permit = self
                .permits
                .acquire()
                .await
                .context("generation semaphore closed")?;
            self.backend.generate(prompt).await
        };

        let image = match generated {
            Ok(image) => image,
            Err(e) => {
                error!(
                    "[{request_id}] ❌ Generation failed after {:?}: {e}",
                    start_time.elapsed()
                );
                return self.fail(request_id, replier, e.into()).await;
            }
        };
        debug!(
            "[{request_id}] Image generated | {} bytes | Seed: {:?}",
            image.bytes.len(),
            image.seed
        );

        let stored = match self.store.save(&image.bytes, prompt).await {
            Ok(stored) => stored,
            Err(e) => {
                error!("[{request_id}] ❌ Error while saving the image: {e}");
                return self.fail(request_id, replier, e.into()).await;
            }
        };

        self.log_state(request_id, RelayState::Delivering);
        let delivered = self.deliver(&stored, replier).await;

        if let Err(e) = self.store.remove(&stored).await {
            warn!("[{request_id}] Failed to delete {}: {e}", stored.path.display());
        }

        let size = delivered.with_context(|| format!("delivering {}", stored.filename))?;

        self.log_state(request_id, RelayState::Idle);
        info!(
            "[{request_id}] ✅ Image sent | File: {} | Total time: {:?}",
            stored.filename,
            start_time.elapsed()
        );

        Ok(RelayOutcome::Delivered {
            filename: stored.filename,
            size,
        })
    }

    async fn deliver(&self, stored: &StoredImage, replier: &dyn PromptReplier) -> Result<usize> {
        let bytes = self.store.read(stored).await?;
        let size = bytes.len();
        replier.send_image(&stored.filename, bytes).await?;
        Ok(size)
    }

    async fn fail(
        &self,
        request_id: Uuid,
        replier: &dyn PromptReplier,
        failure: RelayFailure,
    ) -> Result<RelayOutcome> {
        replier.send_text(GENERATION_FAILED_NOTICE).await?;
        self.log_state(request_id, RelayState::Idle);
        Ok(RelayOutcome::Failed(failure))
    }

    fn log_state(&self, request_id: Uuid, state: RelayState) {
        debug!("[{request_id}] → {state}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::image_gen::{GeneratedImage, ImageGenerator};
    use async_trait::async_trait;
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine as _;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::path::Path;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq)]
    enum Sent {
        Text(String),
        Image { filename: String, bytes: Vec<u8> },
    }

    #[derive(Default)]
    struct RecordingReplier {
        sent: Mutex<Vec<Sent>>,
        fail_images: bool,
    }

    impl RecordingReplier {
        fn sent(&self) -> Vec<Sent> {
            self.sent.lock().unwrap().clone()
        }

        fn images(&self) -> Vec<(String, Vec<u8>)> {
            self.sent()
                .into_iter()
                .filter_map(|s| match s {
                    Sent::Image { filename, bytes } => Some((filename, bytes)),
                    Sent::Text(_) => None,
                })
                .collect()
        }
    }

    #[async_trait]
    impl PromptReplier for RecordingReplier {
        async fn send_text(&self, text: &str) -> Result<()> {
            self.sent.lock().unwrap().push(Sent::Text(text.to_string()));
            Ok(())
        }

        async fn send_image(&self, filename: &str, bytes: Vec<u8>) -> Result<()> {
            if self.fail_images {
                anyhow::bail!("upload rejected");
            }
            self.sent.lock().unwrap().push(Sent::Image {
                filename: filename.to_string(),
                bytes,
            });
            Ok(())
        }
    }

    /// Echoes the prompt back as image bytes
    struct EchoBackend;

    #[async_trait]
    impl ImageBackend for EchoBackend {
        async fn generate(&self, prompt: &str) -> Result<GeneratedImage, GenerationError> {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(GeneratedImage {
                bytes: prompt.as_bytes().to_vec(),
                seed: None,
                finish_reason: None,
            })
        }
    }

    struct NoArtifactsBackend;

    #[async_trait]
    impl ImageBackend for NoArtifactsBackend {
        async fn generate(&self, _prompt: &str) -> Result<GeneratedImage, GenerationError> {
            Err(GenerationError::NoArtifacts)
        }
    }

    fn dir_is_empty(path: &Path) -> bool {
        std::fs::read_dir(path).unwrap().next().is_none()
    }

    fn is_timestamped_png(filename: &str, stem: &str) -> bool {
        filename
            .strip_prefix(&format!("{stem}_"))
            .and_then(|rest| rest.strip_suffix(".png"))
            .map(|digits| digits.len() == 14 && digits.chars().all(|c| c.is_ascii_digit()))
            .unwrap_or(false)
    }

    fn stability_relay(server: &MockServer, scratch: &Path) -> PromptRelay {
        let generator = ImageGenerator::new(
            server.base_url(),
            "stable-diffusion-v1-6",
            "sk-test",
            Duration::from_secs(5),
        )
        .unwrap();
        PromptRelay::new(Arc::new(generator), ImageStore::new(scratch), 2)
    }

    #[tokio::test]
    async fn test_red_fox_delivered_and_scratch_cleaned() {
        let png = b"\x89PNG\r\n\x1a\nred-fox".to_vec();
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/generation/stable-diffusion-v1-6/text-to-image");
                then.status(200)
                    .json_body(json!({"artifacts": [{"base64": BASE64.encode(&png)}]}));
            })
            .await;

        let scratch = tempfile::tempdir().unwrap();
        let relay = stability_relay(&server, scratch.path());
        let replier = RecordingReplier::default();

        let outcome = relay.relay("a red fox", &replier).await.unwrap();

        assert!(outcome.is_delivered());
        let images = replier.images();
        assert_eq!(images.len(), 1);
        assert!(is_timestamped_png(&images[0].0, "a_red_fox"), "{}", images[0].0);
        assert_eq!(images[0].1, png);
        assert_eq!(
            replier.sent()[0],
            Sent::Text("Generating image for: a red fox...".to_string())
        );
        assert!(dir_is_empty(scratch.path()));
    }

    #[tokio::test]
    async fn test_server_error_sends_failure_notice() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(500).body("internal error");
            })
            .await;

        let scratch = tempfile::tempdir().unwrap();
        let relay = stability_relay(&server, scratch.path());
        let replier = RecordingReplier::default();

        let outcome = relay.relay("x", &replier).await.unwrap();

        assert!(matches!(
            outcome,
            RelayOutcome::Failed(RelayFailure::Generation(GenerationError::Status { .. }))
        ));
        assert!(replier.images().is_empty());
        assert_eq!(
            replier.sent().last(),
            Some(&Sent::Text(GENERATION_FAILED_NOTICE.to_string()))
        );
        assert!(dir_is_empty(scratch.path()));
    }

    #[tokio::test]
    async fn test_missing_artifacts_sends_failure_notice() {
        let scratch = tempfile::tempdir().unwrap();
        let relay = PromptRelay::new(Arc::new(NoArtifactsBackend), ImageStore::new(scratch.path()), 1);
        let replier = RecordingReplier::default();

        let outcome = relay.relay("anything", &replier).await.unwrap();

        assert!(!outcome.is_delivered());
        assert_eq!(
            replier.sent(),
            vec![
                Sent::Text("Generating image for: anything...".to_string()),
                Sent::Text(GENERATION_FAILED_NOTICE.to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_prompt_skips_generation() {
        let scratch = tempfile::tempdir().unwrap();
        let relay = PromptRelay::new(Arc::new(EchoBackend), ImageStore::new(scratch.path()), 1);
        let replier = RecordingReplier::default();

        let outcome = relay.relay("   ", &replier).await.unwrap();

        assert!(matches!(
            outcome,
            RelayOutcome::Failed(RelayFailure::Generation(GenerationError::EmptyPrompt))
        ));
        assert_eq!(
            replier.sent(),
            vec![Sent::Text(GENERATION_FAILED_NOTICE.to_string())]
        );
    }

    #[tokio::test]
    async fn test_storage_failure_sends_failure_notice() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"x").unwrap();

        let relay = PromptRelay::new(Arc::new(EchoBackend), ImageStore::new(&blocker), 1);
        let replier = RecordingReplier::default();

        let outcome = relay.relay("a red fox", &replier).await.unwrap();

        assert!(matches!(
            outcome,
            RelayOutcome::Failed(RelayFailure::Storage(_))
        ));
        assert!(replier.images().is_empty());
    }

    #[tokio::test]
    async fn test_delivery_error_propagates_and_cleans_up() {
        let scratch = tempfile::tempdir().unwrap();
        let relay = PromptRelay::new(Arc::new(EchoBackend), ImageStore::new(scratch.path()), 1);
        let replier = RecordingReplier {
            fail_images: true,
            ..Default::default()
        };

        assert!(relay.relay("a red fox", &replier).await.is_err());
        assert!(dir_is_empty(scratch.path()));
    }

    #[tokio::test]
    async fn test_concurrent_prompts_get_their_own_images() {
        let scratch = tempfile::tempdir().unwrap();
        let relay = PromptRelay::new(Arc::new(EchoBackend), ImageStore::new(scratch.path()), 4);
        let first = RecordingReplier::default();
        let second = RecordingReplier::default();

        let (a, b) = tokio::join!(
            relay.relay("same prompt", &first),
            relay.relay("same prompt", &second)
        );

        assert!(a.unwrap().is_delivered());
        assert!(b.unwrap().is_delivered());
        assert_eq!(first.images().len(), 1);
        assert_eq!(second.images().len(), 1);
        assert_eq!(first.images()[0].1, b"same prompt");
        assert_eq!(second.images()[0].1, b"same prompt");
        assert!(dir_is_empty(scratch.path()));
    }
}
