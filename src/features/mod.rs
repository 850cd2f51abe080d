//! # Features
//!
//! - `image_gen`: Stability AI client and scratch storage
//! - `relay`: prompt → image → reply cycle
//! - `rate_limiting`: per-user request caps

pub mod image_gen;
pub mod rate_limiting;
pub mod relay;

pub use image_gen::{
    GeneratedImage, GenerationError, ImageBackend, ImageGenerator, ImageStore, StorageError,
    StoredImage,
};
pub use rate_limiting::RateLimiter;
pub use relay::{PromptRelay, PromptReplier, RelayFailure, RelayOutcome, RelayState};
