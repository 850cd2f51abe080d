// Core layer - configuration and shared helpers
pub mod core;

// Features layer - image generation, relay, rate limiting
pub mod features;

// Application layer
pub mod command_handler;
pub mod commands;

pub use crate::core::Config;

pub use features::{
    GeneratedImage, GenerationError, ImageBackend, ImageGenerator, ImageStore, PromptRelay,
    PromptReplier, RateLimiter, RelayFailure, RelayOutcome, RelayState, StorageError, StoredImage,
};
