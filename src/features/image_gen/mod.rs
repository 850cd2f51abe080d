//! # Image Generation Feature
//!
//! Stability AI text-to-image generation and per-request scratch storage.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

pub mod generator;
pub mod storage;

pub use generator::{GeneratedImage, GenerationError, GenerationParams, ImageBackend, ImageGenerator};
pub use storage::{ImageStore, StorageError, StoredImage};
