//! # Core Module
//!
//! Configuration, message text helpers and filename utilities.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

pub mod config;
pub mod file_utils;
pub mod response;

pub use config::Config;
pub use file_utils::{image_filename, sanitize_prompt, sweep_dir};
pub use response::{
    generating_notice, truncate_to, GENERATION_FAILED_NOTICE, GREETING, MESSAGE_LIMIT,
    PROCESSING_ERROR_NOTICE,
};
