//! # Rate Limiting Feature
//!
//! Caps how many images one user can request per minute. Uses a sliding
//! window with DashMap for concurrent access.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: true

pub mod limiter;

pub use limiter::RateLimiter;
