//! Shared context for command handlers
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use std::sync::Arc;
use std::time::Duration;

use crate::features::rate_limiting::RateLimiter;
use crate::features::relay::PromptRelay;

/// Services every handler may need: the relay and the per-user limiter
#[derive(Clone)]
pub struct CommandContext {
    pub relay: PromptRelay,
    pub rate_limiter: Arc<RateLimiter>,
}

impl CommandContext {
    pub fn new(relay: PromptRelay, rate_limiter: RateLimiter) -> Self {
        Self {
            relay,
            rate_limiter: Arc::new(rate_limiter),
        }
    }

    /// Message shown when a user hits the limit, or `None` if they may proceed
    pub fn rate_limit_notice(&self, user_id: u64) -> Option<String> {
        self.rate_limiter
            .check(user_id)
            .err()
            .map(format_rate_limit_notice)
    }
}

pub fn format_rate_limit_notice(wait: Duration) -> String {
    let secs = wait.as_secs().max(1);
    format!("You're sending prompts too quickly! Please try again in {secs}s.")
}
