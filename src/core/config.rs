//! Runtime configuration loaded from the environment
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.0.0: Initial creation with Discord and Stability AI settings

use anyhow::{anyhow, Context as _, Result};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_HOST: &str = "https://api.stability.ai";
pub const DEFAULT_ENGINE_ID: &str = "stable-diffusion-v1-6";
pub const DEFAULT_OUTPUT_DIR: &str = "data/images";

/// Bot configuration, built once at startup and shared by reference.
#[derive(Clone)]
pub struct Config {
    pub discord_token: String,
    pub discord_guild_id: Option<u64>,
    pub stability_api_key: String,
    pub api_host: String,
    pub engine_id: String,
    pub output_dir: PathBuf,
    pub log_level: String,
    pub max_concurrent_generations: usize,
    pub request_timeout: Duration,
    pub relay_guild_messages: bool,
    pub rate_limit_per_minute: usize,
}

// Keeps secrets out of debug logs.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("discord_token", &"<redacted>")
            .field("discord_guild_id", &self.discord_guild_id)
            .field("stability_api_key", &"<redacted>")
            .field("api_host", &self.api_host)
            .field("engine_id", &self.engine_id)
            .field("output_dir", &self.output_dir)
            .field("log_level", &self.log_level)
            .field("max_concurrent_generations", &self.max_concurrent_generations)
            .field("request_timeout", &self.request_timeout)
            .field("relay_guild_messages", &self.relay_guild_messages)
            .field("rate_limit_per_minute", &self.rate_limit_per_minute)
            .finish()
    }
}

impl Config {
    /// Load configuration from process environment variables.
    ///
    /// Call `dotenvy::dotenv()` first if a `.env` file should be honoured.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// Blank values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let discord_token = get("DISCORD_TOKEN")
            .ok_or_else(|| anyhow!("Missing DISCORD_TOKEN environment variable"))?;
        let stability_api_key = get("STABILITY_API_KEY")
            .ok_or_else(|| anyhow!("Missing STABILITY_API_KEY environment variable"))?;

        let discord_guild_id = get("DISCORD_GUILD_ID")
            .map(|v| {
                v.parse::<u64>()
                    .with_context(|| format!("DISCORD_GUILD_ID is not a valid id: {v}"))
            })
            .transpose()?;

        let api_host = get("API_HOST")
            .unwrap_or_else(|| DEFAULT_API_HOST.to_string())
            .trim_end_matches('/')
            .to_string();

        let max_concurrent_generations = parse_or(&get, "MAX_CONCURRENT_GENERATIONS", 4usize)?;
        if max_concurrent_generations == 0 {
            return Err(anyhow!("MAX_CONCURRENT_GENERATIONS must be at least 1"));
        }

        let timeout_secs = parse_or(&get, "REQUEST_TIMEOUT_SECS", 120u64)?;

        let relay_guild_messages = match get("RELAY_GUILD_MESSAGES") {
            Some(v) => parse_bool(&v)
                .ok_or_else(|| anyhow!("RELAY_GUILD_MESSAGES must be true or false, got {v}"))?,
            None => true,
        };

        Ok(Config {
            discord_token,
            discord_guild_id,
            stability_api_key,
            api_host,
            engine_id: get("STABILITY_ENGINE_ID").unwrap_or_else(|| DEFAULT_ENGINE_ID.to_string()),
            output_dir: PathBuf::from(
                get("IMAGE_OUTPUT_DIR").unwrap_or_else(|| DEFAULT_OUTPUT_DIR.to_string()),
            ),
            log_level: get("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            max_concurrent_generations,
            request_timeout: Duration::from_secs(timeout_secs),
            relay_guild_messages,
            rate_limit_per_minute: parse_or(&get, "RATE_LIMIT_PER_MINUTE", 5usize)?,
        })
    }
}

fn parse_or<G, T>(get: &G, key: &str, default: T) -> Result<T>
where
    G: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(key) {
        Some(v) => v
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value: {v}")),
        None => Ok(default),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
