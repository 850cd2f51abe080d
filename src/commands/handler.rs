//! Slash command handler trait
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use anyhow::Result;
use async_trait::async_trait;
use serenity::model::application::interaction::application_command::ApplicationCommandInteraction;
use serenity::prelude::Context;
use std::sync::Arc;

use super::context::CommandContext;

/// One or more slash commands sharing a handler.
///
/// Handlers are registered with a [`CommandRegistry`](super::CommandRegistry)
/// and looked up by command name.
///
/// ```ignore
/// pub struct StartHandler;
///
/// #[async_trait]
/// impl SlashCommandHandler for StartHandler {
///     fn command_names(&self) -> &'static [&'static str] {
///         &["start"]
///     }
///
///     async fn handle(
///         &self,
///         ctx: Arc<CommandContext>,
///         serenity_ctx: &Context,
///         command: &ApplicationCommandInteraction,
///     ) -> Result<()> {
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait SlashCommandHandler: Send + Sync {
    fn command_names(&self) -> &'static [&'static str];

    async fn handle(
        &self,
        ctx: Arc<CommandContext>,
        serenity_ctx: &Context,
        command: &ApplicationCommandInteraction,
    ) -> Result<()>;
}
