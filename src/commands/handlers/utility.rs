//! Utility command handlers
//!
//! Handles: start, help
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use anyhow::Result;
use async_trait::async_trait;
use log::info;
use serenity::model::application::interaction::application_command::ApplicationCommandInteraction;
use serenity::model::application::interaction::InteractionResponseType;
use serenity::prelude::Context;
use std::sync::Arc;

use crate::commands::context::CommandContext;
use crate::commands::handler::SlashCommandHandler;
use crate::core::response::GREETING;

pub const HELP_TEXT: &str = r#"**How to use this bot:**
Send me any text message and I'll turn it into an image.
`/imagine <prompt>` - Generate an image from a prompt
`/start` - Say hello
`/help` - Show this help message"#;

/// Handler for utility commands: start, help
pub struct UtilityHandler;

#[async_trait]
impl SlashCommandHandler for UtilityHandler {
    fn command_names(&self) -> &'static [&'static str] {
        &["start", "help"]
    }

    async fn handle(
        &self,
        _ctx: Arc<CommandContext>,
        serenity_ctx: &Context,
        command: &ApplicationCommandInteraction,
    ) -> Result<()> {
        let text = match command.data.name.as_str() {
            "start" => GREETING,
            "help" => HELP_TEXT,
            _ => return Ok(()),
        };

        command
            .create_interaction_response(&serenity_ctx.http, |response| {
                response
                    .kind(InteractionResponseType::ChannelMessageWithSource)
                    .interaction_response_data(|message| message.content(text))
            })
            .await?;

        info!(
            "/{} completed for user {}",
            command.data.name, command.user.id
        );
        Ok(())
    }
}
