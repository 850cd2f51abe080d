//! Image generation command handler
//!
//! Handles: imagine
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use anyhow::Result;
use async_trait::async_trait;
use log::{info, warn};
use serenity::model::application::interaction::application_command::ApplicationCommandInteraction;
use serenity::model::application::interaction::InteractionResponseType;
use serenity::prelude::Context;
use std::sync::Arc;

use crate::commands::context::CommandContext;
use crate::commands::handler::SlashCommandHandler;
use crate::commands::slash::get_string_option;
use crate::features::relay::InteractionReplier;

/// Handler for the /imagine command
pub struct ImagineHandler;

#[async_trait]
impl SlashCommandHandler for ImagineHandler {
    fn command_names(&self) -> &'static [&'static str] {
        &["imagine"]
    }

    async fn handle(
        &self,
        ctx: Arc<CommandContext>,
        serenity_ctx: &Context,
        command: &ApplicationCommandInteraction,
    ) -> Result<()> {
        let prompt = get_string_option(&command.data.options, "prompt")
            .ok_or_else(|| anyhow::anyhow!("Missing prompt parameter"))?;

        if let Some(notice) = ctx.rate_limit_notice(command.user.id.0) {
            warn!("Rate limit exceeded for user {} on /imagine", command.user.id);
            command
                .create_interaction_response(&serenity_ctx.http, |response| {
                    response
                        .kind(InteractionResponseType::ChannelMessageWithSource)
                        .interaction_response_data(|message| {
                            message.content(notice).ephemeral(true)
                        })
                })
                .await?;
            return Ok(());
        }

        let replier = InteractionReplier::new(&serenity_ctx.http, command);
        let outcome = ctx.relay.relay(&prompt, &replier).await?;

        info!(
            "/imagine finished for user {} | Delivered: {}",
            command.user.id,
            outcome.is_delivered()
        );
        Ok(())
    }
}
