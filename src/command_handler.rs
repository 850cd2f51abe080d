use crate::commands::context::CommandContext;
use crate::commands::registry::CommandRegistry;
use crate::core::response::GREETING;
use crate::features::relay::ChannelReplier;
use anyhow::Result;
use log::{debug, info, warn};
use serenity::model::application::interaction::application_command::ApplicationCommandInteraction;
use serenity::model::channel::Message;
use serenity::prelude::Context;
use std::sync::Arc;
use uuid::Uuid;

/// What an incoming chat message asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKind<'a> {
    /// `!start` or `/start` typed as text
    Greeting,
    /// Any other command-looking text; ignored
    Command,
    /// Free text, treated as a prompt
    Prompt(&'a str),
    Empty,
}

/// Sort a message the way the catch-all text handler sees it
pub fn classify_message(content: &str) -> MessageKind<'_> {
    let content = content.trim();
    if content.is_empty() {
        return MessageKind::Empty;
    }

    if let Some(command) = content.strip_prefix('/').or_else(|| content.strip_prefix('!')) {
        let name = command.split_whitespace().next().unwrap_or("");
        // Telegram-style "/start@botname" is accepted too
        let name = name.split('@').next().unwrap_or(name);
        return if name.eq_ignore_ascii_case("start") {
            MessageKind::Greeting
        } else {
            MessageKind::Command
        };
    }

    MessageKind::Prompt(content)
}

#[derive(Clone)]
pub struct CommandHandler {
    context: Arc<CommandContext>,
    registry: CommandRegistry,
    relay_guild_messages: bool,
}

impl CommandHandler {
    pub fn new(context: CommandContext, relay_guild_messages: bool) -> Self {
        CommandHandler {
            context: Arc::new(context),
            registry: CommandRegistry::with_default_handlers(),
            relay_guild_messages,
        }
    }

    pub fn context(&self) -> Arc<CommandContext> {
        Arc::clone(&self.context)
    }

    pub async fn handle_message(&self, ctx: &Context, msg: &Message) -> Result<()> {
        let request_id = Uuid::new_v4();
        let user_id = msg.author.id;
        let is_dm = msg.guild_id.is_none();

        debug!(
            "[{request_id}] 📥 Message received | User: {user_id} | Channel: {} | DM: {is_dm}",
            msg.channel_id
        );

        match classify_message(&msg.content) {
            MessageKind::Empty | MessageKind::Command => Ok(()),
            MessageKind::Greeting => {
                msg.channel_id.say(&ctx.http, GREETING).await?;
                info!("[{request_id}] 👋 Greeting sent to user {user_id}");
                Ok(())
            }
            MessageKind::Prompt(prompt) => {
                if !is_dm && !self.relay_guild_messages {
                    debug!("[{request_id}] Guild prompts disabled, ignoring");
                    return Ok(());
                }

                if let Some(notice) = self.context.rate_limit_notice(user_id.0) {
                    warn!("[{request_id}] 🚫 Rate limit exceeded for user: {user_id}");
                    msg.channel_id.say(&ctx.http, notice).await?;
                    return Ok(());
                }

                let replier = ChannelReplier::new(&ctx.http, msg.channel_id);
                let outcome = self.context.relay.relay(prompt, &replier).await?;
                info!(
                    "[{request_id}] Prompt from user {user_id} finished | Delivered: {}",
                    outcome.is_delivered()
                );
                Ok(())
            }
        }
    }

    pub async fn handle_slash_command(
        &self,
        ctx: &Context,
        command: &ApplicationCommandInteraction,
    ) -> Result<()> {
        let request_id = Uuid::new_v4();
        info!(
            "[{}] 📥 Slash command received | Command: {} | User: {} | Channel: {}",
            request_id, command.data.name, command.user.id, command.channel_id
        );

        match self.registry.get(&command.data.name) {
            Some(handler) => handler.handle(self.context(), ctx, command).await,
            None => {
                warn!("[{request_id}] Unknown slash command: {}", command.data.name);
                Ok(())
            }
        }
    }
}
