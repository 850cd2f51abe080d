use anyhow::Result;
use dotenvy::dotenv;
use log::{error, info, warn};
use serenity::async_trait;
use serenity::model::application::interaction::{Interaction, InteractionResponseType};
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use serenity::model::id::GuildId;
use serenity::prelude::*;
use std::sync::Arc;

use stability_relay::commands::{
    register_global_commands, register_guild_commands, CommandContext, CommandHandler,
};
use stability_relay::core::{Config, PROCESSING_ERROR_NOTICE};
use stability_relay::features::{ImageGenerator, ImageStore, PromptRelay, RateLimiter};

struct Handler {
    command_handler: CommandHandler,
    guild_id: Option<GuildId>,
}

#[async_trait]
impl EventHandler for Handler {
    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }

        if let Err(e) = self.command_handler.handle_message(&ctx, &msg).await {
            error!("Error handling message: {e:#}");
            if let Err(why) = msg.channel_id.say(&ctx.http, PROCESSING_ERROR_NOTICE).await {
                error!("Failed to send error message: {why}");
            }
        }
    }

    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("🎉 {} is connected and ready!", ready.user.name);
        info!("📡 Connected to {} guilds", ready.guilds.len());

        let registered = match self.guild_id {
            Some(guild_id) => register_guild_commands(&ctx, guild_id).await,
            None => register_global_commands(&ctx).await,
        };
        if let Err(e) = registered {
            error!("Failed to register slash commands: {e}");
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Interaction::ApplicationCommand(command) = interaction else {
            return;
        };

        if let Err(e) = self
            .command_handler
            .handle_slash_command(&ctx, &command)
            .await
        {
            error!(
                "Error handling slash command '{}': {:#}",
                command.data.name, e
            );

            // The relay may already have answered the interaction
            if let Err(followup_err) = command
                .create_followup_message(&ctx.http, |message| {
                    message.content(PROCESSING_ERROR_NOTICE)
                })
                .await
            {
                warn!("Follow-up failed, answering the interaction instead: {followup_err}");
                if let Err(why) = command
                    .create_interaction_response(&ctx.http, |response| {
                        response
                            .kind(InteractionResponseType::ChannelMessageWithSource)
                            .interaction_response_data(|message| {
                                message.content(PROCESSING_ERROR_NOTICE)
                            })
                    })
                    .await
                {
                    error!("Failed to send error message: {why}");
                }
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let config = Config::from_env()?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    info!("Starting Stability relay bot...");
    info!(
        "Engine: {} | Host: {} | Scratch: {}",
        config.engine_id,
        config.api_host,
        config.output_dir.display()
    );

    let store = ImageStore::new(&config.output_dir);
    store.prepare().await?;

    let generator = ImageGenerator::from_config(&config)?;
    let relay = PromptRelay::new(
        Arc::new(generator),
        store,
        config.max_concurrent_generations,
    );
    let rate_limiter = RateLimiter::per_minute(config.rate_limit_per_minute);
    if config.rate_limit_per_minute == 0 {
        warn!("RATE_LIMIT_PER_MINUTE is 0 - per-user rate limiting disabled");
    }

    let command_handler = CommandHandler::new(
        CommandContext::new(relay, rate_limiter),
        config.relay_guild_messages,
    );

    let handler = Handler {
        command_handler,
        guild_id: config.discord_guild_id.map(GuildId),
    };

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(handler)
        .await
        .map_err(|e| {
            error!("Failed to create Discord client: {e}");
            anyhow::anyhow!("Client creation failed: {}", e)
        })?;

    info!("Bot is running.....");

    if let Err(why) = client.start().await {
        error!("Gateway connection failed: {why:?}");
        return Err(anyhow::anyhow!(
            "Failed to establish gateway connection: {}",
            why
        ));
    }

    Ok(())
}
