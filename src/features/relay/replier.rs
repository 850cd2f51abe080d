//! Reply targets the relay talks back through
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use anyhow::Result;
use async_trait::async_trait;
use serenity::http::Http;
use serenity::model::application::interaction::application_command::ApplicationCommandInteraction;
use serenity::model::application::interaction::InteractionResponseType;
use serenity::model::channel::AttachmentType;
use serenity::model::id::ChannelId;
use std::borrow::Cow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// The conversation a prompt came from
#[async_trait]
pub trait PromptReplier: Send + Sync {
    async fn send_text(&self, text: &str) -> Result<()>;

    async fn send_image(&self, filename: &str, bytes: Vec<u8>) -> Result<()>;
}

/// Replies as plain messages in a channel (free-text prompts)
pub struct ChannelReplier<'a> {
    http: &'a Arc<Http>,
    channel_id: ChannelId,
}

impl<'a> ChannelReplier<'a> {
    pub fn new(http: &'a Arc<Http>, channel_id: ChannelId) -> Self {
        Self { http, channel_id }
    }
}

#[async_trait]
impl PromptReplier for ChannelReplier<'_> {
    async fn send_text(&self, text: &str) -> Result<()> {
        self.channel_id.say(self.http, text).await?;
        Ok(())
    }

    async fn send_image(&self, filename: &str, bytes: Vec<u8>) -> Result<()> {
        self.channel_id
            .send_message(self.http, |m| {
                m.add_file(AttachmentType::Bytes {
                    data: Cow::Owned(bytes),
                    filename: filename.to_string(),
                })
            })
            .await?;
        Ok(())
    }
}

/// How the next reply to a slash command goes out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionRoute {
    /// Answer the interaction itself
    Respond,
    /// The interaction is answered; post a follow-up
    FollowUp,
}

/// Tracks whether an interaction has been answered yet
#[derive(Debug, Default)]
pub struct ResponseTracker {
    responded: AtomicBool,
}

impl ResponseTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route for the next reply. Exactly one caller ever gets `Respond`.
    pub fn next_route(&self) -> InteractionRoute {
        if self.responded.swap(true, Ordering::SeqCst) {
            InteractionRoute::FollowUp
        } else {
            InteractionRoute::Respond
        }
    }

    pub fn has_responded(&self) -> bool {
        self.responded.load(Ordering::SeqCst)
    }
}

/// Replies to a slash command.
///
/// The first message answers the interaction, everything after is a
/// follow-up.
pub struct InteractionReplier<'a> {
    http: &'a Arc<Http>,
    command: &'a ApplicationCommandInteraction,
    tracker: ResponseTracker,
}

impl<'a> InteractionReplier<'a> {
    pub fn new(http: &'a Arc<Http>, command: &'a ApplicationCommandInteraction) -> Self {
        Self {
            http,
            command,
            tracker: ResponseTracker::new(),
        }
    }
}

#[async_trait]
impl PromptReplier for InteractionReplier<'_> {
    async fn send_text(&self, text: &str) -> Result<()> {
        match self.tracker.next_route() {
            InteractionRoute::Respond => {
                self.command
                    .create_interaction_response(self.http, |response| {
                        response
                            .kind(InteractionResponseType::ChannelMessageWithSource)
                            .interaction_response_data(|message| message.content(text))
                    })
                    .await?;
            }
            InteractionRoute::FollowUp => {
                self.command
                    .create_followup_message(self.http, |message| message.content(text))
                    .await?;
            }
        }
        Ok(())
    }

    async fn send_image(&self, filename: &str, bytes: Vec<u8>) -> Result<()> {
        // Files only go out as follow-ups, so defer if nothing answered yet
        if self.tracker.next_route() == InteractionRoute::Respond {
            self.command
                .create_interaction_response(self.http, |response| {
                    response.kind(InteractionResponseType::DeferredChannelMessageWithSource)
                })
                .await?;
        }
        self.command
            .create_followup_message(self.http, |message| {
                message.add_file(AttachmentType::Bytes {
                    data: Cow::Owned(bytes),
                    filename: filename.to_string(),
                })
            })
            .await?;
        Ok(())
    }
}
