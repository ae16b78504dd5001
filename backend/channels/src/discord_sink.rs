//! Posts session and leaderboard notifications to a Discord text channel.

use std::num::NonZeroU64;
use std::sync::Arc;

use async_trait::async_trait;
use serenity::builder::{CreateEmbed, CreateMessage};
use serenity::http::Http;
use serenity::model::id::ChannelId;
use tracing::debug;

use staytime_core::{Card, MessagingSink, StayError};

/// Parse a numeric Discord channel id.
pub fn parse_channel_id(channel_id: &str) -> Result<ChannelId, StayError> {
    channel_id
        .trim()
        .parse::<NonZeroU64>()
        .map(ChannelId::from)
        .map_err(|e| StayError::messaging(format!("invalid channel id {channel_id:?}: {e}")))
}

/// Render a card as a Discord embed.
pub fn embed_for(card: &Card) -> CreateEmbed {
    CreateEmbed::new()
        .title(&card.title)
        .description(&card.body)
        .colour(card.color)
}

/// REST-only sink; does not need a gateway connection.
pub struct DiscordSink {
    http: Arc<Http>,
}

impl DiscordSink {
    pub fn new(token: &str) -> Self {
        Self {
            http: Arc::new(Http::new(token)),
        }
    }

    pub fn with_http(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl MessagingSink for DiscordSink {
    fn name(&self) -> &str {
        "discord"
    }

    async fn send_text(&self, channel_id: &str, text: &str) -> Result<(), StayError> {
        let channel = parse_channel_id(channel_id)?;
        channel
            .say(&self.http, text)
            .await
            .map_err(StayError::messaging)?;
        debug!(channel = %channel, "Sent text message");
        Ok(())
    }

    async fn send_card(&self, channel_id: &str, card: &Card) -> Result<(), StayError> {
        let channel = parse_channel_id(channel_id)?;
        channel
            .send_message(&self.http, CreateMessage::new().embed(embed_for(card)))
            .await
            .map_err(StayError::messaging)?;
        debug!(channel = %channel, title = %card.title, "Sent embed");
        Ok(())
    }
}
