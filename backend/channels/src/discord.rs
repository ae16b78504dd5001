use crate::PresenceAdapter;
use async_trait::async_trait;
use chrono::Utc;
use serenity::model::gateway::Ready;
use serenity::model::voice::VoiceState;
use serenity::prelude::*;
use staytime_core::{Message, PresenceEvent};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Gateway intents needed to see voice state changes.
pub fn gateway_intents() -> GatewayIntents {
    GatewayIntents::GUILDS | GatewayIntents::GUILD_VOICE_STATES
}

/// Build a presence event from the before/after voice states of one update.
pub fn presence_from_voice_state(old: Option<&VoiceState>, new: &VoiceState) -> PresenceEvent {
    let had_previous = old.and_then(|o| o.channel_id).is_some();
    let event = PresenceEvent::new(
        new.user_id.to_string(),
        new.channel_id.map(|c| c.to_string()),
        had_previous,
        Utc::now(),
    );
    match new.member.as_ref() {
        Some(member) => event.with_user_name(member.display_name()),
        None => event,
    }
}

struct Handler {
    presence_tx: mpsc::Sender<Message>,
}

#[async_trait]
impl EventHandler for Handler {
    async fn voice_state_update(&self, _ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        let event = presence_from_voice_state(old.as_ref(), &new);
        debug!(
            user = %event.user_id,
            channel = ?event.channel_id,
            had_previous = event.had_previous_channel,
            "Voice state update"
        );

        if self.presence_tx.send(Message::Presence(event)).await.is_err() {
            warn!("Presence channel closed; dropping voice state update");
        }
    }

    async fn ready(&self, _: Context, ready: Ready) {
        info!(bot = %ready.user.name, guilds = ready.guilds.len(), "Discord gateway connected");
    }
}

/// Long-lived gateway connection that turns voice state updates into
/// [`PresenceEvent`]s.
pub struct DiscordGateway {
    token: String,
}

impl DiscordGateway {
    pub fn new(token: String) -> Self {
        Self { token }
    }
}

#[async_trait]
impl PresenceAdapter for DiscordGateway {
    fn name(&self) -> &str {
        "discord"
    }

    async fn start(&self, presence_tx: mpsc::Sender<Message>) -> anyhow::Result<()> {
        info!("Starting Discord gateway");

        let mut client = Client::builder(&self.token, gateway_intents())
            .event_handler(Handler { presence_tx })
            .await?;

        if let Err(why) = client.start().await {
            error!(error = ?why, "Discord client error");
            anyhow::bail!("Discord client error: {:?}", why);
        }

        Ok(())
    }
}
