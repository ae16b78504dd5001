use async_trait::async_trait;
use staytime_core::Message;
use tokio::sync::mpsc;

pub mod discord;
pub mod discord_sink;

pub use discord::DiscordGateway;
pub use discord_sink::DiscordSink;

/// Sources of voice presence events implement this trait.
#[async_trait]
pub trait PresenceAdapter: Send + Sync {
    /// Human-readable adapter name for logging.
    fn name(&self) -> &str;

    /// Connect and forward every presence change to `presence_tx` until the
    /// connection ends.
    async fn start(&self, presence_tx: mpsc::Sender<Message>) -> anyhow::Result<()>;
}
