use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::StayError;
use crate::message::Message;
use crate::types::Card;

/// Trait for all long-running staytime components (PresenceHandler, Scheduler, Announcer).
///
/// Each component receives messages from its channel and runs in its own Tokio task.
#[async_trait]
pub trait Component: Send + Sync + 'static {
    /// Human-readable name of this component.
    fn name(&self) -> &str;

    /// Start the component's event loop, consuming from the given receiver.
    async fn start(&self, rx: mpsc::Receiver<Message>) -> anyhow::Result<()>;
}

/// Outbound notifications to a chat channel.
#[async_trait]
pub trait MessagingSink: Send + Sync {
    /// Sink name for logging (e.g., "discord").
    fn name(&self) -> &str;

    /// Post a plain text message.
    async fn send_text(&self, channel_id: &str, text: &str) -> Result<(), StayError>;

    /// Post a rich card (title, body, accent colour).
    async fn send_card(&self, channel_id: &str, card: &Card) -> Result<(), StayError>;
}
