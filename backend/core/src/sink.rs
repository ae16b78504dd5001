//! In-process messaging sinks: one that only logs, one that records.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::info;

use crate::error::StayError;
use crate::traits::MessagingSink;
use crate::types::Card;

/// Writes every notification to the log instead of a chat service.
pub struct LogSink;

#[async_trait]
impl MessagingSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    async fn send_text(&self, channel_id: &str, text: &str) -> Result<(), StayError> {
        info!(channel = %channel_id, text = %text, "Text message (not sent)");
        Ok(())
    }

    async fn send_card(&self, channel_id: &str, card: &Card) -> Result<(), StayError> {
        info!(
            channel = %channel_id,
            title = %card.title,
            body = %card.body,
            color = card.color,
            "Card (not sent)"
        );
        Ok(())
    }
}

/// A notification captured by [`RecordingSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentMessage {
    Text { channel_id: String, text: String },
    Card { channel_id: String, card: Card },
}

/// Keeps every notification in memory. Can be switched into a failing mode.
#[derive(Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<SentMessage>>,
    failing: AtomicBool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every send returns `MessagingIo` until switched back.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().await.clone()
    }

    pub async fn texts(&self) -> Vec<String> {
        self.sent
            .lock()
            .await
            .iter()
            .filter_map(|m| match m {
                SentMessage::Text { text, .. } => Some(text.clone()),
                SentMessage::Card { .. } => None,
            })
            .collect()
    }

    pub async fn cards(&self) -> Vec<Card> {
        self.sent
            .lock()
            .await
            .iter()
            .filter_map(|m| match m {
                SentMessage::Card { card, .. } => Some(card.clone()),
                SentMessage::Text { .. } => None,
            })
            .collect()
    }

    fn check(&self) -> Result<(), StayError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StayError::messaging("recording sink set to fail"));
        }
        Ok(())
    }
}

#[async_trait]
impl MessagingSink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    async fn send_text(&self, channel_id: &str, text: &str) -> Result<(), StayError> {
        self.check()?;
        self.sent.lock().await.push(SentMessage::Text {
            channel_id: channel_id.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn send_card(&self, channel_id: &str, card: &Card) -> Result<(), StayError> {
        self.check()?;
        self.sent.lock().await.push(SentMessage::Card {
            channel_id: channel_id.to_string(),
            card: card.clone(),
        });
        Ok(())
    }
}
