use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use staytime_core::{
    Component, Message, MessagingSink, PresenceEvent, Transition, UserProfile,
};

use crate::accumulator::ProfileAccumulator;
use crate::compose::compose_session_end;
use crate::format::format_duration;
use crate::session::{CompletedSession, SessionTracker};

/// A session closed by a leave event, waiting to be written and announced.
#[derive(Debug, Clone)]
pub struct ClosedSession {
    pub session: CompletedSession,
    pub user_name: Option<String>,
}

/// What happened after a session was closed.
#[derive(Debug)]
pub struct Settled {
    /// The stored profile, or `None` if the directory write failed.
    pub profile: Option<UserProfile>,
    /// Whether the thank-you message was delivered.
    pub notified: bool,
}

/// Consumes presence events and turns closed sessions into directory updates
/// and per-user messages.
#[derive(Clone)]
pub struct PresenceHandler {
    tracked_channel_id: String,
    text_channel_id: String,
    sessions: Arc<SessionTracker>,
    accumulator: Arc<ProfileAccumulator>,
    sink: Arc<dyn MessagingSink>,
}

impl PresenceHandler {
    pub fn new(
        tracked_channel_id: impl Into<String>,
        text_channel_id: impl Into<String>,
        sessions: Arc<SessionTracker>,
        accumulator: Arc<ProfileAccumulator>,
        sink: Arc<dyn MessagingSink>,
    ) -> Self {
        Self {
            tracked_channel_id: tracked_channel_id.into(),
            text_channel_id: text_channel_id.into(),
            sessions,
            accumulator,
            sink,
        }
    }

    /// Apply one event to the session map.
    ///
    /// Returns the closed session on a leave that matched an open session.
    /// Events must be observed in arrival order.
    pub async fn observe(&self, event: &PresenceEvent) -> Option<ClosedSession> {
        match event.transition(&self.tracked_channel_id)? {
            Transition::Join => {
                self.sessions.on_join(&event.user_id, event.at).await;
                None
            }
            Transition::Leave => match self.sessions.on_leave(&event.user_id, event.at).await {
                Ok(session) => Some(ClosedSession {
                    session,
                    user_name: event.user_name.clone(),
                }),
                Err(e) => {
                    warn!(user = %event.user_id, error = %e, "Leave without a tracked join; ignoring");
                    None
                }
            },
        }
    }

    /// Write the closed session to the directory, then thank the user.
    ///
    /// The two steps fail independently: a failed write still sends the
    /// message and a failed message never undoes the write. Neither is retried.
    pub async fn settle(&self, closed: ClosedSession) -> Settled {
        let session = &closed.session;
        let user_id = session.user_id.as_str();

        let profile = match self
            .accumulator
            .apply_session(user_id, closed.user_name.as_deref(), session.duration())
            .await
        {
            Ok(profile) => Some(profile),
            Err(e) => {
                error!(
                    user = %user_id,
                    seconds = session.seconds(),
                    error = %e,
                    "Failed to record session; dropping it"
                );
                None
            }
        };

        let formatted = format_duration(session.seconds());
        let text = compose_session_end(user_id, &formatted);
        let notified = match self.sink.send_text(&self.text_channel_id, &text).await {
            Ok(()) => true,
            Err(e) => {
                error!(user = %user_id, sink = self.sink.name(), error = %e, "Failed to send session message");
                false
            }
        };

        info!(user = %user_id, duration = %formatted, "Session settled");
        Settled { profile, notified }
    }

    /// Observe, then settle inline. Convenience for one-off callers and tests.
    pub async fn handle(&self, event: &PresenceEvent) -> Option<Settled> {
        let closed = self.observe(event).await?;
        Some(self.settle(closed).await)
    }
}

#[async_trait]
impl Component for PresenceHandler {
    fn name(&self) -> &str {
        "presence"
    }

    async fn start(&self, mut rx: mpsc::Receiver<Message>) -> Result<()> {
        info!(channel = %self.tracked_channel_id, "Presence handler started");

        // Settling runs off the event loop so a slow directory write for one
        // user never delays events for anyone else.
        let mut settling = JoinSet::new();

        while let Some(msg) = rx.recv().await {
            match msg {
                Message::Presence(event) => {
                    if let Some(closed) = self.observe(&event).await {
                        let handler = self.clone();
                        settling.spawn(async move {
                            handler.settle(closed).await;
                        });
                    }
                }
                other => {
                    debug!(msg_type = other.kind(), "Presence handler ignoring message");
                }
            }

            while let Some(done) = settling.try_join_next() {
                if let Err(e) = done {
                    error!(error = %e, "Settle task panicked");
                }
            }
        }

        info!(pending = settling.len(), "Presence channel closed, draining");
        while let Some(done) = settling.join_next().await {
            if let Err(e) = done {
                error!(error = %e, "Settle task panicked");
            }
        }
        Ok(())
    }
}
