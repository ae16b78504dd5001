use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::event::PresenceEvent;

/// Messages exchanged between components via the StayBus.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    /// Gateway → PresenceHandler: a voice state changed
    Presence(PresenceEvent),
    /// Anyone → Scheduler: fire an announcement now, outside the cron cadence
    ScheduleAnnouncement(AnnounceTrigger),
    /// Scheduler → Announcer: run the leaderboard batch
    AnnounceLeaderboard(AnnounceTrigger),
}

/// A request to run one leaderboard batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnounceTrigger {
    pub run_id: Uuid,
    pub reason: String,
    /// Clear the announced weekly time after announcing.
    pub reset: bool,
}

impl AnnounceTrigger {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            reason: reason.into(),
            reset: true,
        }
    }

    pub fn without_reset(mut self) -> Self {
        self.reset = false;
        self
    }
}

impl Message {
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Presence(_) => "presence",
            Message::ScheduleAnnouncement(_) => "schedule_announcement",
            Message::AnnounceLeaderboard(_) => "announce_leaderboard",
        }
    }
}
