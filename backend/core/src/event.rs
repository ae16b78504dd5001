use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A raw voice presence change delivered by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceEvent {
    pub user_id: String,
    /// Display name from the gateway payload, when it carried one.
    pub user_name: Option<String>,
    /// Channel the user is in after the update; `None` when disconnected.
    pub channel_id: Option<String>,
    /// Whether the user was in some voice channel before the update.
    pub had_previous_channel: bool,
    pub at: DateTime<Utc>,
}

/// What a presence event means for the tracked channel.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    /// The user entered the tracked channel from no channel.
    Join,
    /// The user left voice entirely.
    Leave,
}

impl PresenceEvent {
    pub fn new(
        user_id: impl Into<String>,
        channel_id: Option<String>,
        had_previous_channel: bool,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            user_name: None,
            channel_id,
            had_previous_channel,
            at,
        }
    }

    pub fn with_user_name(mut self, name: impl Into<String>) -> Self {
        self.user_name = Some(name.into());
        self
    }

    /// Classify this event against the tracked channel.
    ///
    /// Moves between channels, and entering the tracked channel from another
    /// one, are not transitions.
    pub fn transition(&self, tracked_channel_id: &str) -> Option<Transition> {
        match (&self.channel_id, self.had_previous_channel) {
            (Some(channel), false) if channel == tracked_channel_id => Some(Transition::Join),
            (None, true) => Some(Transition::Leave),
            _ => None,
        }
    }
}

impl std::fmt::Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = serde_json::to_value(self)
            .ok()
            .and_then(|v| v.as_str().map(String::from))
            .unwrap_or_else(|| format!("{:?}", self));
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRACKED: &str = "900";

    fn event(channel: Option<&str>, had_previous: bool) -> PresenceEvent {
        PresenceEvent::new("u1", channel.map(String::from), had_previous, Utc::now())
    }

    #[test]
    fn test_join_into_tracked_channel() {
        assert_eq!(event(Some(TRACKED), false).transition(TRACKED), Some(Transition::Join));
    }

    #[test]
    fn test_leave_from_any_channel() {
        assert_eq!(event(None, true).transition(TRACKED), Some(Transition::Leave));
    }

    #[test]
    fn test_other_transitions_ignored() {
        // Joining some other channel.
        assert_eq!(event(Some("111"), false).transition(TRACKED), None);
        // Moving into the tracked channel from elsewhere.
        assert_eq!(event(Some(TRACKED), true).transition(TRACKED), None);
        // Moving between two other channels.
        assert_eq!(event(Some("111"), true).transition(TRACKED), None);
        // Disconnect with no known previous state.
        assert_eq!(event(None, false).transition(TRACKED), None);
    }

    #[test]
    fn test_transition_display() {
        assert_eq!(Transition::Join.to_string(), "join");
        assert_eq!(Transition::Leave.to_string(), "leave");
    }
}
