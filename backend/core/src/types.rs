use serde::{Deserialize, Serialize};

/// Accent colour used for leaderboard cards.
pub const DEFAULT_CARD_COLOR: u32 = 0x00ff00;

/// Persistent per-user record owned by the directory.
///
/// Field names on the wire match the stored documents
/// (`UserID`, `UserName`, `TotalStayingTime`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(rename = "UserID")]
    pub user_id: String,
    #[serde(rename = "UserName", default)]
    pub user_name: String,
    /// All-time accumulated seconds. Never decreases.
    #[serde(rename = "TotalStayingTime", default)]
    pub total_staying_time: i64,
    /// Seconds accumulated since the last weekly reset.
    #[serde(rename = "WeeklyStayingTime", default)]
    pub weekly_staying_time: i64,
    /// Reserved; always written as 0.
    #[serde(rename = "UserRank", default)]
    pub user_rank: i64,
}

impl UserProfile {
    /// A zeroed profile, used when the directory has no record yet.
    pub fn empty(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            user_name: String::new(),
            total_staying_time: 0,
            weekly_staying_time: 0,
            user_rank: 0,
        }
    }

    /// Add one completed session to both counters.
    pub fn add_session(&mut self, seconds: i64) {
        let seconds = seconds.max(0);
        self.total_staying_time += seconds;
        self.weekly_staying_time += seconds;
        self.user_rank = 0;
    }
}

/// One line of the weekly leaderboard. Derived, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedEntry {
    pub user_id: String,
    pub user_name: String,
    pub weekly_staying_time: i64,
}

impl From<&UserProfile> for RankedEntry {
    fn from(profile: &UserProfile) -> Self {
        Self {
            user_id: profile.user_id.clone(),
            user_name: profile.user_name.clone(),
            weekly_staying_time: profile.weekly_staying_time,
        }
    }
}

/// A rich notification: title, body and accent colour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub title: String,
    pub body: String,
    pub color: u32,
}
