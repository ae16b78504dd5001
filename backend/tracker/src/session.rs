//! In-flight voice sessions, keyed by user.
//!
//! Sessions live only in process memory. A leave whose join was never seen
//! (restart, or the user was already absent) is reported and dropped.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use staytime_core::StayError;

/// Result of recording a join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// No session was open for this user.
    Opened,
    /// A session was already open; its join time was replaced.
    Rejoined { previous: DateTime<Utc> },
}

/// A session that has been closed by a leave event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedSession {
    pub user_id: String,
    pub joined_at: DateTime<Utc>,
    pub left_at: DateTime<Utc>,
}

impl CompletedSession {
    /// Exact elapsed time between join and leave.
    pub fn duration(&self) -> Duration {
        self.left_at - self.joined_at
    }

    /// Elapsed whole seconds, truncated, never negative.
    pub fn seconds(&self) -> i64 {
        self.duration().num_seconds().max(0)
    }
}

/// Maps each user with an open session to their join time.
pub struct SessionTracker {
    open: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self {
            open: Mutex::new(HashMap::new()),
        }
    }

    /// Record that `user_id` joined at `now`. Last join wins.
    pub async fn on_join(&self, user_id: &str, now: DateTime<Utc>) -> JoinOutcome {
        let mut open = self.open.lock().await;
        match open.insert(user_id.to_string(), now) {
            Some(previous) => {
                warn!(
                    user = %user_id,
                    previous = %previous,
                    joined_at = %now,
                    "Join for a user with an open session; keeping the latest join time"
                );
                JoinOutcome::Rejoined { previous }
            }
            None => {
                info!(user = %user_id, joined_at = %now, "Session opened");
                JoinOutcome::Opened
            }
        }
    }

    /// Close the open session for `user_id` and return it.
    pub async fn on_leave(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<CompletedSession, StayError> {
        let joined_at = self
            .open
            .lock()
            .await
            .remove(user_id)
            .ok_or_else(|| StayError::SessionNotFound {
                user_id: user_id.to_string(),
            })?;

        if now < joined_at {
            warn!(user = %user_id, joined_at = %joined_at, left_at = %now, "Leave precedes join; clamping to zero");
        }

        let session = CompletedSession {
            user_id: user_id.to_string(),
            joined_at,
            left_at: now,
        };
        debug!(user = %user_id, seconds = session.seconds(), "Session closed");
        Ok(session)
    }

    pub async fn is_open(&self, user_id: &str) -> bool {
        self.open.lock().await.contains_key(user_id)
    }

    /// Users with an open session and their join times, sorted by user ID.
    pub async fn open_sessions(&self) -> Vec<(String, DateTime<Utc>)> {
        let mut sessions: Vec<_> = self
            .open
            .lock()
            .await
            .iter()
            .map(|(user, at)| (user.clone(), *at))
            .collect();
        sessions.sort();
        sessions
    }
}

impl Default for SessionTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    #[tokio::test]
    async fn test_leave_returns_exact_duration() {
        let tracker = SessionTracker::new();
        assert_eq!(tracker.on_join("u1", at(0)).await, JoinOutcome::Opened);

        let session = tracker.on_leave("u1", at(3661)).await.unwrap();
        assert_eq!(session.duration(), Duration::seconds(3661));
        assert_eq!(session.seconds(), 3661);
        assert!(!tracker.is_open("u1").await);
    }

    #[tokio::test]
    async fn test_leave_without_join_is_not_found() {
        let tracker = SessionTracker::new();
        let err = tracker.on_leave("ghost", at(10)).await.unwrap_err();
        assert!(matches!(err, StayError::SessionNotFound { ref user_id } if user_id == "ghost"));
    }

    #[tokio::test]
    async fn test_second_leave_is_not_found() {
        let tracker = SessionTracker::new();
        tracker.on_join("u1", at(0)).await;
        tracker.on_leave("u1", at(5)).await.unwrap();
        assert!(tracker.on_leave("u1", at(6)).await.is_err());
    }

    #[tokio::test]
    async fn test_duplicate_join_last_wins() {
        let tracker = SessionTracker::new();
        tracker.on_join("u1", at(0)).await;
        let outcome = tracker.on_join("u1", at(100)).await;
        assert_eq!(outcome, JoinOutcome::Rejoined { previous: at(0) });

        let session = tracker.on_leave("u1", at(160)).await.unwrap();
        assert_eq!(session.seconds(), 60);
    }

    #[tokio::test]
    async fn test_subsecond_truncation_and_skew() {
        let tracker = SessionTracker::new();
        let joined = at(0);
        tracker.on_join("u1", joined).await;
        let session = tracker
            .on_leave("u1", joined + Duration::milliseconds(2_999))
            .await
            .unwrap();
        assert_eq!(session.seconds(), 2);

        tracker.on_join("u2", at(50)).await;
        let skewed = tracker.on_leave("u2", at(40)).await.unwrap();
        assert_eq!(skewed.seconds(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_users_are_independent() {
        let tracker = Arc::new(SessionTracker::new());
        let mut handles = Vec::new();
        for i in 0..32i64 {
            let tracker = Arc::clone(&tracker);
            handles.push(tokio::spawn(async move {
                let user = format!("user-{i}");
                tracker.on_join(&user, at(0)).await;
                tracker.on_leave(&user, at(i)).await.unwrap().seconds()
            }));
        }
        let mut total = 0;
        for handle in handles {
            total += handle.await.unwrap();
        }
        assert_eq!(total, (0..32).sum::<i64>());
        assert!(tracker.open_sessions().await.is_empty());
    }
}
