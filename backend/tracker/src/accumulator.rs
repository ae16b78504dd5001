//! Folds a completed session into the user's stored totals.

use std::sync::Arc;

use chrono::Duration;
use tracing::{debug, info};

use staytime_core::{StayError, UserProfile};
use staytime_directory::Directory;

use crate::locks::UserLocks;

pub struct ProfileAccumulator {
    directory: Arc<dyn Directory>,
    locks: Arc<UserLocks>,
}

impl ProfileAccumulator {
    pub fn new(directory: Arc<dyn Directory>, locks: Arc<UserLocks>) -> Self {
        Self { directory, locks }
    }

    /// Add `duration` (whole seconds, truncated) to both of the user's counters.
    ///
    /// `user_name` replaces the stored display name when given. The record's
    /// rank is always written as 0. Runs under the user's lock; uses the
    /// directory's atomic increment when it has one, get + put otherwise.
    pub async fn apply_session(
        &self,
        user_id: &str,
        user_name: Option<&str>,
        duration: Duration,
    ) -> Result<UserProfile, StayError> {
        let seconds = duration.num_seconds().max(0);
        let _guard = self.locks.lock(user_id).await;

        if let Some(updated) = self.directory.increment(user_id, user_name, seconds).await? {
            debug!(user = %user_id, seconds, backend = self.directory.name(), "Applied session via increment");
            return Ok(updated);
        }

        let mut profile = self
            .directory
            .get(user_id)
            .await?
            .unwrap_or_else(|| UserProfile::empty(user_id));

        profile.user_id = user_id.to_string();
        match user_name {
            Some(name) => profile.user_name = name.to_string(),
            None if profile.user_name.is_empty() => profile.user_name = user_id.to_string(),
            None => {}
        }
        profile.add_session(seconds);

        self.directory.put(&profile).await?;
        info!(
            user = %user_id,
            seconds,
            total = profile.total_staying_time,
            weekly = profile.weekly_staying_time,
            "Applied session"
        );
        Ok(profile)
    }
}
