//! Weekly counter reset over a directory snapshot.

use std::sync::Arc;

use tracing::{info, warn};

use staytime_core::StayError;
use staytime_directory::{Directory, Snapshot};

use crate::locks::UserLocks;

/// Outcome of one reset pass.
#[derive(Debug, Default)]
pub struct ResetReport {
    /// Records whose announced weekly time was taken off.
    pub updated: usize,
    /// Records in the snapshot that no longer exist in the directory.
    pub missing: usize,
    /// Records that could not be reset, with the reason.
    pub failures: Vec<(String, StayError)>,
}

impl ResetReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct WeeklyResetter {
    directory: Arc<dyn Directory>,
    locks: Arc<UserLocks>,
}

impl WeeklyResetter {
    pub fn new(directory: Arc<dyn Directory>, locks: Arc<UserLocks>) -> Self {
        Self { directory, locks }
    }

    /// Take the weekly time each profile in `snapshot` showed off its counter.
    ///
    /// Only the records in the snapshot are touched, each under its user lock.
    /// Sessions that closed after the snapshot was read stay on the counter
    /// for next week. A failing record is collected and the pass moves on.
    pub async fn reset_all(&self, snapshot: &Snapshot) -> ResetReport {
        let mut report = ResetReport::default();

        for profile in &snapshot.profiles {
            let user_id = profile.user_id.as_str();
            let _guard = self.locks.lock(user_id).await;
            match self.directory
                .reset_weekly(user_id, profile.weekly_staying_time)
                .await {
                Ok(true) => report.updated += 1,
                Ok(false) => {
                    warn!(user = %user_id, "Profile vanished before reset");
                    report.missing += 1;
                }
                Err(e) => {
                    warn!(user = %user_id, error = %e, "Failed to reset weekly staying time");
                    report.failures.push((user_id.to_string(), e));
                }
            }
        }

        info!(
            updated = report.updated,
            missing = report.missing,
            failed = report.failures.len(),
            "Weekly staying time reset"
        );
        report
    }
}
