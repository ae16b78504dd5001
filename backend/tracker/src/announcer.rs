//! The weekly batch: one snapshot, one announcement, one reset.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use staytime_core::types::DEFAULT_CARD_COLOR;
use staytime_core::{
    AnnounceTrigger, Card, Component, Message, MessagingSink, RankedEntry, StayError,
};
use staytime_directory::Directory;

use crate::compose::{compose_leaderboard, compose_mention_line};
use crate::locks::UserLocks;
use crate::ranker::{rank, DEFAULT_TOP_N};
use crate::resetter::{ResetReport, WeeklyResetter};

#[derive(Debug, Clone)]
pub struct AnnouncerConfig {
    pub text_channel_id: String,
    pub top_n: usize,
    pub card_color: u32,
}

impl AnnouncerConfig {
    pub fn new(text_channel_id: impl Into<String>) -> Self {
        Self {
            text_channel_id: text_channel_id.into(),
            top_n: DEFAULT_TOP_N,
            card_color: DEFAULT_CARD_COLOR,
        }
    }
}

/// Summary of one batch run.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub ranked: Vec<RankedEntry>,
    /// Profiles in the snapshot the run worked from.
    pub snapshot_size: usize,
    /// Records the snapshot could not decode.
    pub unreadable: usize,
    pub mention_sent: bool,
    pub card_sent: bool,
    /// `None` when the run was told not to reset.
    pub reset_updated: Option<usize>,
    pub reset_failed: usize,
}

pub struct Announcer {
    directory: Arc<dyn Directory>,
    sink: Arc<dyn MessagingSink>,
    resetter: WeeklyResetter,
    locks: Arc<UserLocks>,
    config: AnnouncerConfig,
}

impl Announcer {
    pub fn new(
        directory: Arc<dyn Directory>,
        sink: Arc<dyn MessagingSink>,
        locks: Arc<UserLocks>,
        config: AnnouncerConfig,
    ) -> Self {
        Self {
            resetter: WeeklyResetter::new(Arc::clone(&directory), Arc::clone(&locks)),
            directory,
            sink,
            locks,
            config,
        }
    }

    /// Current top-N without sending or resetting anything.
    pub async fn preview(&self) -> Result<Vec<RankedEntry>, StayError> {
        let snapshot = self.directory.snapshot().await?;
        Ok(rank(&snapshot.profiles, self.config.top_n))
    }

    /// Run one batch: snapshot, rank, announce, then reset the same snapshot.
    ///
    /// Only a failed snapshot read aborts the run. Messaging failures are
    /// logged and the reset still happens; per-record reset failures are
    /// collected in the report.
    pub async fn run(&self, trigger: &AnnounceTrigger) -> Result<RunReport, StayError> {
        info!(run_id = %trigger.run_id, reason = %trigger.reason, reset = trigger.reset, "Leaderboard run started");

        let snapshot = self.directory.snapshot().await?;
        if !snapshot.failures.is_empty() {
            warn!(
                run_id = %trigger.run_id,
                unreadable = snapshot.failures.len(),
                "Snapshot skipped unreadable records"
            );
        }

        let ranked = rank(&snapshot.profiles, self.config.top_n);
        let channel = self.config.text_channel_id.as_str();

        let mention = compose_mention_line(&ranked, self.config.top_n);
        let mention_sent = if mention.is_empty() {
            debug!(run_id = %trigger.run_id, "Nobody qualified, no mention line");
            false
        } else {
            self.deliver("mention", self.sink.send_text(channel, &mention).await)
        };

        let card = compose_leaderboard(&ranked, self.config.top_n);
        let card = Card {
            color: self.config.card_color,
            ..card
        };
        let card_sent = self.deliver("leaderboard", self.sink.send_card(channel, &card).await);

        let reset: Option<ResetReport> = if trigger.reset {
            Some(self.resetter.reset_all(&snapshot).await)
        } else {
            None
        };
        self.locks.prune().await;

        let report = RunReport {
            run_id: trigger.run_id,
            snapshot_size: snapshot.len(),
            unreadable: snapshot.failures.len(),
            mention_sent,
            card_sent,
            reset_updated: reset.as_ref().map(|r| r.updated),
            reset_failed: reset.as_ref().map(|r| r.failures.len()).unwrap_or(0),
            ranked,
        };
        info!(
            run_id = %report.run_id,
            ranked = report.ranked.len(),
            snapshot = report.snapshot_size,
            reset = ?report.reset_updated,
            "Leaderboard run finished"
        );
        Ok(report)
    }

    fn deliver(&self, what: &str, result: Result<(), StayError>) -> bool {
        match result {
            Ok(()) => true,
            Err(e) => {
                error!(message = %what, sink = self.sink.name(), error = %e, "Failed to send announcement");
                false
            }
        }
    }
}

#[async_trait]
impl Component for Announcer {
    fn name(&self) -> &str {
        "announcer"
    }

    async fn start(&self, mut rx: mpsc::Receiver<Message>) -> Result<()> {
        info!(top_n = self.config.top_n, "Announcer started");

        // Runs are processed one at a time, so two resets never overlap.
        while let Some(msg) = rx.recv().await {
            match msg {
                Message::AnnounceLeaderboard(trigger) => {
                    if let Err(e) = self.run(&trigger).await {
                        error!(run_id = %trigger.run_id, error = %e, "Leaderboard run failed");
                    }
                }
                other => {
                    debug!(msg_type = other.kind(), "Announcer ignoring message");
                }
            }
        }

        info!("Announcer channel closed, shutting down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use staytime_core::{RecordingSink, UserProfile};
    use staytime_directory::InMemoryDirectory;

    const TEXT: &str = "800";

    fn profile(id: &str, weekly: i64) -> UserProfile {
        UserProfile {
            user_id: id.into(),
            user_name: id.into(),
            total_staying_time: weekly * 2,
            weekly_staying_time: weekly,
            user_rank: 0,
        }
    }

    async fn setup(
        profiles: Vec<UserProfile>,
    ) -> (Announcer, Arc<InMemoryDirectory>, Arc<RecordingSink>) {
        let directory = Arc::new(InMemoryDirectory::with_profiles(profiles).await);
        let sink = Arc::new(RecordingSink::new());
        let announcer = Announcer::new(
            directory.clone(),
            sink.clone(),
            Arc::new(UserLocks::new()),
            AnnouncerConfig::new(TEXT),
        );
        (announcer, directory, sink)
    }

    #[tokio::test]
    async fn test_run_announces_and_resets() {
        let (announcer, directory, sink) =
            setup(vec![profile("a", 10), profile("b", 40), profile("c", 0), profile("d", 20)]).await;

        let report = announcer.run(&AnnounceTrigger::new("test")).await.unwrap();
        assert_eq!(report.snapshot_size, 4);
        assert_eq!(report.reset_updated, Some(4));
        assert!(report.mention_sent && report.card_sent);

        assert_eq!(sink.texts().await, vec!["<@b> <@d> <@a>".to_string()]);
        let cards = sink.cards().await;
        assert_eq!(cards[0].title, "🔥今週の滞在時間トップ3🔥");

        let after = directory.snapshot().await.unwrap();
        assert!(after.profiles.iter().all(|p| p.weekly_staying_time == 0));
        assert_eq!(directory.get("b").await.unwrap().unwrap().total_staying_time, 80);
    }

    #[tokio::test]
    async fn test_run_without_participants() {
        let (announcer, _directory, sink) = setup(vec![profile("a", 0)]).await;
        let report = announcer.run(&AnnounceTrigger::new("test")).await.unwrap();

        assert!(report.ranked.is_empty());
        assert!(!report.mention_sent);
        assert!(sink.texts().await.is_empty());
        assert_eq!(sink.cards().await[0].title, "今週の滞在者なし😢");
    }

    #[tokio::test]
    async fn test_run_without_reset_keeps_counters() {
        let (announcer, directory, _sink) = setup(vec![profile("a", 10)]).await;
        let report = announcer
            .run(&AnnounceTrigger::new("dry").without_reset())
            .await
            .unwrap();
        assert_eq!(report.reset_updated, None);
        assert_eq!(directory.get("a").await.unwrap().unwrap().weekly_staying_time, 10);
    }

    #[tokio::test]
    async fn test_messaging_failure_does_not_block_reset() {
        let (announcer, directory, sink) = setup(vec![profile("a", 10)]).await;
        sink.set_failing(true);

        let report = announcer.run(&AnnounceTrigger::new("test")).await.unwrap();
        assert!(!report.card_sent);
        assert_eq!(report.reset_updated, Some(1));
        assert_eq!(directory.get("a").await.unwrap().unwrap().weekly_staying_time, 0);
    }

    #[tokio::test]
    async fn test_card_uses_configured_color() {
        let directory = Arc::new(InMemoryDirectory::new());
        let sink = Arc::new(RecordingSink::new());
        let mut config = AnnouncerConfig::new(TEXT);
        config.card_color = 0xff8800;
        config.top_n = 5;
        let announcer = Announcer::new(directory, sink.clone(), Arc::new(UserLocks::new()), config);

        announcer.run(&AnnounceTrigger::new("test")).await.unwrap();
        let card = &sink.cards().await[0];
        assert_eq!(card.color, 0xff8800);
        assert!(card.body.contains("**5位:** ---"));
    }

    /// Closes a session for `user` while the leaderboard card is in flight.
    struct SettlingSink {
        accumulator: crate::ProfileAccumulator,
        user: &'static str,
        seconds: i64,
    }

    #[async_trait]
    impl MessagingSink for SettlingSink {
        fn name(&self) -> &str {
            "settling"
        }

        async fn send_text(&self, _channel_id: &str, _text: &str) -> Result<(), StayError> {
            Ok(())
        }

        async fn send_card(&self, _channel_id: &str, _card: &Card) -> Result<(), StayError> {
            self.accumulator
                .apply_session(self.user, None, chrono::Duration::seconds(self.seconds))
                .await?;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_session_closed_during_announcement_is_kept() {
        let directory = Arc::new(InMemoryDirectory::with_profiles(vec![profile("a", 100)]).await);
        let locks = Arc::new(UserLocks::new());
        let sink = Arc::new(SettlingSink {
            accumulator: crate::ProfileAccumulator::new(directory.clone(), Arc::clone(&locks)),
            user: "a",
            seconds: 50,
        });
        let announcer = Announcer::new(directory.clone(), sink, locks, AnnouncerConfig::new(TEXT));

        let report = announcer.run(&AnnounceTrigger::new("test")).await.unwrap();
        assert_eq!(report.ranked[0].weekly_staying_time, 100);

        let a = directory.get("a").await.unwrap().unwrap();
        assert_eq!(a.total_staying_time, 250);
        assert_eq!(a.weekly_staying_time, 50);

        let again = announcer.run(&AnnounceTrigger::new("next week")).await.unwrap();
        assert_eq!(again.ranked[0].weekly_staying_time, 50);
        assert_eq!(directory.get("a").await.unwrap().unwrap().weekly_staying_time, 0);
    }

    #[tokio::test]
    async fn test_preview_changes_nothing() {
        let (announcer, directory, sink) = setup(vec![profile("a", 10), profile("b", 5)]).await;
        let ranked = announcer.preview().await.unwrap();
        assert_eq!(ranked.len(), 2);
        assert!(sink.sent().await.is_empty());
        assert_eq!(directory.get("a").await.unwrap().unwrap().weekly_staying_time, 10);
    }
}
