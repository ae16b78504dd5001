use std::str::FromStr;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cron::Schedule;
use tokio::sync::mpsc;
use tokio::time::{self, Duration, Instant};
use tracing::{debug, error, info, warn};

use staytime_core::{AnnounceTrigger, Component, Message};

/// Parse a 6- or 7-field cron expression (seconds first).
pub fn parse_schedule(expression: &str) -> Result<Schedule> {
    Schedule::from_str(expression.trim())
        .with_context(|| format!("invalid cron expression '{expression}'"))
}

/// Fires the weekly leaderboard run on a cron schedule and forwards manual
/// triggers to the announcer.
pub struct Scheduler {
    expression: String,
    schedule: Schedule,
    announcer_tx: mpsc::Sender<Message>,
}

impl Scheduler {
    pub fn new(expression: &str, announcer_tx: mpsc::Sender<Message>) -> Result<Self> {
        let schedule = parse_schedule(expression)?;
        Ok(Self {
            expression: expression.trim().to_string(),
            schedule,
            announcer_tx,
        })
    }

    /// Next occurrence strictly after `now`.
    pub fn next_after(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(&now).next()
    }

    fn next_deadline(&self) -> Option<(DateTime<Utc>, Instant)> {
        let now = Utc::now();
        let next = self.next_after(now)?;
        let until = (next - now).to_std().unwrap_or(Duration::from_secs(1));
        Some((next, Instant::now() + until))
    }

    async fn dispatch(&self, trigger: AnnounceTrigger) {
        let run_id = trigger.run_id;
        if let Err(e) = self
            .announcer_tx
            .send(Message::AnnounceLeaderboard(trigger))
            .await
        {
            error!(run_id = %run_id, error = %e, "Failed to dispatch leaderboard run");
        }
    }
}

#[async_trait]
impl Component for Scheduler {
    fn name(&self) -> &str {
        "scheduler"
    }

    async fn start(&self, mut rx: mpsc::Receiver<Message>) -> Result<()> {
        let mut deadline = self.next_deadline();
        match &deadline {
            Some((next, _)) => info!(cron = %self.expression, next = %next, "Scheduler started"),
            None => warn!(cron = %self.expression, "Cron expression has no upcoming occurrence"),
        }

        loop {
            let sleep_until = deadline
                .map(|(_, at)| at)
                .unwrap_or_else(|| Instant::now() + Duration::from_secs(86_400 * 365));

            tokio::select! {
                _ = time::sleep_until(sleep_until), if deadline.is_some() => {
                    let trigger = AnnounceTrigger::new("scheduled");
                    info!(run_id = %trigger.run_id, "Cron fired, dispatching leaderboard run");
                    self.dispatch(trigger).await;

                    deadline = self.next_deadline();
                    if let Some((next, _)) = &deadline {
                        debug!(next = %next, "Rescheduled");
                    }
                }
                msg = rx.recv() => {
                    match msg {
                        Some(Message::ScheduleAnnouncement(trigger)) => {
                            info!(
                                run_id = %trigger.run_id,
                                reason = %trigger.reason,
                                reset = trigger.reset,
                                "Manual trigger received"
                            );
                            self.dispatch(trigger).await;
                        }
                        Some(other) => {
                            debug!(msg_type = other.kind(), "Scheduler ignoring non-schedule message");
                        }
                        None => {
                            info!("Scheduler channel closed, shutting down");
                            break;
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone, Timelike, Weekday};

    const WEEKLY: &str = "0 0 9 * * Mon";

    #[test]
    fn test_invalid_expression_is_rejected() {
        let (tx, _rx) = mpsc::channel(1);
        assert!(Scheduler::new("not a cron", tx.clone()).is_err());
        assert!(Scheduler::new("", tx).is_err());
    }

    #[test]
    fn test_weekly_expression_next_occurrence() {
        let (tx, _rx) = mpsc::channel(1);
        let scheduler = Scheduler::new(WEEKLY, tx).unwrap();

        // 2024-01-03 is a Wednesday.
        let now = Utc.with_ymd_and_hms(2024, 1, 3, 12, 0, 0).unwrap();
        let next = scheduler.next_after(now).unwrap();
        assert_eq!(next.weekday(), Weekday::Mon);
        assert_eq!(next.day(), 8);
        assert_eq!(next.hour(), 9);
        assert_eq!(next.minute(), 0);
    }

    #[tokio::test]
    async fn test_manual_trigger_forwarded() {
        let (announcer_tx, mut announcer_rx) = mpsc::channel(16);
        let (scheduler_tx, scheduler_rx) = mpsc::channel(16);
        let scheduler = Scheduler::new(WEEKLY, announcer_tx).unwrap();

        let handle = tokio::spawn(async move {
            scheduler.start(scheduler_rx).await.unwrap();
        });

        let trigger = AnnounceTrigger::new("manual").without_reset();
        let run_id = trigger.run_id;
        scheduler_tx
            .send(Message::ScheduleAnnouncement(trigger))
            .await
            .unwrap();

        let msg = tokio::time::timeout(Duration::from_secs(2), announcer_rx.recv())
            .await
            .unwrap()
            .unwrap();
        match msg {
            Message::AnnounceLeaderboard(t) => {
                assert_eq!(t.run_id, run_id);
                assert!(!t.reset);
            }
            other => panic!("unexpected message: {}", other.kind()),
        }

        drop(scheduler_tx);
        let _ = tokio::time::timeout(Duration::from_secs(1), handle).await;
    }

    #[tokio::test]
    async fn test_cron_fires() {
        let (announcer_tx, mut announcer_rx) = mpsc::channel(16);
        let (_scheduler_tx, scheduler_rx) = mpsc::channel(16);
        let scheduler = Scheduler::new("* * * * * *", announcer_tx).unwrap();

        let handle = tokio::spawn(async move { scheduler.start(scheduler_rx).await });

        let msg = tokio::time::timeout(Duration::from_secs(3), announcer_rx.recv())
            .await
            .unwrap()
            .unwrap();
        match msg {
            Message::AnnounceLeaderboard(t) => {
                assert_eq!(t.reason, "scheduled");
                assert!(t.reset);
            }
            other => panic!("unexpected message: {}", other.kind()),
        }
        handle.abort();
    }
}
