//! Manual announcements for a running `serve`: `kill -USR1 <pid>` asks the
//! scheduler for an immediate leaderboard run.

use anyhow::{Context, Result};
use tokio::signal::unix::{signal, Signal, SignalKind};
use tokio::sync::mpsc;
use tracing::{info, warn};

use staytime_core::{AnnounceTrigger, Message};

pub const SIGNAL_REASON: &str = "sigusr1";

/// Install the SIGUSR1 handler. Register before the signal can arrive.
pub fn listen_sigusr1() -> Result<Signal> {
    signal(SignalKind::user_defined1()).context("Failed to install SIGUSR1 handler")
}

/// Turn every received signal into a `ScheduleAnnouncement` for the scheduler.
///
/// Returns when the signal stream ends or the scheduler channel closes.
pub async fn forward_signals(mut signals: Signal, scheduler_tx: mpsc::Sender<Message>) {
    info!("Send SIGUSR1 to announce the leaderboard now");
    while signals.recv().await.is_some() {
        let trigger = AnnounceTrigger::new(SIGNAL_REASON);
        info!(run_id = %trigger.run_id, "SIGUSR1 received, requesting leaderboard run");
        if scheduler_tx
            .send(Message::ScheduleAnnouncement(trigger))
            .await
            .is_err()
        {
            warn!("Scheduler channel closed, ignoring further signals");
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_sigusr1_requests_announcement() {
        let (scheduler_tx, mut scheduler_rx) = mpsc::channel(4);
        let signals = listen_sigusr1().unwrap();
        let handle = tokio::spawn(forward_signals(signals, scheduler_tx));

        let status = std::process::Command::new("kill")
            .args(["-USR1", &std::process::id().to_string()])
            .status()
            .unwrap();
        assert!(status.success());

        let msg = tokio::time::timeout(Duration::from_secs(2), scheduler_rx.recv())
            .await
            .unwrap()
            .unwrap();
        match msg {
            Message::ScheduleAnnouncement(t) => {
                assert_eq!(t.reason, SIGNAL_REASON);
                assert!(t.reset);
            }
            other => panic!("unexpected message: {}", other.kind()),
        }
        handle.abort();
    }
}
