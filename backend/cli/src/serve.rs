use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use staytime_channels::{DiscordGateway, PresenceAdapter};
use staytime_config::StaytimeConfig;
use staytime_core::{Component, Message, StayBus};
use staytime_scheduler::Scheduler;
use staytime_tracker::{Announcer, PresenceHandler, ProfileAccumulator, SessionTracker, UserLocks};

use crate::runtime::{announcer_config, messaging_sink, open_directory, required};

/// How long shutdown waits for closed sessions to be written and announced.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

const GATEWAY_BUFFER: usize = 256;

pub async fn run(config: &StaytimeConfig) -> Result<()> {
    let token = required(config.bot_token(), "discord.botToken")?.to_string();
    let voice_channel = required(config.voice_channel_id(), "discord.voiceChannelId")?;
    let text_channel = required(config.text_channel_id(), "discord.textChannelId")?;

    info!(
        voice = %voice_channel,
        text = %text_channel,
        cron = %config.reset_cron(),
        top_n = config.top_n(),
        "Starting staytime"
    );

    let directory = open_directory(config)?;
    let sink = messaging_sink(config, false);
    let locks = Arc::new(UserLocks::new());
    let sessions = Arc::new(SessionTracker::new());

    let mut bus = StayBus::new();

    let handler = PresenceHandler::new(
        voice_channel,
        text_channel,
        Arc::clone(&sessions),
        Arc::new(ProfileAccumulator::new(Arc::clone(&directory), Arc::clone(&locks))),
        Arc::clone(&sink),
    );
    let scheduler = Scheduler::new(config.reset_cron(), bus.announcer_tx.clone())
        .context("resetCron")?;
    let announcer = Announcer::new(directory, sink, locks, announcer_config(config));

    let presence_rx = bus.take_presence_rx().context("presence rx already taken")?;
    let scheduler_rx = bus.take_scheduler_rx().context("scheduler rx already taken")?;
    let announcer_rx = bus.take_announcer_rx().context("announcer rx already taken")?;

    let presence_task = tokio::spawn(async move {
        if let Err(e) = handler.start(presence_rx).await {
            error!(error = %e, "Presence handler failed");
        }
    });

    tokio::spawn(async move {
        if let Err(e) = scheduler.start(scheduler_rx).await {
            error!(error = %e, "Scheduler failed");
        }
    });

    tokio::spawn(async move {
        if let Err(e) = announcer.start(announcer_rx).await {
            error!(error = %e, "Announcer failed");
        }
    });

    #[cfg(unix)]
    {
        let signals = staytime_scheduler::listen_sigusr1()?;
        tokio::spawn(staytime_scheduler::forward_signals(signals, bus.scheduler_tx.clone()));
    }

    info!("All components started");

    // Shard tasks can outlive the client, so the gateway writes into its own
    // channel and shutdown cuts it off at the relay.
    let (gateway_tx, gateway_rx) = mpsc::channel(GATEWAY_BUFFER);
    let relay = PresenceRelay::spawn(gateway_rx, bus.presence_tx.clone());
    let gateway = DiscordGateway::new(token);

    let outcome = tokio::select! {
        result = gateway.start(gateway_tx) => {
            match result {
                Ok(()) => {
                    warn!("Gateway returned without error; shutting down");
                    Ok(())
                }
                Err(e) => Err(e.context(format!("{} gateway stopped", gateway.name()))),
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, shutting down");
            Ok(())
        }
    };

    relay.close().await;
    drain_presence(bus.presence_tx, presence_task, SHUTDOWN_GRACE).await;

    let open = sessions.open_sessions().await;
    if !open.is_empty() {
        warn!(open = open.len(), "Exiting with open sessions; their time is not recorded");
    }
    outcome
}

/// Forwards gateway events to the presence handler until closed.
struct PresenceRelay {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl PresenceRelay {
    fn spawn(mut gateway_rx: mpsc::Receiver<Message>, presence_tx: mpsc::Sender<Message>) -> Self {
        let (stop, mut stop_rx) = oneshot::channel();
        let handle = tokio::spawn(async move {
            let mut stopping = false;
            loop {
                tokio::select! {
                    _ = &mut stop_rx, if !stopping => {
                        // Refuse new events, keep the buffered ones.
                        gateway_rx.close();
                        stopping = true;
                    }
                    msg = gateway_rx.recv() => match msg {
                        Some(msg) => {
                            if presence_tx.send(msg).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    },
                }
            }
        });
        Self { stop, handle }
    }

    /// Stop accepting gateway events and forward what is already buffered.
    async fn close(self) {
        let _ = self.stop.send(());
        if let Err(e) = self.handle.await {
            error!(error = %e, "Presence relay failed");
        }
    }
}

/// Close the presence channel and wait for the handler to settle what it holds.
async fn drain_presence(
    presence_tx: mpsc::Sender<Message>,
    presence_task: JoinHandle<()>,
    grace: Duration,
) {
    drop(presence_tx);
    match tokio::time::timeout(grace, presence_task).await {
        Ok(Ok(())) => info!("Pending sessions settled"),
        Ok(Err(e)) => error!(error = %e, "Presence handler task failed"),
        Err(_) => warn!(
            grace_secs = grace.as_secs(),
            "Timed out waiting for closed sessions to settle"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use staytime_core::{PresenceEvent, RecordingSink};
    use staytime_directory::{Directory, InMemoryDirectory};

    const VOICE: &str = "900";

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    #[tokio::test]
    async fn test_shutdown_settles_sessions_in_flight() {
        let directory = Arc::new(InMemoryDirectory::new());
        let sink = Arc::new(RecordingSink::new());
        let handler = PresenceHandler::new(
            VOICE,
            "800",
            Arc::new(SessionTracker::new()),
            Arc::new(ProfileAccumulator::new(directory.clone(), Arc::new(UserLocks::new()))),
            sink.clone(),
        );

        let (presence_tx, presence_rx) = mpsc::channel(16);
        let presence_task = tokio::spawn(async move {
            handler.start(presence_rx).await.unwrap();
        });

        let (gateway_tx, gateway_rx) = mpsc::channel(16);
        let relay = PresenceRelay::spawn(gateway_rx, presence_tx.clone());

        gateway_tx
            .send(Message::Presence(PresenceEvent::new("u1", Some(VOICE.into()), false, at(0))))
            .await
            .unwrap();
        gateway_tx
            .send(Message::Presence(PresenceEvent::new("u1", None, true, at(42))))
            .await
            .unwrap();

        // gateway_tx stays alive, like a shard that outlived its client.
        relay.close().await;
        drain_presence(presence_tx, presence_task, Duration::from_secs(5)).await;

        let profile = directory.get("u1").await.unwrap().unwrap();
        assert_eq!(profile.weekly_staying_time, 42);
        assert_eq!(sink.texts().await.len(), 1);
        assert!(gateway_tx.is_closed());
    }
}
