//! Whole-pipeline scenarios: presence events in, directory state and
//! notifications out.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::mpsc;

use staytime_core::{AnnounceTrigger, Component, Message, PresenceEvent, RecordingSink, UserProfile};
use staytime_directory::{Directory, InMemoryDirectory, SqliteDirectory};

use crate::{
    Announcer, AnnouncerConfig, PresenceHandler, ProfileAccumulator, SessionTracker, UserLocks,
};

const VOICE: &str = "1000";
const TEXT: &str = "2000";

struct Harness {
    handler: PresenceHandler,
    announcer: Announcer,
    directory: Arc<dyn Directory>,
    sink: Arc<RecordingSink>,
}

fn harness(directory: Arc<dyn Directory>) -> Harness {
    let sink = Arc::new(RecordingSink::new());
    let locks = Arc::new(UserLocks::new());
    let accumulator = Arc::new(ProfileAccumulator::new(Arc::clone(&directory), Arc::clone(&locks)));
    let handler = PresenceHandler::new(
        VOICE,
        TEXT,
        Arc::new(SessionTracker::new()),
        accumulator,
        sink.clone(),
    );
    let announcer = Announcer::new(
        Arc::clone(&directory),
        sink.clone(),
        locks,
        AnnouncerConfig::new(TEXT),
    );
    Harness {
        handler,
        announcer,
        directory,
        sink,
    }
}

fn t0() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

fn join(user: &str, at: DateTime<Utc>) -> PresenceEvent {
    PresenceEvent::new(user, Some(VOICE.into()), false, at)
}

fn leave(user: &str, at: DateTime<Utc>) -> PresenceEvent {
    PresenceEvent::new(user, None, true, at)
}

#[tokio::test]
async fn test_single_session_end_to_end() {
    let h = harness(Arc::new(InMemoryDirectory::new()));

    h.handler.handle(&join("A", t0())).await;
    h.handler
        .handle(&leave("A", t0() + Duration::seconds(3661)))
        .await
        .unwrap();

    let profile = h.directory.get("A").await.unwrap().unwrap();
    assert_eq!(profile.total_staying_time, 3661);
    assert_eq!(profile.weekly_staying_time, 3661);

    let texts = h.sink.texts().await;
    assert_eq!(texts.len(), 1);
    assert!(texts[0].contains("1時間01分01秒"));
    assert!(texts[0].starts_with("<@A>"));
}

#[tokio::test]
async fn test_weekly_leaderboard_end_to_end() {
    let h = harness(Arc::new(InMemoryDirectory::new()));

    for (user, seconds) in [("user-500", 500), ("user-1500", 1500), ("user-1000", 1000)] {
        h.handler.handle(&join(user, t0())).await;
        h.handler
            .handle(&leave(user, t0() + Duration::seconds(seconds)))
            .await
            .unwrap();
    }

    let report = h.announcer.run(&AnnounceTrigger::new("weekly")).await.unwrap();
    let order: Vec<_> = report.ranked.iter().map(|e| e.user_id.as_str()).collect();
    assert_eq!(order, vec!["user-1500", "user-1000", "user-500"]);

    let texts = h.sink.texts().await;
    assert_eq!(texts.last().unwrap(), "<@user-1500> <@user-1000> <@user-500>");

    let snapshot = h.directory.snapshot().await.unwrap();
    assert_eq!(snapshot.len(), 3);
    for profile in &snapshot.profiles {
        assert_eq!(profile.weekly_staying_time, 0);
        assert!(profile.total_staying_time > 0);
    }
}

#[tokio::test]
async fn test_week_after_reset_counts_fresh() {
    let h = harness(Arc::new(SqliteDirectory::in_memory("user_profiles").unwrap()));

    h.handler.handle(&join("A", t0())).await;
    h.handler.handle(&leave("A", t0() + Duration::seconds(600))).await;
    h.announcer.run(&AnnounceTrigger::new("week 1")).await.unwrap();

    h.handler.handle(&join("A", t0() + Duration::seconds(7000))).await;
    h.handler.handle(&leave("A", t0() + Duration::seconds(7100))).await;

    let profile = h.directory.get("A").await.unwrap().unwrap();
    assert_eq!(profile.total_staying_time, 700);
    assert_eq!(profile.weekly_staying_time, 100);

    let report = h.announcer.run(&AnnounceTrigger::new("week 2")).await.unwrap();
    assert_eq!(report.ranked[0].weekly_staying_time, 100);
}

#[tokio::test]
async fn test_unreadable_record_does_not_block_batch() {
    let directory = Arc::new(
        InMemoryDirectory::with_profiles(vec![UserProfile {
            user_id: "good".into(),
            user_name: "good".into(),
            total_staying_time: 90,
            weekly_staying_time: 90,
            user_rank: 0,
        }])
        .await,
    );
    directory
        .insert_document("broken", serde_json::json!(["not", "a", "profile"]))
        .await;
    let h = harness(directory.clone());

    let report = h.announcer.run(&AnnounceTrigger::new("weekly")).await.unwrap();
    assert_eq!(report.unreadable, 1);
    assert_eq!(report.ranked.len(), 1);
    assert_eq!(report.reset_updated, Some(1));
}

#[tokio::test]
async fn test_components_over_channels() {
    let h = Arc::new(harness(Arc::new(InMemoryDirectory::new())));
    let (presence_tx, presence_rx) = mpsc::channel(32);
    let (announce_tx, announce_rx) = mpsc::channel(4);

    let presence_task = {
        let handler = h.handler.clone();
        tokio::spawn(async move { handler.start(presence_rx).await })
    };

    presence_tx.send(Message::Presence(join("x", t0()))).await.unwrap();
    presence_tx.send(Message::Presence(join("y", t0()))).await.unwrap();
    presence_tx
        .send(Message::Presence(leave("y", t0() + Duration::seconds(50))))
        .await
        .unwrap();
    presence_tx
        .send(Message::Presence(leave("x", t0() + Duration::seconds(80))))
        .await
        .unwrap();
    drop(presence_tx);
    presence_task.await.unwrap().unwrap();

    let announce_task = {
        let h = Arc::clone(&h);
        tokio::spawn(async move { h.announcer.start(announce_rx).await })
    };
    announce_tx
        .send(Message::AnnounceLeaderboard(AnnounceTrigger::new("cron")))
        .await
        .unwrap();
    drop(announce_tx);
    announce_task.await.unwrap().unwrap();

    let cards = h.sink.cards().await;
    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0].title, "🔥今週の滞在時間トップ2🔥");
    let x_pos = cards[0].body.find("<@x>").unwrap();
    let y_pos = cards[0].body.find("<@y>").unwrap();
    assert!(x_pos < y_pos);
    assert!(cards[0].body.contains("**3位:** ---"));
}
