#![allow(clippy::unwrap_used, clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use courtside_core::config::{LikeConfig, TriggerConfig};
use tokio::sync::watch;

use super::{RoundReport, TriggerRuntime};
use crate::auth::{Actor, StaticIdentity};
use crate::candidatures::CandidatureService;
use crate::changes::ChangeFeed;
use crate::likes::LikeService;
use crate::notifications::NotificationPipeline;
use crate::notifications::push::RecordingPushSender;
use crate::storage::{AccountKind, NewTriggerEvent, Store, event_kind};

async fn seeded_store() -> Store {
    let store = Store::open_in_memory().await.unwrap();
    store
        .create_account("club-1", AccountKind::Club, "BC Lyon")
        .await
        .unwrap();
    store
        .create_account("player-1", AccountKind::Player, "Lea")
        .await
        .unwrap();
    store
        .create_offer("offer-1", "club-1", "Point guard", "Lyon")
        .await
        .unwrap();
    store
        .upsert_device_token("d1", "club-1", "club-token", "ios")
        .await
        .unwrap();
    store
        .upsert_device_token("d2", "player-1", "player-token", "android")
        .await
        .unwrap();
    store.discard_pending_events().await.unwrap();
    store
}

fn runtime(store: &Store, push: &Arc<RecordingPushSender>) -> TriggerRuntime {
    let pipeline = NotificationPipeline::new(store.clone(), push.clone(), 500);
    let config = TriggerConfig {
        poll_interval_ms: 20,
        ..TriggerConfig::default()
    };
    TriggerRuntime::new(store.clone(), pipeline, config)
}

fn as_actor(
    store: &Store,
    runtime: &TriggerRuntime,
    id: &str,
    kind: AccountKind,
) -> CandidatureService {
    CandidatureService::new(
        store.clone(),
        Arc::new(StaticIdentity::signed_in(Actor::new(id, kind))),
        runtime.wake_handle(),
    )
}

#[tokio::test]
async fn candidature_events_flow_to_notifications() {
    let store = seeded_store().await;
    let push = Arc::new(RecordingPushSender::delivering());
    let runtime = runtime(&store, &push);
    let player = as_actor(&store, &runtime, "player-1", AccountKind::Player);
    let club = as_actor(&store, &runtime, "club-1", AccountKind::Club);

    let candidature = player.submit("offer-1", "Hi").await.unwrap();
    club.set_status(&candidature.id, crate::storage::CandidatureStatus::Rejected)
        .await
        .unwrap();

    let report = runtime.run_once().await.unwrap();
    assert_eq!(
        report,
        RoundReport {
            dispatched: 2,
            failed: 0,
        }
    );

    assert_eq!(store.list_notifications("club-1", 10).await.unwrap().len(), 1);
    let applicant = store.list_notifications("player-1", 10).await.unwrap();
    assert_eq!(applicant.len(), 1);
    assert_eq!(applicant[0].metadata.0["status"], "rejected");

    let recipients: Vec<String> = push.sent().iter().map(|m| m.tokens[0].clone()).collect();
    assert_eq!(recipients, ["club-token", "player-token"]);
}

#[tokio::test]
async fn dispatched_events_are_not_handled_again() {
    let store = seeded_store().await;
    let push = Arc::new(RecordingPushSender::delivering());
    let runtime = runtime(&store, &push);
    as_actor(&store, &runtime, "player-1", AccountKind::Player)
        .submit("offer-1", "Hi")
        .await
        .unwrap();

    assert_eq!(runtime.run_once().await.unwrap().dispatched, 1);
    assert_eq!(runtime.run_once().await.unwrap(), RoundReport::default());
    assert_eq!(push.sent().len(), 1);
}

#[tokio::test]
async fn push_failure_still_marks_event_dispatched() {
    let store = seeded_store().await;
    let push = Arc::new(RecordingPushSender::unreachable());
    let runtime = runtime(&store, &push);
    as_actor(&store, &runtime, "player-1", AccountKind::Player)
        .submit("offer-1", "Hi")
        .await
        .unwrap();

    assert_eq!(runtime.run_once().await.unwrap().dispatched, 1);
    assert_eq!(store.list_notifications("club-1", 10).await.unwrap().len(), 1);
    assert!(store.pending_events(10, 5).await.unwrap().is_empty());
}

#[tokio::test]
async fn like_events_push_to_post_owner() {
    let store = seeded_store().await;
    store.create_post("p1", "player-1", "", None).await.unwrap();
    let push = Arc::new(RecordingPushSender::delivering());
    let runtime = runtime(&store, &push);
    let likes = LikeService::new(
        store.clone(),
        Arc::new(StaticIdentity::signed_in(Actor::new("club-1", AccountKind::Club))),
        ChangeFeed::default(),
        LikeConfig::default(),
    );

    likes.toggle("p1", "player-1").await.unwrap();
    runtime.run_once().await.unwrap();

    let sent = push.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].tokens, ["player-token"]);
    assert_eq!(sent[0].data["type"], "like");
}

#[tokio::test]
async fn new_offers_and_posts_reach_followers() {
    let store = seeded_store().await;
    store.add_favorite_club("player-1", "club-1").await.unwrap();
    store.add_favorite_player("club-1", "player-1").await.unwrap();
    let push = Arc::new(RecordingPushSender::delivering());
    let runtime = runtime(&store, &push);

    store
        .create_offer("offer-2", "club-1", "Shooting guard", "Paris")
        .await
        .unwrap();
    store.create_post("p1", "player-1", "", None).await.unwrap();

    assert_eq!(
        runtime.run_once().await.unwrap(),
        RoundReport {
            dispatched: 2,
            failed: 0,
        }
    );
    let sent = push.sent();
    let routed: Vec<(&str, &str)> = sent
        .iter()
        .map(|m| (m.tokens[0].as_str(), m.data["type"].as_str()))
        .collect();
    assert_eq!(
        routed,
        [
            ("player-token", "favorite_club_offer"),
            ("club-token", "favorite_player_post"),
        ]
    );
    assert!(store.list_notifications("player-1", 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn candidature_without_club_is_dispatched_without_writes() {
    let store = seeded_store().await;
    let push = Arc::new(RecordingPushSender::delivering());
    let runtime = runtime(&store, &push);
    store
        .enqueue_event(&NewTriggerEvent {
            kind: event_kind::CANDIDATURE_CREATED,
            params: r#"{"offerId":"offer-1","candidatureId":"c-legacy"}"#,
            payload: r#"{"id":"c-legacy","offerId":"offer-1","applicantId":"player-1"}"#,
        })
        .await
        .unwrap();

    assert_eq!(runtime.run_once().await.unwrap().dispatched, 1);
    assert!(store.list_notifications("club-1", 10).await.unwrap().is_empty());
    assert!(push.sent().is_empty());
}

#[tokio::test]
async fn malformed_events_fail_until_attempts_run_out() {
    let store = seeded_store().await;
    let push = Arc::new(RecordingPushSender::delivering());
    let runtime = runtime(&store, &push);
    let id = store
        .enqueue_event(&NewTriggerEvent {
            kind: event_kind::CANDIDATURE_CREATED,
            params: r#"{"clubId":"club-1"}"#,
            payload: "{}",
        })
        .await
        .unwrap();

    for _ in 0..TriggerConfig::default().max_attempts {
        assert_eq!(runtime.run_once().await.unwrap().failed, 1);
    }
    assert_eq!(runtime.run_once().await.unwrap(), RoundReport::default());

    let event = store.get_event(id).await.unwrap();
    assert!(event.dispatched_at.is_none());
    assert!(event.last_error.unwrap().contains(&format!("trigger_events/{id}/params")));
}

#[tokio::test]
async fn unknown_kind_is_rejected() {
    let store = seeded_store().await;
    let push = Arc::new(RecordingPushSender::delivering());
    let runtime = runtime(&store, &push);
    let id = store
        .enqueue_event(&NewTriggerEvent {
            kind: "offer.deleted",
            params: "{}",
            payload: "{}",
        })
        .await
        .unwrap();

    assert_eq!(runtime.run_once().await.unwrap().failed, 1);
    let event = store.get_event(id).await.unwrap();
    assert!(event.last_error.unwrap().contains("offer.deleted"));
}

#[tokio::test]
async fn run_loop_handles_woken_events_and_stops_on_shutdown() {
    let store = seeded_store().await;
    let push = Arc::new(RecordingPushSender::delivering());
    let runtime = Arc::new(runtime(&store, &push));
    let player = as_actor(&store, &runtime, "player-1", AccountKind::Player);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn({
        let runtime = Arc::clone(&runtime);
        async move { runtime.run(shutdown_rx).await }
    });

    player.submit("offer-1", "Hi").await.unwrap();
    let mut delivered = false;
    for _ in 0..200 {
        if !store.list_notifications("club-1", 10).await.unwrap().is_empty() {
            delivered = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(delivered, "trigger runtime never handled the candidature");

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(2), task)
        .await
        .unwrap()
        .unwrap();
}
