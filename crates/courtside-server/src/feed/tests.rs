#![allow(clippy::unwrap_used, clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use courtside_core::config::{FeedConfig, LikeConfig};

use super::{FeedError, LikeFeed, VideoItem};
use crate::auth::{Actor, StaticIdentity};
use crate::changes::ChangeFeed;
use crate::likes::{LikeError, LikeService};
use crate::storage::{AccountKind, Store};

async fn seeded_store() -> Store {
    let store = Store::open_in_memory().await.unwrap();
    for id in ["p1", "p2"] {
        store
            .create_post(id, "owner", &format!("https://cdn/{id}.mp4"), None)
            .await
            .unwrap();
    }
    store
}

fn feed_for(store: &Store, changes: &ChangeFeed, actor: Option<&str>) -> LikeFeed {
    let identity = actor.map_or_else(StaticIdentity::signed_out, |id| {
        StaticIdentity::signed_in(Actor::new(id, AccountKind::Player))
    });
    let likes = LikeService::new(
        store.clone(),
        Arc::new(identity),
        changes.clone(),
        LikeConfig::default(),
    );
    LikeFeed::new(likes)
}

fn item(id: &str) -> VideoItem {
    VideoItem {
        id: id.to_string(),
        owner_id: "owner".to_string(),
        url: String::new(),
        description: None,
        like_count: 0,
        liked_by_me: false,
    }
}

async fn eventually(what: &str, check: impl Fn() -> bool) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for: {what}");
}

#[tokio::test]
async fn visible_posts_receive_server_counts() {
    let store = seeded_store().await;
    sqlx::query("UPDATE posts SET like_count = 7 WHERE id = 'p1'")
        .execute(store.pool())
        .await
        .unwrap();

    let changes = ChangeFeed::default();
    let mut feed = feed_for(&store, &changes, Some("alice"));
    feed.set_visible(vec![item("p1"), item("p2")]);

    assert_eq!(feed.active_subscriptions(), 2);
    eventually("p1 count from store", || {
        feed.item("p1").is_some_and(|i| i.like_count == 7)
    })
    .await;
}

#[tokio::test]
async fn toggle_flips_flag_and_counter_follows_subscription() {
    let store = seeded_store().await;
    let changes = ChangeFeed::default();
    let mut feed = feed_for(&store, &changes, Some("alice"));
    feed.set_visible(vec![item("p1")]);

    let outcome = feed.toggle_like("p1").await.unwrap();
    assert!(outcome.liked);

    eventually("liked with count 1", || {
        feed.item("p1")
            .is_some_and(|i| i.liked_by_me && i.like_count == 1)
    })
    .await;

    feed.toggle_like("p1").await.unwrap();
    eventually("unliked with count 0", || {
        feed.item("p1")
            .is_some_and(|i| !i.liked_by_me && i.like_count == 0)
    })
    .await;
}

#[tokio::test]
async fn failed_toggle_reverts_flag_and_leaves_counter() {
    let store = seeded_store().await;
    let changes = ChangeFeed::default();
    let mut feed = feed_for(&store, &changes, Some("alice"));
    // Rendered but absent from the store: the transaction fails.
    let mut ghost = item("ghost");
    ghost.like_count = 3;
    feed.set_visible(vec![ghost]);

    let err = feed.toggle_like("ghost").await.unwrap_err();
    assert!(matches!(err, FeedError::Like(LikeError::PostNotFound(_))));

    let after = feed.item("ghost").unwrap();
    assert!(!after.liked_by_me);
    assert_eq!(after.like_count, 3);
}

#[tokio::test]
async fn signed_out_feed_neither_subscribes_nor_flips() {
    let store = seeded_store().await;
    let changes = ChangeFeed::default();
    let mut feed = feed_for(&store, &changes, None);
    feed.set_visible(vec![item("p1")]);

    assert_eq!(feed.active_subscriptions(), 0);
    assert_eq!(changes.receiver_count(), 0);

    let err = feed.toggle_like("p1").await.unwrap_err();
    assert!(matches!(err, FeedError::Like(LikeError::Unauthenticated)));
    assert!(!feed.item("p1").unwrap().liked_by_me);
    assert_eq!(store.count_likes("p1").await.unwrap(), 0);
}

#[tokio::test]
async fn unknown_post_is_rejected_without_state_change() {
    let store = seeded_store().await;
    let mut feed = feed_for(&store, &ChangeFeed::default(), Some("alice"));
    feed.set_visible(vec![item("p1")]);

    let err = feed.toggle_like("p2").await.unwrap_err();
    assert!(matches!(err, FeedError::NotInFeed(ref id) if id == "p2"));
    assert_eq!(store.count_likes("p2").await.unwrap(), 0);
}

#[tokio::test]
async fn two_clients_converge_on_concurrent_likes() {
    let store = seeded_store().await;
    let changes = ChangeFeed::from_config(&FeedConfig {
        broadcast_capacity: 8,
    });
    let mut alice = feed_for(&store, &changes, Some("alice"));
    let mut bob = feed_for(&store, &changes, Some("bob"));
    alice.set_visible(vec![item("p1")]);
    bob.set_visible(vec![item("p1")]);

    let (a, b) = tokio::join!(alice.toggle_like("p1"), bob.toggle_like("p1"));
    a.unwrap();
    b.unwrap();

    assert_eq!(store.like_count("p1").await.unwrap(), Some(2));
    eventually("both clients show 2 likes", || {
        alice.item("p1").is_some_and(|i| i.liked_by_me && i.like_count == 2)
            && bob.item("p1").is_some_and(|i| i.liked_by_me && i.like_count == 2)
    })
    .await;
}

#[tokio::test]
async fn hidden_posts_release_subscriptions_and_keep_local_state() {
    let store = seeded_store().await;
    let changes = ChangeFeed::default();
    let mut feed = feed_for(&store, &changes, Some("alice"));
    feed.set_visible(vec![item("p1"), item("p2")]);
    feed.toggle_like("p1").await.unwrap();
    eventually("p1 liked", || {
        feed.item("p1")
            .is_some_and(|i| i.liked_by_me && i.like_count == 1)
    })
    .await;

    // Re-render p1 with stale props; the local state wins.
    feed.set_visible(vec![item("p1")]);
    assert_eq!(feed.active_subscriptions(), 1);
    assert_eq!(feed.snapshot().len(), 1);
    assert!(feed.item("p1").unwrap().liked_by_me);

    eventually("p2 watches released", || changes.receiver_count() == 2).await;
}

#[tokio::test]
async fn dropping_feed_releases_every_subscription() {
    let store = seeded_store().await;
    let changes = ChangeFeed::default();
    let mut feed = feed_for(&store, &changes, Some("alice"));
    feed.set_visible(vec![item("p1"), item("p2")]);
    assert_eq!(changes.receiver_count(), 4);

    drop(feed);
    eventually("all watches released", || changes.receiver_count() == 0).await;
}

#[tokio::test]
async fn toggle_after_actor_switch_acts_for_new_actor() {
    let store = seeded_store().await;
    let changes = ChangeFeed::default();
    let identity = Arc::new(StaticIdentity::signed_in(Actor::new(
        "alice",
        AccountKind::Player,
    )));
    let likes = LikeService::new(
        store.clone(),
        identity.clone(),
        changes.clone(),
        LikeConfig::default(),
    );
    let mut feed = LikeFeed::new(likes);
    feed.set_visible(vec![item("p1")]);

    feed.toggle_like("p1").await.unwrap();
    eventually("alice liked p1", || {
        feed.item("p1")
            .is_some_and(|i| i.liked_by_me && i.like_count == 1)
    })
    .await;

    identity.sign_in(Actor::new("bob", AccountKind::Player));
    let outcome = feed.toggle_like("p1").await.unwrap();
    assert!(outcome.liked);
    assert_eq!(outcome.like_count, 2);
    assert!(store.has_liked("p1", "alice").await.unwrap());
    assert!(store.has_liked("p1", "bob").await.unwrap());

    eventually("bob sees his like and both counts", || {
        feed.item("p1")
            .is_some_and(|i| i.liked_by_me && i.like_count == 2)
    })
    .await;
    assert_eq!(feed.active_subscriptions(), 1);
}

#[tokio::test]
async fn render_notifications_fire_on_change() {
    let store = seeded_store().await;
    let changes = ChangeFeed::default();
    let mut feed = feed_for(&store, &changes, Some("alice"));
    let mut rx = feed.changed();

    feed.set_visible(vec![item("p1")]);
    tokio::time::timeout(Duration::from_secs(2), rx.changed())
        .await
        .unwrap()
        .unwrap();
}

#[test]
fn video_item_uses_client_field_names() {
    let mut video = item("p1");
    video.liked_by_me = true;
    let json = serde_json::to_value(&video).unwrap();
    assert_eq!(json["isLikedByMe"], true);
    assert_eq!(json["likeCount"], 0);
    assert_eq!(json["ownerId"], "owner");
}
