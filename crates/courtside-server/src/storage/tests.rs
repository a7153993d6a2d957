//! Storage layer tests for the Courtside store.

#![allow(clippy::unwrap_used, clippy::panic)]

use super::db::{DatabaseError, Store};
use super::models::{AccountKind, CandidatureStatus, Metadata, event_kind};
use super::queries_candidatures::NewCandidature;
use super::queries_triggers::NewTriggerEvent;

async fn test_db() -> Store {
    Store::open_in_memory().await.unwrap()
}

async fn seeded_db() -> Store {
    let db = test_db().await;
    db.create_account("owner", AccountKind::Player, "Owner")
        .await
        .unwrap();
    db.create_post("p1", "owner", "https://cdn/p1.mp4", Some("dunk"))
        .await
        .unwrap();
    db.discard_pending_events().await.unwrap();
    db
}

async fn set_like_count(db: &Store, post_id: &str, count: i64) {
    sqlx::query("UPDATE posts SET like_count = ? WHERE id = ?")
        .bind(count)
        .bind(post_id)
        .execute(db.pool())
        .await
        .unwrap();
}

// === Account / post tests ===

#[tokio::test]
async fn create_and_get_post() {
    let db = seeded_db().await;
    let post = db.get_post("p1").await.unwrap();
    assert_eq!(post.owner_id, "owner");
    assert_eq!(post.like_count, 0);
    assert_eq!(post.description.as_deref(), Some("dunk"));
}

#[tokio::test]
async fn missing_post_is_not_found() {
    let db = test_db().await;
    assert!(matches!(
        db.get_post("nope").await,
        Err(DatabaseError::NotFound(_))
    ));
    assert_eq!(db.like_count("nope").await.unwrap(), None);
}

#[tokio::test]
async fn post_serializes_with_document_field_names() {
    let db = seeded_db().await;
    let json = serde_json::to_value(db.get_post("p1").await.unwrap()).unwrap();
    assert_eq!(json["likeCount"], 0);
    assert!(json.get("createdAt").is_some());
    assert_eq!(json["ownerId"], "owner");
}

#[tokio::test]
async fn new_post_and_offer_enqueue_their_triggers() {
    let db = test_db().await;
    db.create_post("p1", "player-1", "https://cdn/p1.mp4", None)
        .await
        .unwrap();
    db.create_offer("offer-1", "club-1", "Point guard", "Lyon")
        .await
        .unwrap();

    let events = db.pending_events(10, 5).await.unwrap();
    let kinds: Vec<&str> = events.iter().map(|e| e.kind.as_str()).collect();
    assert_eq!(kinds, [event_kind::POST_CREATED, event_kind::OFFER_CREATED]);
    assert_eq!(events[0].params, r#"{"postId":"p1"}"#);
    assert_eq!(events[1].params, r#"{"clubId":"club-1","offerId":"offer-1"}"#);

    let offer: serde_json::Value = serde_json::from_str(&events[1].payload).unwrap();
    assert_eq!(offer["title"], "Point guard");
}

#[tokio::test]
async fn duplicate_post_enqueues_nothing() {
    let db = seeded_db().await;
    db.create_post("p1", "owner", "", None).await.unwrap_err();
    assert!(db.pending_events(10, 5).await.unwrap().is_empty());
}

// === Favorite tests ===

#[tokio::test]
async fn favorite_clubs_are_idempotent_and_listed_per_follower() {
    let db = test_db().await;
    assert!(db.add_favorite_club("player-1", "club-1").await.unwrap());
    assert!(!db.add_favorite_club("player-1", "club-1").await.unwrap());
    assert!(db.add_favorite_club("player-2", "club-1").await.unwrap());
    assert!(db.add_favorite_club("player-1", "club-2").await.unwrap());

    assert_eq!(
        db.club_followers("club-1").await.unwrap(),
        vec!["player-1", "player-2"]
    );
    assert_eq!(db.list_favorite_clubs("player-1").await.unwrap().len(), 2);

    assert!(db.remove_favorite_club("player-1", "club-1").await.unwrap());
    assert!(!db.remove_favorite_club("player-1", "club-1").await.unwrap());
    assert_eq!(db.club_followers("club-1").await.unwrap(), vec!["player-2"]);
}

#[tokio::test]
async fn favorite_players_track_following_clubs() {
    let db = test_db().await;
    assert!(db.add_favorite_player("club-1", "player-1").await.unwrap());
    assert!(db.add_favorite_player("club-2", "player-1").await.unwrap());

    assert_eq!(
        db.player_followers("player-1").await.unwrap(),
        vec!["club-1", "club-2"]
    );
    assert!(db.player_followers("player-2").await.unwrap().is_empty());

    let favorites = db.list_favorite_players("club-1").await.unwrap();
    assert_eq!(favorites.len(), 1);
    assert_eq!(favorites[0].player_id, "player-1");

    assert!(db.remove_favorite_player("club-2", "player-1").await.unwrap());
    assert_eq!(db.player_followers("player-1").await.unwrap(), vec!["club-1"]);
}

// === Like toggle tests ===

#[tokio::test]
async fn toggle_like_writes_all_three_records() {
    let db = seeded_db().await;

    let outcome = db
        .toggle_like("p1", "alice", AccountKind::Player, "owner")
        .await
        .unwrap();
    assert!(outcome.liked);
    assert_eq!(outcome.like_count, 1);
    assert!(db.has_liked("p1", "alice").await.unwrap());
    assert!(db.in_liked_index("alice", "p1").await.unwrap());

    let outcome = db
        .toggle_like("p1", "alice", AccountKind::Player, "owner")
        .await
        .unwrap();
    assert!(!outcome.liked);
    assert_eq!(outcome.like_count, 0);
    assert!(!db.has_liked("p1", "alice").await.unwrap());
    assert!(!db.in_liked_index("alice", "p1").await.unwrap());
}

#[tokio::test]
async fn reverse_index_uses_liker_namespace() {
    let db = seeded_db().await;
    db.toggle_like("p1", "club-9", AccountKind::Club, "owner")
        .await
        .unwrap();

    let index = db.list_liked_index("club-9", 10).await.unwrap();
    assert_eq!(index.len(), 1);
    assert_eq!(index[0].namespace, AccountKind::Club);
    assert_eq!(index[0].owner_id, "owner");
}

#[tokio::test]
async fn toggle_like_on_missing_post_writes_nothing() {
    let db = test_db().await;
    let err = db
        .toggle_like("ghost", "alice", AccountKind::Player, "owner")
        .await
        .unwrap_err();
    assert!(matches!(err, DatabaseError::NotFound(_)));
    assert!(!db.in_liked_index("alice", "ghost").await.unwrap());
    assert!(db.pending_events(10, 5).await.unwrap().is_empty());
}

#[tokio::test]
async fn unlike_with_drifted_zero_counter_stays_at_zero() {
    let db = seeded_db().await;
    db.toggle_like("p1", "alice", AccountKind::Player, "owner")
        .await
        .unwrap();
    set_like_count(&db, "p1", 0).await;

    let outcome = db
        .toggle_like("p1", "alice", AccountKind::Player, "owner")
        .await
        .unwrap();
    assert!(!outcome.liked);
    assert_eq!(outcome.like_count, 0);
    assert_eq!(db.like_count("p1").await.unwrap(), Some(0));
}

#[tokio::test]
async fn failed_counter_write_rolls_back_membership() {
    let db = seeded_db().await;
    sqlx::query(
        "CREATE TRIGGER inject_counter_fault BEFORE UPDATE OF like_count ON posts \
         BEGIN SELECT RAISE(ABORT, 'injected fault'); END",
    )
    .execute(db.pool())
    .await
    .unwrap();

    let err = db
        .toggle_like("p1", "alice", AccountKind::Player, "owner")
        .await
        .unwrap_err();
    assert!(matches!(err, DatabaseError::Query(_)));

    assert!(!db.has_liked("p1", "alice").await.unwrap());
    assert!(!db.in_liked_index("alice", "p1").await.unwrap());
    assert_eq!(db.like_count("p1").await.unwrap(), Some(0));
    assert!(db.pending_events(10, 5).await.unwrap().is_empty());
}

#[tokio::test]
async fn failed_reverse_index_write_rolls_back_counter() {
    let db = seeded_db().await;
    sqlx::query(
        "CREATE TRIGGER inject_index_fault BEFORE INSERT ON liked_posts \
         BEGIN SELECT RAISE(ABORT, 'injected fault'); END",
    )
    .execute(db.pool())
    .await
    .unwrap();

    assert!(
        db.toggle_like("p1", "alice", AccountKind::Player, "owner")
            .await
            .is_err()
    );
    assert!(!db.has_liked("p1", "alice").await.unwrap());
    assert_eq!(db.like_count("p1").await.unwrap(), Some(0));
}

#[tokio::test]
async fn like_enqueues_trigger_but_unlike_does_not() {
    let db = seeded_db().await;
    db.toggle_like("p1", "alice", AccountKind::Player, "owner")
        .await
        .unwrap();
    db.toggle_like("p1", "alice", AccountKind::Player, "owner")
        .await
        .unwrap();

    let events = db.pending_events(10, 5).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, event_kind::LIKE_CREATED);
    assert!(events[0].params.contains("\"likerId\":\"alice\""));
}

#[tokio::test]
async fn liked_posts_and_likers_listings() {
    let db = seeded_db().await;
    db.create_post("p2", "owner", "https://cdn/p2.mp4", None)
        .await
        .unwrap();
    db.toggle_like("p1", "alice", AccountKind::Player, "owner")
        .await
        .unwrap();
    db.toggle_like("p2", "alice", AccountKind::Player, "owner")
        .await
        .unwrap();
    db.toggle_like("p1", "bob", AccountKind::Player, "owner")
        .await
        .unwrap();

    let mut liked: Vec<String> = db
        .list_liked_posts("alice", 10)
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.id)
        .collect();
    liked.sort();
    assert_eq!(liked, vec!["p1", "p2"]);

    let likers = db.list_post_likes("p1", 10).await.unwrap();
    assert_eq!(likers.len(), 2);
    assert_eq!(db.count_likes("p1").await.unwrap(), 2);
}

// === Candidature tests ===

async fn seeded_offer_db() -> Store {
    let db = test_db().await;
    db.create_account("club-1", AccountKind::Club, "BC Lyon")
        .await
        .unwrap();
    db.create_account("player-1", AccountKind::Player, "Jo Martin")
        .await
        .unwrap();
    db.create_offer("offer-1", "club-1", "Point guard", "Lyon")
        .await
        .unwrap();
    db.discard_pending_events().await.unwrap();
    db
}

#[tokio::test]
async fn create_candidature_copies_offer_fields_and_enqueues() {
    let db = seeded_offer_db().await;
    let cand = db
        .create_candidature(&NewCandidature {
            id: "cand-1",
            offer_id: "offer-1",
            applicant_id: "player-1",
            message: "Ready to play",
        })
        .await
        .unwrap();

    assert_eq!(cand.club_id.as_deref(), Some("club-1"));
    assert_eq!(cand.offer_title, "Point guard");
    assert_eq!(cand.applicant_name, "Jo Martin");
    assert_eq!(cand.status, CandidatureStatus::Pending);

    let events = db.pending_events(10, 5).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, event_kind::CANDIDATURE_CREATED);

    let json = serde_json::to_value(&cand).unwrap();
    assert_eq!(json["status"], "pending");
}

#[tokio::test]
async fn candidature_for_unknown_offer_is_rejected() {
    let db = seeded_offer_db().await;
    let err = db
        .create_candidature(&NewCandidature {
            id: "cand-x",
            offer_id: "missing",
            applicant_id: "player-1",
            message: "",
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DatabaseError::NotFound(_)));
    assert!(db.pending_events(10, 5).await.unwrap().is_empty());
}

#[tokio::test]
async fn status_update_is_owner_only_and_idempotent() {
    let db = seeded_offer_db().await;
    db.create_candidature(&NewCandidature {
        id: "cand-1",
        offer_id: "offer-1",
        applicant_id: "player-1",
        message: "",
    })
    .await
    .unwrap();

    let err = db
        .update_candidature_status("cand-1", "club-2", CandidatureStatus::Accepted)
        .await
        .unwrap_err();
    assert!(matches!(err, DatabaseError::NotFound(_)));

    let updated = db
        .update_candidature_status("cand-1", "club-1", CandidatureStatus::Accepted)
        .await
        .unwrap();
    assert_eq!(updated.status, CandidatureStatus::Accepted);

    db.update_candidature_status("cand-1", "club-1", CandidatureStatus::Accepted)
        .await
        .unwrap();

    let kinds: Vec<String> = db
        .pending_events(10, 5)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![event_kind::CANDIDATURE_CREATED, event_kind::CANDIDATURE_UPDATED]
    );

    assert_eq!(db.list_candidatures_for_club("club-1").await.unwrap().len(), 1);
    assert_eq!(
        db.list_candidatures_for_applicant("player-1")
            .await
            .unwrap()
            .len(),
        1
    );
}

// === Notification tests ===

#[tokio::test]
async fn notification_starts_unread_and_only_owner_marks_read() {
    let db = test_db().await;
    let mut metadata = Metadata::new();
    metadata.insert("offerId".into(), "offer-1".into());

    let n = db
        .insert_notification("n1", "club-1", "candidature_created", "T", "B", &metadata)
        .await
        .unwrap();
    assert!(!n.read);
    assert_eq!(n.metadata.0.get("offerId").unwrap(), "offer-1");
    assert_eq!(db.count_unread_notifications("club-1").await.unwrap(), 1);

    assert!(matches!(
        db.mark_notification_read("n1", "intruder").await,
        Err(DatabaseError::NotFound(_))
    ));
    assert!(!db.get_notification("n1").await.unwrap().read);

    assert!(db.mark_notification_read("n1", "club-1").await.unwrap());
    assert!(!db.mark_notification_read("n1", "club-1").await.unwrap());
    assert_eq!(db.count_unread_notifications("club-1").await.unwrap(), 0);

    let json = serde_json::to_value(db.get_notification("n1").await.unwrap()).unwrap();
    assert_eq!(json["type"], "candidature_created");
    assert_eq!(json["read"], true);
}

// === Device token tests ===

#[tokio::test]
async fn device_token_upsert_moves_token_between_accounts() {
    let db = test_db().await;
    db.upsert_device_token("dt-1", "user-1", "token-abc", "android")
        .await
        .unwrap();
    db.upsert_device_token("dt-2", "user-2", "token-abc", "ios")
        .await
        .unwrap();

    let token = db.get_device_token("token-abc").await.unwrap().unwrap();
    assert_eq!(token.account_id, "user-2");
    assert_eq!(token.platform, "ios");
    assert!(
        db.get_device_tokens_for_account("user-1")
            .await
            .unwrap()
            .is_empty()
    );

    assert!(db.delete_device_token("token-abc").await.unwrap());
    assert!(!db.delete_device_token("token-abc").await.unwrap());
}

// === Trigger outbox tests ===

#[tokio::test]
async fn failed_events_stop_being_claimed_after_max_attempts() {
    let db = test_db().await;
    let id = db
        .enqueue_event(&NewTriggerEvent {
            kind: "test.kind",
            params: "{}",
            payload: "{}",
        })
        .await
        .unwrap();

    db.mark_event_failed(id, "boom").await.unwrap();
    assert_eq!(db.pending_events(10, 2).await.unwrap().len(), 1);
    db.mark_event_failed(id, "boom again").await.unwrap();
    assert!(db.pending_events(10, 2).await.unwrap().is_empty());

    let event = db.get_event(id).await.unwrap();
    assert_eq!(event.attempts, 2);
    assert_eq!(event.last_error.as_deref(), Some("boom again"));
}

#[tokio::test]
async fn dispatched_events_are_not_pending() {
    let db = test_db().await;
    let id = db
        .enqueue_event(&NewTriggerEvent {
            kind: "test.kind",
            params: "{}",
            payload: "{}",
        })
        .await
        .unwrap();
    db.mark_event_dispatched(id).await.unwrap();

    assert!(db.pending_events(10, 5).await.unwrap().is_empty());
    assert!(db.get_event(id).await.unwrap().dispatched_at.is_some());
}
