use std::sync::Arc;
use std::time::Duration;

use courtside_core::config::LikeConfig;
use tokio::sync::Notify;
use tracing::{debug, info, instrument, warn};

use super::LikeError;
use crate::auth::{Actor, Identity};
use crate::changes::{ChangeFeed, DocumentChange};
use crate::storage::{DatabaseError, LikedPost, Post, PostLike, Store, ToggleOutcome};
use crate::telemetry;

/// Entry point for like toggles and like listings.
#[derive(Clone)]
pub struct LikeService {
    store: Store,
    identity: Arc<dyn Identity>,
    feed: ChangeFeed,
    config: LikeConfig,
    wake: Option<Arc<Notify>>,
}

impl LikeService {
    pub fn new(
        store: Store,
        identity: Arc<dyn Identity>,
        feed: ChangeFeed,
        config: LikeConfig,
    ) -> Self {
        Self {
            store,
            identity,
            feed,
            config,
            wake: None,
        }
    }

    /// Notify `wake` after every committed like.
    #[must_use]
    pub fn with_trigger_wake(mut self, wake: Arc<Notify>) -> Self {
        self.wake = Some(wake);
        self
    }

    /// The signed-in actor, if any.
    pub fn current_actor(&self) -> Option<Actor> {
        self.identity.current_actor()
    }

    pub const fn store(&self) -> &Store {
        &self.store
    }

    pub const fn feed(&self) -> &ChangeFeed {
        &self.feed
    }

    /// Toggle the current actor's like on `post_id`.
    ///
    /// `owner_id` is copied into the membership and reverse-index records.
    /// On success the membership and counter changes are published to the
    /// change feed, after the commit.
    #[instrument(skip(self), fields(liker_id))]
    pub async fn toggle(
        &self,
        post_id: &str,
        owner_id: &str,
    ) -> Result<ToggleOutcome, LikeError> {
        let actor = self.current_actor().ok_or(LikeError::Unauthenticated)?;
        tracing::Span::current().record("liker_id", actor.id.as_str());

        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;
        let outcome = loop {
            match self
                .store
                .toggle_like(post_id, &actor.id, actor.kind, owner_id)
                .await
            {
                Ok(outcome) => break outcome,
                Err(e) if e.is_conflict() && attempt < max_attempts => {
                    debug!(attempt, error = %e, "Like transaction conflicted, retrying");
                    let backoff = self.config.retry_backoff_ms * u64::from(attempt);
                    tokio::time::sleep(Duration::from_millis(backoff)).await;
                    attempt += 1;
                }
                Err(DatabaseError::NotFound(_)) => {
                    return Err(LikeError::PostNotFound(post_id.to_string()));
                }
                Err(e) if e.is_conflict() => {
                    warn!(attempts = attempt, "Like transaction gave up after conflicts");
                    return Err(LikeError::Conflict { attempts: attempt });
                }
                Err(e) => return Err(LikeError::Storage(e)),
            }
        };

        self.feed.publish(DocumentChange::Membership {
            post_id: post_id.to_string(),
            liker_id: actor.id.clone(),
        });
        self.feed.publish(DocumentChange::Post {
            post_id: post_id.to_string(),
        });
        if outcome.liked
            && let Some(wake) = &self.wake
        {
            wake.notify_one();
        }
        telemetry::like_toggled(outcome.liked);

        info!(
            post_id,
            liked = outcome.liked,
            like_count = outcome.like_count,
            "Like toggled"
        );
        Ok(outcome)
    }

    /// Posts the current actor likes, most recent first.
    pub async fn liked_posts(&self, limit: i64) -> Result<Vec<Post>, LikeError> {
        let actor = self.current_actor().ok_or(LikeError::Unauthenticated)?;
        self.store
            .list_liked_posts(&actor.id, limit)
            .await
            .map_err(LikeError::Storage)
    }

    /// Reverse-index entries of the current actor, most recent first.
    pub async fn liked_index(&self, limit: i64) -> Result<Vec<LikedPost>, LikeError> {
        let actor = self.current_actor().ok_or(LikeError::Unauthenticated)?;
        self.store
            .list_liked_index(&actor.id, limit)
            .await
            .map_err(LikeError::Storage)
    }

    /// Membership records of a post, most recent first.
    pub async fn post_likers(
        &self,
        post_id: &str,
        limit: i64,
    ) -> Result<Vec<PostLike>, LikeError> {
        self.store
            .list_post_likes(post_id, limit)
            .await
            .map_err(LikeError::Storage)
    }
}
