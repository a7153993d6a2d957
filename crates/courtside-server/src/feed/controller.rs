//! Rendered feed state and the optimistic like procedure.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::{debug, warn};

use super::{FeedError, SubscriptionRegistry, VideoItem};
use crate::likes::{LikeError, LikeService};
use crate::storage::ToggleOutcome;

type Items = Arc<Mutex<Vec<VideoItem>>>;

/// Locally rendered posts kept in sync with the store.
///
/// Dropping the feed releases every subscription it holds.
pub struct LikeFeed {
    likes: LikeService,
    items: Items,
    version: Arc<watch::Sender<u64>>,
    registry: SubscriptionRegistry,
    subscribed_as: Option<String>,
}

impl LikeFeed {
    pub fn new(likes: LikeService) -> Self {
        let registry =
            SubscriptionRegistry::new(likes.store().clone(), likes.feed().clone());
        let (version, _) = watch::channel(0);
        Self {
            likes,
            items: Arc::new(Mutex::new(Vec::new())),
            version: Arc::new(version),
            registry,
            subscribed_as: None,
        }
    }

    /// Replace the rendered list.
    ///
    /// Posts already rendered keep their local state. Subscriptions are
    /// attached for new posts and released for posts no longer visible.
    /// Without a signed-in actor no subscriptions are held.
    pub fn set_visible(&mut self, visible: Vec<VideoItem>) {
        {
            let mut items = lock(&self.items);
            let merged = visible
                .into_iter()
                .map(|item| {
                    items
                        .iter()
                        .find(|current| current.id == item.id)
                        .cloned()
                        .unwrap_or(item)
                })
                .collect();
            *items = merged;
        }
        bump(&self.version);
        self.resubscribe();
    }

    /// Re-evaluate subscriptions, e.g. after the signed-in actor changed.
    ///
    /// After a sign-out or a switch to another actor the flags start
    /// unliked; the new actor's membership watches fill them in.
    pub fn resubscribe(&mut self) {
        let actor = self.likes.current_actor().map(|actor| actor.id);
        if actor != self.subscribed_as {
            self.registry.clear();
            if self.subscribed_as.is_some() {
                for item in lock(&self.items).iter_mut() {
                    item.liked_by_me = false;
                }
                bump(&self.version);
            }
            self.subscribed_as.clone_from(&actor);
        }
        let Some(actor_id) = actor else {
            return;
        };

        let ids: Vec<String> = lock(&self.items)
            .iter()
            .map(|item| item.id.clone())
            .collect();
        let released = self.registry.retain(|post_id| ids.iter().any(|id| id == post_id));
        if released > 0 {
            debug!(released, "Released subscriptions for hidden posts");
        }

        for post_id in ids {
            let on_count = {
                let (items, version) = (self.items.clone(), self.version.clone());
                let post_id = post_id.clone();
                move |count| {
                    update(&items, &version, &post_id, |item| item.like_count = count);
                }
            };
            let on_liked = {
                let (items, version) = (self.items.clone(), self.version.clone());
                let post_id = post_id.clone();
                move |liked| {
                    update(&items, &version, &post_id, |item| item.liked_by_me = liked);
                }
            };
            self.registry.attach(&post_id, &actor_id, on_count, on_liked);
        }
    }

    /// Toggle the actor's like on a rendered post.
    ///
    /// The flag flips before the server call; the counter is left to the
    /// subscription. On failure the flag returns to its pre-tap value and the
    /// error is returned for the caller to report.
    ///
    /// If the signed-in actor changed since the last subscription pass, the
    /// feed resubscribes first so the flipped flag belongs to the new actor.
    pub async fn toggle_like(&mut self, post_id: &str) -> Result<ToggleOutcome, FeedError> {
        let Some(actor) = self.likes.current_actor() else {
            return Err(LikeError::Unauthenticated.into());
        };
        if self.subscribed_as.as_deref() != Some(actor.id.as_str()) {
            debug!(actor_id = %actor.id, "Actor changed, resubscribing before toggle");
            self.resubscribe();
        }

        let (previous, owner_id) = {
            let mut items = lock(&self.items);
            let item = items
                .iter_mut()
                .find(|item| item.id == post_id)
                .ok_or_else(|| FeedError::NotInFeed(post_id.to_string()))?;
            let previous = item.liked_by_me;
            item.liked_by_me = !previous;
            (previous, item.owner_id.clone())
        };
        bump(&self.version);

        match self.likes.toggle(post_id, &owner_id).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                warn!(post_id, error = %e, "Like failed, reverting");
                update(&self.items, &self.version, post_id, |item| {
                    item.liked_by_me = previous;
                });
                Err(e.into())
            }
        }
    }

    /// Copy of the rendered list.
    pub fn snapshot(&self) -> Vec<VideoItem> {
        lock(&self.items).clone()
    }

    pub fn item(&self, post_id: &str) -> Option<VideoItem> {
        lock(&self.items).iter().find(|item| item.id == post_id).cloned()
    }

    /// Receiver notified whenever the rendered list changes.
    pub fn changed(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    /// Number of posts with live subscriptions.
    pub fn active_subscriptions(&self) -> usize {
        self.registry.len()
    }
}

fn lock(items: &Items) -> MutexGuard<'_, Vec<VideoItem>> {
    items.lock().unwrap_or_else(PoisonError::into_inner)
}

fn bump(version: &watch::Sender<u64>) {
    version.send_modify(|v| *v = v.wrapping_add(1));
}

fn update(
    items: &Items,
    version: &watch::Sender<u64>,
    post_id: &str,
    apply: impl FnOnce(&mut VideoItem),
) {
    let changed = {
        let mut items = lock(items);
        items.iter_mut().find(|item| item.id == post_id).map(apply).is_some()
    };
    if changed {
        bump(version);
    }
}
