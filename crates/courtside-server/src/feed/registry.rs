//! Per-post subscription bookkeeping.

use std::collections::HashMap;

use tracing::debug;

use crate::changes::{ChangeFeed, Watch, watch_like_count, watch_membership};
use crate::storage::Store;

struct PostWatches {
    _count: Watch,
    _membership: Watch,
}

/// Owns the watches of every attached post. Detaching a post, or dropping
/// the registry, cancels its watches.
pub struct SubscriptionRegistry {
    store: Store,
    feed: ChangeFeed,
    entries: HashMap<String, PostWatches>,
}

impl SubscriptionRegistry {
    pub fn new(store: Store, feed: ChangeFeed) -> Self {
        Self {
            store,
            feed,
            entries: HashMap::new(),
        }
    }

    /// Watch the counter of `post_id` and `liker_id`'s membership on it.
    ///
    /// Returns `false` without subscribing again if the post is already
    /// attached.
    pub fn attach<C, M>(
        &mut self,
        post_id: &str,
        liker_id: &str,
        on_count: C,
        on_liked: M,
    ) -> bool
    where
        C: FnMut(i64) + Send + 'static,
        M: FnMut(bool) + Send + 'static,
    {
        if self.entries.contains_key(post_id) {
            return false;
        }

        let count = watch_like_count(
            self.store.clone(),
            &self.feed,
            post_id.to_string(),
            on_count,
        );
        let membership = watch_membership(
            self.store.clone(),
            &self.feed,
            post_id.to_string(),
            liker_id.to_string(),
            on_liked,
        );
        self.entries.insert(
            post_id.to_string(),
            PostWatches {
                _count: count,
                _membership: membership,
            },
        );
        debug!(post_id, liker_id, "Post subscriptions attached");
        true
    }

    /// Release the watches of one post.
    pub fn detach(&mut self, post_id: &str) -> bool {
        let removed = self.entries.remove(post_id).is_some();
        if removed {
            debug!(post_id, "Post subscriptions released");
        }
        removed
    }

    /// Keep only posts for which `keep` returns `true`. Returns how many
    /// posts were released.
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|post_id, _| keep(post_id));
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn contains(&self, post_id: &str) -> bool {
        self.entries.contains_key(post_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
