//! Realtime change subscriptions.
//!
//! Writers publish a [`DocumentChange`] after their transaction commits.
//! A [`Watch`] delivers the current value of one document on subscribe and
//! again after every change to it. Changes are only invalidations: a watch
//! re-reads the committed state, so late or lagged notifications can never
//! deliver a stale value.

mod watch;

pub use watch::{Watch, watch_like_count, watch_membership};

use courtside_core::config::FeedConfig;
use tokio::sync::broadcast;
use tracing::trace;

/// Identifies a document whose committed state changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentChange {
    /// `posts/{post_id}` (the like counter).
    Post { post_id: String },
    /// `posts/{post_id}/likes/{liker_id}` (membership existence).
    Membership { post_id: String, liker_id: String },
}

/// In-process fan-out of committed document changes.
#[derive(Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<DocumentChange>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Announce a committed change. Having no subscribers is not an error.
    pub fn publish(&self, change: DocumentChange) {
        let receivers = self.tx.send(change).unwrap_or(0);
        trace!(receivers, "Document change published");
    }

    pub fn from_config(config: &FeedConfig) -> Self {
        Self::new(config.broadcast_capacity)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DocumentChange> {
        self.tx.subscribe()
    }

    /// Number of live receivers (one per active watch).
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(FeedConfig::default().broadcast_capacity)
    }
}
