//! Per-document watches over the change feed.

use std::future::Future;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{ChangeFeed, DocumentChange};
use crate::storage::{DatabaseError, Store};

/// A live subscription. Dropping it cancels the underlying task.
#[derive(Debug)]
pub struct Watch {
    handle: JoinHandle<()>,
}

impl Watch {
    /// Whether the watch task has stopped (feed closed or cancelled).
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for Watch {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Watch the like counter of a post.
///
/// `on_change` receives the committed `likeCount` immediately and after every
/// change. Nothing is delivered while the post does not exist.
pub fn watch_like_count<F>(
    store: Store,
    feed: &ChangeFeed,
    post_id: String,
    mut on_change: F,
) -> Watch
where
    F: FnMut(i64) + Send + 'static,
{
    let key = post_id.clone();
    spawn_watch(
        feed,
        move |change| matches!(change, DocumentChange::Post { post_id } if *post_id == key),
        move || {
            let store = store.clone();
            let post_id = post_id.clone();
            async move { store.like_count(&post_id).await }
        },
        move |count| {
            if let Some(count) = count {
                on_change(count);
            }
        },
    )
}

/// Watch whether `liker_id` currently likes `post_id`.
pub fn watch_membership<F>(
    store: Store,
    feed: &ChangeFeed,
    post_id: String,
    liker_id: String,
    on_change: F,
) -> Watch
where
    F: FnMut(bool) + Send + 'static,
{
    let (key_post, key_liker) = (post_id.clone(), liker_id.clone());
    spawn_watch(
        feed,
        move |change| {
            matches!(change, DocumentChange::Membership { post_id, liker_id }
                if *post_id == key_post && *liker_id == key_liker)
        },
        move || {
            let store = store.clone();
            let (post_id, liker_id) = (post_id.clone(), liker_id.clone());
            async move { store.has_liked(&post_id, &liker_id).await }
        },
        on_change,
    )
}

fn spawn_watch<T, M, R, Fut, F>(feed: &ChangeFeed, matches: M, read: R, mut on_change: F) -> Watch
where
    T: Send + 'static,
    M: Fn(&DocumentChange) -> bool + Send + 'static,
    R: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, DatabaseError>> + Send,
    F: FnMut(T) + Send + 'static,
{
    // Subscribe before the initial read so no commit falls in between.
    let mut rx = feed.subscribe();

    let handle = tokio::spawn(async move {
        deliver(&read, &mut on_change).await;
        loop {
            match rx.recv().await {
                Ok(change) if matches(&change) => deliver(&read, &mut on_change).await,
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "Watch lagged, re-reading");
                    deliver(&read, &mut on_change).await;
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    Watch { handle }
}

async fn deliver<T, R, Fut, F>(read: &R, on_change: &mut F)
where
    R: Fn() -> Fut,
    Fut: Future<Output = Result<T, DatabaseError>>,
    F: FnMut(T),
{
    match read().await {
        Ok(value) => on_change(value),
        // A failed read skips this delivery; the next change retries it.
        Err(e) => warn!(error = %e, "Watch read failed"),
    }
}
