//! Client-side like feed.
//!
//! [`LikeFeed`] holds the locally rendered list of posts. It keeps one
//! counter watch and one membership watch per visible post, and applies
//! like taps optimistically: only the actor's flag flips before the server
//! confirms, the counter is always the server's.

mod controller;
mod registry;

#[cfg(test)]
mod tests;

pub use controller::LikeFeed;
pub use registry::SubscriptionRegistry;

use serde::{Deserialize, Serialize};

use crate::likes::LikeError;
use crate::storage::Post;

/// One rendered post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoItem {
    pub id: String,
    pub owner_id: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub like_count: i64,
    #[serde(default, rename = "isLikedByMe")]
    pub liked_by_me: bool,
}

impl From<Post> for VideoItem {
    fn from(post: Post) -> Self {
        Self {
            id: post.id,
            owner_id: post.owner_id,
            url: post.url,
            description: post.description,
            like_count: post.like_count,
            liked_by_me: false,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// The post is not part of the rendered list.
    #[error("post not in feed: {0}")]
    NotInFeed(String),

    /// The toggle failed; the optimistic flag was reverted.
    #[error(transparent)]
    Like(#[from] LikeError),
}
