//! Like toggle protocol.
//!
//! [`LikeService::toggle`] flips the current actor's like on a post: the
//! membership record, the actor's reverse-index record and the post counter
//! change together in one transaction, retried on write conflicts.

mod service;


pub use service::LikeService;

use crate::storage::DatabaseError;

/// Errors surfaced by the like protocol.
#[derive(Debug, thiserror::Error)]
pub enum LikeError {
    /// No actor is signed in; nothing was written.
    #[error("not signed in")]
    Unauthenticated,

    /// The post does not exist; nothing was written.
    #[error("post not found: {0}")]
    PostNotFound(String),

    /// The transaction kept conflicting with concurrent writers.
    #[error("like transaction conflicted {attempts} times")]
    Conflict {
        /// Attempts made before giving up.
        attempts: u32,
    },

    /// Any other storage failure; the transaction rolled back.
    #[error("storage error: {0}")]
    Storage(DatabaseError),
}
