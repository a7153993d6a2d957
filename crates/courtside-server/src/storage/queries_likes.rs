//! Like membership, reverse index and counter queries.
//!
//! The three records only change together, inside [`Store::toggle_like`],
//! which also enqueues the like trigger when a like is created.

use courtside_core::db::unix_timestamp;

use super::db::{DatabaseError, Store};
use super::models::{AccountKind, LikeParams, LikedPost, Post, PostLike, event_kind};
use super::queries_candidatures::to_json;
use super::queries_triggers::{NewTriggerEvent, enqueue_event_tx};

/// Result of one committed toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleOutcome {
    /// `true` if the toggle created the like, `false` if it removed it.
    pub liked: bool,
    /// Counter value committed by this toggle.
    pub like_count: i64,
}

impl Store {
    /// Flip `liker_id`'s like on `post_id` in a single transaction.
    ///
    /// Writes the membership record, the reverse-index record under
    /// `namespace`, and the post counter. The counter never goes below zero.
    /// Nothing is written if the post does not exist or any statement fails.
    pub async fn toggle_like(
        &self,
        post_id: &str,
        liker_id: &str,
        namespace: AccountKind,
        owner_id: &str,
    ) -> Result<ToggleOutcome, DatabaseError> {
        let mut tx = self.pool().begin().await?;

        let exists: Option<(i64,)> = sqlx::query_as("SELECT like_count FROM posts WHERE id = ?")
            .bind(post_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(DatabaseError::NotFound(format!("post {post_id}")));
        }

        let membership: Option<(i64,)> =
            sqlx::query_as("SELECT 1 FROM post_likes WHERE post_id = ? AND liker_id = ?")
                .bind(post_id)
                .bind(liker_id)
                .fetch_optional(&mut *tx)
                .await?;

        let liked = if membership.is_some() {
            sqlx::query("DELETE FROM post_likes WHERE post_id = ? AND liker_id = ?")
                .bind(post_id)
                .bind(liker_id)
                .execute(&mut *tx)
                .await?;

            sqlx::query("DELETE FROM liked_posts WHERE account_id = ? AND post_id = ?")
                .bind(liker_id)
                .bind(post_id)
                .execute(&mut *tx)
                .await?;

            sqlx::query("UPDATE posts SET like_count = MAX(like_count - 1, 0) WHERE id = ?")
                .bind(post_id)
                .execute(&mut *tx)
                .await?;

            false
        } else {
            let now = unix_timestamp();

            sqlx::query(
                "INSERT INTO post_likes (post_id, liker_id, post_owner_id, created_at) \
                 VALUES (?, ?, ?, ?)",
            )
            .bind(post_id)
            .bind(liker_id)
            .bind(owner_id)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            // A stale reverse-index row without membership is overwritten.
            sqlx::query(
                "INSERT INTO liked_posts (account_id, post_id, namespace, owner_id, created_at) \
                 VALUES (?, ?, ?, ?, ?) \
                 ON CONFLICT(account_id, post_id) DO UPDATE SET \
                 namespace = excluded.namespace, owner_id = excluded.owner_id, \
                 created_at = excluded.created_at",
            )
            .bind(liker_id)
            .bind(post_id)
            .bind(namespace)
            .bind(owner_id)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            sqlx::query("UPDATE posts SET like_count = like_count + 1 WHERE id = ?")
                .bind(post_id)
                .execute(&mut *tx)
                .await?;

            let params = LikeParams {
                post_id: post_id.to_string(),
                liker_id: liker_id.to_string(),
            };
            let like = PostLike {
                post_id: post_id.to_string(),
                liker_id: liker_id.to_string(),
                post_owner_id: owner_id.to_string(),
                created_at: now,
            };
            enqueue_event_tx(
                &mut *tx,
                &NewTriggerEvent {
                    kind: event_kind::LIKE_CREATED,
                    params: &to_json(&params)?,
                    payload: &to_json(&like)?,
                },
            )
            .await?;

            true
        };

        let (like_count,): (i64,) = sqlx::query_as("SELECT like_count FROM posts WHERE id = ?")
            .bind(post_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(ToggleOutcome { liked, like_count })
    }

    /// Whether the membership record for (post, liker) exists.
    pub async fn has_liked(&self, post_id: &str, liker_id: &str) -> Result<bool, DatabaseError> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT 1 FROM post_likes WHERE post_id = ? AND liker_id = ?")
                .bind(post_id)
                .bind(liker_id)
                .fetch_optional(self.pool())
                .await?;
        Ok(row.is_some())
    }

    /// Whether the reverse-index record for (account, post) exists.
    pub async fn in_liked_index(
        &self,
        account_id: &str,
        post_id: &str,
    ) -> Result<bool, DatabaseError> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT 1 FROM liked_posts WHERE account_id = ? AND post_id = ?")
                .bind(account_id)
                .bind(post_id)
                .fetch_optional(self.pool())
                .await?;
        Ok(row.is_some())
    }

    /// Number of membership records for a post.
    pub async fn count_likes(&self, post_id: &str) -> Result<i64, DatabaseError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM post_likes WHERE post_id = ?")
            .bind(post_id)
            .fetch_one(self.pool())
            .await?;
        Ok(count)
    }

    /// Membership records of a post, newest first.
    pub async fn list_post_likes(
        &self,
        post_id: &str,
        limit: i64,
    ) -> Result<Vec<PostLike>, DatabaseError> {
        let likes = sqlx::query_as::<_, PostLike>(
            "SELECT * FROM post_likes WHERE post_id = ? \
             ORDER BY created_at DESC, liker_id LIMIT ?",
        )
        .bind(post_id)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        Ok(likes)
    }

    /// Reverse-index records of an account, newest first.
    pub async fn list_liked_index(
        &self,
        account_id: &str,
        limit: i64,
    ) -> Result<Vec<LikedPost>, DatabaseError> {
        let entries = sqlx::query_as::<_, LikedPost>(
            "SELECT * FROM liked_posts WHERE account_id = ? \
             ORDER BY created_at DESC, post_id LIMIT ?",
        )
        .bind(account_id)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        Ok(entries)
    }

    /// Posts liked by an account, most recently liked first.
    pub async fn list_liked_posts(
        &self,
        account_id: &str,
        limit: i64,
    ) -> Result<Vec<Post>, DatabaseError> {
        let posts = sqlx::query_as::<_, Post>(
            "SELECT p.* FROM liked_posts l JOIN posts p ON p.id = l.post_id \
             WHERE l.account_id = ? ORDER BY l.created_at DESC, l.post_id LIMIT ?",
        )
        .bind(account_id)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        Ok(posts)
    }
}
