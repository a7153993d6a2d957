//! Account, post and offer queries.
//!
//! Creating a post or an offer enqueues its trigger in the same transaction,
//! so followers are told about it.

use courtside_core::db::unix_timestamp;

use super::db::{DatabaseError, Store};
use super::models::{Account, AccountKind, Offer, OfferParams, Post, PostParams, event_kind};
use super::queries_candidatures::to_json;
use super::queries_triggers::{NewTriggerEvent, enqueue_event_tx};

impl Store {
    // =========================================================================
    // Accounts
    // =========================================================================

    pub async fn create_account(
        &self,
        id: &str,
        kind: AccountKind,
        display_name: &str,
    ) -> Result<Account, DatabaseError> {
        let now = unix_timestamp();

        sqlx::query(
            "INSERT INTO accounts (id, kind, display_name, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(id)
        .bind(kind)
        .bind(display_name)
        .bind(now)
        .execute(self.pool())
        .await?;

        self.get_account(id).await
    }

    pub async fn get_account(&self, id: &str) -> Result<Account, DatabaseError> {
        sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("account {id}")))
    }

    // =========================================================================
    // Posts
    // =========================================================================

    pub async fn create_post(
        &self,
        id: &str,
        owner_id: &str,
        url: &str,
        description: Option<&str>,
    ) -> Result<Post, DatabaseError> {
        let post = Post {
            id: id.to_string(),
            owner_id: owner_id.to_string(),
            url: url.to_string(),
            description: description.map(str::to_string),
            like_count: 0,
            created_at: unix_timestamp(),
        };

        let mut tx = self.pool().begin().await?;
        sqlx::query(
            "INSERT INTO posts (id, owner_id, url, description, like_count, created_at) \
             VALUES (?, ?, ?, ?, 0, ?)",
        )
        .bind(&post.id)
        .bind(&post.owner_id)
        .bind(&post.url)
        .bind(&post.description)
        .bind(post.created_at)
        .execute(&mut *tx)
        .await?;

        let params = PostParams {
            post_id: post.id.clone(),
        };
        enqueue_event_tx(
            &mut *tx,
            &NewTriggerEvent {
                kind: event_kind::POST_CREATED,
                params: &to_json(&params)?,
                payload: &to_json(&post)?,
            },
        )
        .await?;
        tx.commit().await?;

        Ok(post)
    }

    pub async fn get_post(&self, id: &str) -> Result<Post, DatabaseError> {
        sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("post {id}")))
    }

    /// Current counter of a post, `None` if the post does not exist.
    pub async fn like_count(&self, post_id: &str) -> Result<Option<i64>, DatabaseError> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT like_count FROM posts WHERE id = ?")
            .bind(post_id)
            .fetch_optional(self.pool())
            .await?;
        Ok(row.map(|(count,)| count))
    }

    // =========================================================================
    // Offers
    // =========================================================================

    pub async fn create_offer(
        &self,
        id: &str,
        club_id: &str,
        title: &str,
        location: &str,
    ) -> Result<Offer, DatabaseError> {
        let offer = Offer {
            id: id.to_string(),
            club_id: club_id.to_string(),
            title: title.to_string(),
            location: location.to_string(),
            created_at: unix_timestamp(),
        };

        let mut tx = self.pool().begin().await?;
        sqlx::query(
            "INSERT INTO offers (id, club_id, title, location, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&offer.id)
        .bind(&offer.club_id)
        .bind(&offer.title)
        .bind(&offer.location)
        .bind(offer.created_at)
        .execute(&mut *tx)
        .await?;

        let params = OfferParams {
            club_id: offer.club_id.clone(),
            offer_id: offer.id.clone(),
        };
        enqueue_event_tx(
            &mut *tx,
            &NewTriggerEvent {
                kind: event_kind::OFFER_CREATED,
                params: &to_json(&params)?,
                payload: &to_json(&offer)?,
            },
        )
        .await?;
        tx.commit().await?;

        Ok(offer)
    }

    pub async fn get_offer(&self, id: &str) -> Result<Offer, DatabaseError> {
        sqlx::query_as::<_, Offer>("SELECT * FROM offers WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("offer {id}")))
    }
}
