//! Favorites: players follow clubs, clubs follow players.
//!
//! The actor's account kind picks the direction. Followers are pushed a
//! notification when the followed account publishes an offer or a post.

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::auth::{Actor, Identity};
use crate::storage::{AccountKind, DatabaseError, Store};

#[derive(Debug, thiserror::Error)]
pub enum FavoriteError {
    #[error("not signed in")]
    Unauthenticated,

    #[error("favorite target must not be empty")]
    EmptyTarget,

    #[error("storage error: {0}")]
    Storage(#[from] DatabaseError),
}

pub struct FavoriteService {
    store: Store,
    identity: Arc<dyn Identity>,
}

impl FavoriteService {
    pub fn new(store: Store, identity: Arc<dyn Identity>) -> Self {
        Self { store, identity }
    }

    fn actor(&self) -> Result<Actor, FavoriteError> {
        self.identity
            .current_actor()
            .ok_or(FavoriteError::Unauthenticated)
    }

    /// Follow a club (as a player) or a player (as a club).
    ///
    /// Returns `false` when the favorite already existed.
    #[instrument(skip(self))]
    pub async fn add(&self, target_id: &str) -> Result<bool, FavoriteError> {
        let actor = self.actor()?;
        if target_id.is_empty() {
            return Err(FavoriteError::EmptyTarget);
        }
        let added = match actor.kind {
            AccountKind::Player => self.store.add_favorite_club(&actor.id, target_id).await?,
            AccountKind::Club => self.store.add_favorite_player(&actor.id, target_id).await?,
        };
        debug!(actor_id = %actor.id, added, "Favorite added");
        Ok(added)
    }

    /// Returns `false` when there was nothing to remove.
    #[instrument(skip(self))]
    pub async fn remove(&self, target_id: &str) -> Result<bool, FavoriteError> {
        let actor = self.actor()?;
        let removed = match actor.kind {
            AccountKind::Player => self.store.remove_favorite_club(&actor.id, target_id).await?,
            AccountKind::Club => self.store.remove_favorite_player(&actor.id, target_id).await?,
        };
        Ok(removed)
    }

    /// Ids the signed-in actor follows, newest first.
    pub async fn list(&self) -> Result<Vec<String>, FavoriteError> {
        let actor = self.actor()?;
        let ids = match actor.kind {
            AccountKind::Player => self
                .store
                .list_favorite_clubs(&actor.id)
                .await?
                .into_iter()
                .map(|f| f.club_id)
                .collect(),
            AccountKind::Club => self
                .store
                .list_favorite_players(&actor.id)
                .await?
                .into_iter()
                .map(|f| f.player_id)
                .collect(),
        };
        Ok(ids)
    }
}
