//! Favorite queries.
//!
//! Players favorite clubs and clubs favorite players. The follower lookups
//! answer "who should hear about this offer or post".

use courtside_core::db::unix_timestamp;

use super::db::{DatabaseError, Store};
use super::models::{FavoriteClub, FavoritePlayer};

impl Store {
    // =========================================================================
    // Players following clubs
    // =========================================================================

    /// Returns `false` when the favorite already existed.
    pub async fn add_favorite_club(
        &self,
        player_id: &str,
        club_id: &str,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO favorite_clubs (player_id, club_id, created_at) \
             VALUES (?, ?, ?)",
        )
        .bind(player_id)
        .bind(club_id)
        .bind(unix_timestamp())
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn remove_favorite_club(
        &self,
        player_id: &str,
        club_id: &str,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM favorite_clubs WHERE player_id = ? AND club_id = ?")
            .bind(player_id)
            .bind(club_id)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn list_favorite_clubs(
        &self,
        player_id: &str,
    ) -> Result<Vec<FavoriteClub>, DatabaseError> {
        let favorites = sqlx::query_as::<_, FavoriteClub>(
            "SELECT * FROM favorite_clubs WHERE player_id = ? ORDER BY created_at DESC, club_id",
        )
        .bind(player_id)
        .fetch_all(self.pool())
        .await?;

        Ok(favorites)
    }

    /// Players who favorited `club_id`.
    pub async fn club_followers(&self, club_id: &str) -> Result<Vec<String>, DatabaseError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT player_id FROM favorite_clubs WHERE club_id = ? ORDER BY player_id",
        )
        .bind(club_id)
        .fetch_all(self.pool())
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    // =========================================================================
    // Clubs following players
    // =========================================================================

    /// Returns `false` when the favorite already existed.
    pub async fn add_favorite_player(
        &self,
        club_id: &str,
        player_id: &str,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO favorite_players (club_id, player_id, created_at) \
             VALUES (?, ?, ?)",
        )
        .bind(club_id)
        .bind(player_id)
        .bind(unix_timestamp())
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn remove_favorite_player(
        &self,
        club_id: &str,
        player_id: &str,
    ) -> Result<bool, DatabaseError> {
        let result =
            sqlx::query("DELETE FROM favorite_players WHERE club_id = ? AND player_id = ?")
                .bind(club_id)
                .bind(player_id)
                .execute(self.pool())
                .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn list_favorite_players(
        &self,
        club_id: &str,
    ) -> Result<Vec<FavoritePlayer>, DatabaseError> {
        let favorites = sqlx::query_as::<_, FavoritePlayer>(
            "SELECT * FROM favorite_players WHERE club_id = ? ORDER BY created_at DESC, player_id",
        )
        .bind(club_id)
        .fetch_all(self.pool())
        .await?;

        Ok(favorites)
    }

    /// Clubs who favorited `player_id`.
    pub async fn player_followers(&self, player_id: &str) -> Result<Vec<String>, DatabaseError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT club_id FROM favorite_players WHERE player_id = ? ORDER BY club_id",
        )
        .bind(player_id)
        .fetch_all(self.pool())
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}
