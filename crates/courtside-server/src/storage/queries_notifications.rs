//! Notification and device token queries.

use courtside_core::db::unix_timestamp;
use sqlx::types::Json;

use super::db::{DatabaseError, Store};
use super::models::{DeviceToken, Metadata, Notification};

impl Store {
    // =========================================================================
    // Notifications
    // =========================================================================

    /// Append an unread notification for an account.
    pub async fn insert_notification(
        &self,
        id: &str,
        account_id: &str,
        kind: &str,
        title: &str,
        body: &str,
        metadata: &Metadata,
    ) -> Result<Notification, DatabaseError> {
        let now = unix_timestamp();

        sqlx::query(
            "INSERT INTO notifications \
             (id, account_id, type, title, body, metadata, read, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, 0, ?)",
        )
        .bind(id)
        .bind(account_id)
        .bind(kind)
        .bind(title)
        .bind(body)
        .bind(Json(metadata))
        .bind(now)
        .execute(self.pool())
        .await?;

        self.get_notification(id).await
    }

    pub async fn get_notification(&self, id: &str) -> Result<Notification, DatabaseError> {
        sqlx::query_as::<_, Notification>("SELECT * FROM notifications WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("notification {id}")))
    }

    /// Notifications of an account, newest first.
    pub async fn list_notifications(
        &self,
        account_id: &str,
        limit: i64,
    ) -> Result<Vec<Notification>, DatabaseError> {
        let rows = sqlx::query_as::<_, Notification>(
            "SELECT * FROM notifications WHERE account_id = ? \
             ORDER BY created_at DESC, id LIMIT ?",
        )
        .bind(account_id)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        Ok(rows)
    }

    pub async fn count_unread_notifications(
        &self,
        account_id: &str,
    ) -> Result<i64, DatabaseError> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM notifications WHERE account_id = ? AND read = 0",
        )
        .bind(account_id)
        .fetch_one(self.pool())
        .await?;
        Ok(count)
    }

    /// Set the read flag. Only the owning account may do so.
    ///
    /// Returns `true` if the flag changed, `false` if it was already set.
    pub async fn mark_notification_read(
        &self,
        id: &str,
        account_id: &str,
    ) -> Result<bool, DatabaseError> {
        let owned: Option<(bool,)> =
            sqlx::query_as("SELECT read FROM notifications WHERE id = ? AND account_id = ?")
                .bind(id)
                .bind(account_id)
                .fetch_optional(self.pool())
                .await?;

        match owned {
            None => Err(DatabaseError::NotFound(format!("notification {id}"))),
            Some((true,)) => Ok(false),
            Some((false,)) => {
                sqlx::query("UPDATE notifications SET read = 1 WHERE id = ? AND account_id = ?")
                    .bind(id)
                    .bind(account_id)
                    .execute(self.pool())
                    .await?;
                Ok(true)
            }
        }
    }

    // =========================================================================
    // Device tokens
    // =========================================================================

    /// Register or update a device token.
    ///
    /// If a record with the same `device_token` already exists, its
    /// `account_id`, `platform`, and `created_at` are updated (upsert).
    pub async fn upsert_device_token(
        &self,
        id: &str,
        account_id: &str,
        device_token: &str,
        platform: &str,
    ) -> Result<(), DatabaseError> {
        let now = unix_timestamp();

        sqlx::query(
            "INSERT INTO device_tokens (id, account_id, device_token, platform, created_at) \
             VALUES (?, ?, ?, ?, ?) \
             ON CONFLICT(device_token) DO UPDATE SET \
             account_id = excluded.account_id, platform = excluded.platform, \
             created_at = excluded.created_at",
        )
        .bind(id)
        .bind(account_id)
        .bind(device_token)
        .bind(platform)
        .bind(now)
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// Delete a device token by its token string.
    ///
    /// Returns `true` if a row was deleted, `false` if the token was not found.
    pub async fn delete_device_token(&self, device_token: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM device_tokens WHERE device_token = ?")
            .bind(device_token)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// All device tokens registered for an account, oldest first.
    pub async fn get_device_tokens_for_account(
        &self,
        account_id: &str,
    ) -> Result<Vec<DeviceToken>, DatabaseError> {
        let tokens = sqlx::query_as::<_, DeviceToken>(
            "SELECT * FROM device_tokens WHERE account_id = ? ORDER BY created_at, id",
        )
        .bind(account_id)
        .fetch_all(self.pool())
        .await?;

        Ok(tokens)
    }

    pub async fn get_device_token(
        &self,
        device_token: &str,
    ) -> Result<Option<DeviceToken>, DatabaseError> {
        let token =
            sqlx::query_as::<_, DeviceToken>("SELECT * FROM device_tokens WHERE device_token = ?")
                .bind(device_token)
                .fetch_optional(self.pool())
                .await?;

        Ok(token)
    }
}
