//! Trigger outbox queries.
//!
//! Writes that fire a trigger append an event in the same transaction, so an
//! event exists iff its source write committed. One trigger runtime consumes
//! the outbox per database.

use courtside_core::db::unix_timestamp;
use sqlx::SqliteConnection;

use super::db::{DatabaseError, Store};
use super::models::TriggerEvent;

/// Parameters for appending an event to the outbox.
pub struct NewTriggerEvent<'a> {
    pub kind: &'a str,
    /// JSON object of path parameters (e.g. club, offer, candidature ids).
    pub params: &'a str,
    /// JSON snapshot of the document that fired the trigger.
    pub payload: &'a str,
}

/// Append an event using an open connection or transaction.
pub(super) async fn enqueue_event_tx(
    conn: &mut SqliteConnection,
    event: &NewTriggerEvent<'_>,
) -> Result<i64, DatabaseError> {
    let result = sqlx::query(
        "INSERT INTO trigger_events (kind, params, payload, attempts, created_at) \
         VALUES (?, ?, ?, 0, ?)",
    )
    .bind(event.kind)
    .bind(event.params)
    .bind(event.payload)
    .bind(unix_timestamp())
    .execute(conn)
    .await?;

    Ok(result.last_insert_rowid())
}

impl Store {
    /// Append an event written outside any other transaction.
    pub async fn enqueue_event(&self, event: &NewTriggerEvent<'_>) -> Result<i64, DatabaseError> {
        let mut conn = self.pool().acquire().await?;
        enqueue_event_tx(&mut conn, event).await
    }

    /// Oldest undispatched events that have not exhausted their attempts.
    pub async fn pending_events(
        &self,
        limit: u32,
        max_attempts: u32,
    ) -> Result<Vec<TriggerEvent>, DatabaseError> {
        let events = sqlx::query_as::<_, TriggerEvent>(
            "SELECT * FROM trigger_events \
             WHERE dispatched_at IS NULL AND attempts < ? \
             ORDER BY id LIMIT ?",
        )
        .bind(i64::from(max_attempts))
        .bind(i64::from(limit))
        .fetch_all(self.pool())
        .await?;

        Ok(events)
    }

    /// Mark an event as handled.
    pub async fn mark_event_dispatched(&self, id: i64) -> Result<(), DatabaseError> {
        sqlx::query(
            "UPDATE trigger_events SET dispatched_at = ?, attempts = attempts + 1 WHERE id = ?",
        )
        .bind(unix_timestamp())
        .bind(id)
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// Record a failed attempt; the event stays pending until it runs out of
    /// attempts.
    pub async fn mark_event_failed(&self, id: i64, error: &str) -> Result<(), DatabaseError> {
        sqlx::query(
            "UPDATE trigger_events SET attempts = attempts + 1, last_error = ? WHERE id = ?",
        )
        .bind(error)
        .bind(id)
        .execute(self.pool())
        .await?;

        Ok(())
    }

    pub async fn get_event(&self, id: i64) -> Result<TriggerEvent, DatabaseError> {
        sqlx::query_as::<_, TriggerEvent>("SELECT * FROM trigger_events WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("trigger event {id}")))
    }

    /// Mark everything pending as dispatched, so fixtures start from an
    /// empty outbox.
    #[cfg(test)]
    pub(crate) async fn discard_pending_events(&self) -> Result<(), DatabaseError> {
        sqlx::query("UPDATE trigger_events SET dispatched_at = ? WHERE dispatched_at IS NULL")
            .bind(unix_timestamp())
            .execute(self.pool())
            .await?;

        Ok(())
    }
}
