//! Candidature queries.
//!
//! Creating a candidature or changing its status appends the matching trigger
//! event in the same transaction.

use courtside_core::db::unix_timestamp;
use serde::Serialize;

use super::db::{DatabaseError, Store};
use super::models::{
    Candidature, CandidatureChange, CandidatureParams, CandidatureStatus, event_kind,
};
use super::queries_triggers::{NewTriggerEvent, enqueue_event_tx};

/// Parameters for submitting a candidature against an offer.
pub struct NewCandidature<'a> {
    pub id: &'a str,
    pub offer_id: &'a str,
    pub applicant_id: &'a str,
    pub message: &'a str,
}

pub(super) fn to_json<T: Serialize>(value: &T) -> Result<String, DatabaseError> {
    serde_json::to_string(value).map_err(|e| DatabaseError::Query(e.to_string()))
}

impl Store {
    /// Insert a pending candidature and enqueue its creation trigger.
    ///
    /// The club id and offer title are copied from the offer; the applicant's
    /// display name from their account when it exists.
    pub async fn create_candidature(
        &self,
        new: &NewCandidature<'_>,
    ) -> Result<Candidature, DatabaseError> {
        let mut tx = self.pool().begin().await?;

        let offer: Option<(String, String)> =
            sqlx::query_as("SELECT club_id, title FROM offers WHERE id = ?")
                .bind(new.offer_id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some((club_id, offer_title)) = offer else {
            return Err(DatabaseError::NotFound(format!("offer {}", new.offer_id)));
        };

        let applicant: Option<(String,)> =
            sqlx::query_as("SELECT display_name FROM accounts WHERE id = ?")
                .bind(new.applicant_id)
                .fetch_optional(&mut *tx)
                .await?;
        let applicant_name = applicant.map(|(name,)| name).unwrap_or_default();

        let now = unix_timestamp();
        let candidature = Candidature {
            id: new.id.to_string(),
            offer_id: new.offer_id.to_string(),
            club_id: Some(club_id.clone()),
            applicant_id: new.applicant_id.to_string(),
            applicant_name,
            offer_title,
            message: new.message.to_string(),
            status: CandidatureStatus::Pending,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO candidatures (id, offer_id, club_id, applicant_id, applicant_name, \
             offer_title, message, status, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&candidature.id)
        .bind(&candidature.offer_id)
        .bind(&candidature.club_id)
        .bind(&candidature.applicant_id)
        .bind(&candidature.applicant_name)
        .bind(&candidature.offer_title)
        .bind(&candidature.message)
        .bind(candidature.status)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let params = CandidatureParams {
            club_id: Some(club_id),
            offer_id: candidature.offer_id.clone(),
            candidature_id: candidature.id.clone(),
        };
        enqueue_event_tx(
            &mut *tx,
            &NewTriggerEvent {
                kind: event_kind::CANDIDATURE_CREATED,
                params: &to_json(&params)?,
                payload: &to_json(&candidature)?,
            },
        )
        .await?;

        tx.commit().await?;

        Ok(candidature)
    }

    /// Change the status of a candidature owned by `club_id`.
    ///
    /// Returns `NotFound` when the candidature does not exist or belongs to
    /// another club. Setting the current status again writes nothing.
    pub async fn update_candidature_status(
        &self,
        id: &str,
        club_id: &str,
        status: CandidatureStatus,
    ) -> Result<Candidature, DatabaseError> {
        let mut tx = self.pool().begin().await?;

        let current = sqlx::query_as::<_, Candidature>(
            "SELECT * FROM candidatures WHERE id = ? AND club_id = ?",
        )
        .bind(id)
        .bind(club_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("candidature {id}")))?;

        if current.status == status {
            return Ok(current);
        }

        let now = unix_timestamp();
        sqlx::query("UPDATE candidatures SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status)
            .bind(now)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let before = current.status;
        let after = Candidature {
            status,
            updated_at: now,
            ..current
        };

        let params = CandidatureParams {
            club_id: after.club_id.clone(),
            offer_id: after.offer_id.clone(),
            candidature_id: after.id.clone(),
        };
        let change = CandidatureChange {
            before,
            after: after.clone(),
        };
        enqueue_event_tx(
            &mut *tx,
            &NewTriggerEvent {
                kind: event_kind::CANDIDATURE_UPDATED,
                params: &to_json(&params)?,
                payload: &to_json(&change)?,
            },
        )
        .await?;

        tx.commit().await?;

        Ok(after)
    }

    /// All candidatures addressed to a club across its offers, newest first.
    pub async fn list_candidatures_for_club(
        &self,
        club_id: &str,
    ) -> Result<Vec<Candidature>, DatabaseError> {
        let rows = sqlx::query_as::<_, Candidature>(
            "SELECT * FROM candidatures WHERE club_id = ? ORDER BY created_at DESC, id",
        )
        .bind(club_id)
        .fetch_all(self.pool())
        .await?;

        Ok(rows)
    }

    /// Candidatures submitted by an applicant, newest first.
    pub async fn list_candidatures_for_applicant(
        &self,
        applicant_id: &str,
    ) -> Result<Vec<Candidature>, DatabaseError> {
        let rows = sqlx::query_as::<_, Candidature>(
            "SELECT * FROM candidatures WHERE applicant_id = ? ORDER BY created_at DESC, id",
        )
        .bind(applicant_id)
        .fetch_all(self.pool())
        .await?;

        Ok(rows)
    }
}
