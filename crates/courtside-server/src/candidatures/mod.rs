//! Candidature submission and review.
//!
//! Both writes append their trigger event in the same transaction; the
//! runtime is woken afterwards so notifications go out without waiting for
//! the next poll.

use std::sync::Arc;

use tokio::sync::Notify;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::auth::{Actor, Identity};
use crate::storage::{
    AccountKind, Candidature, CandidatureStatus, DatabaseError, NewCandidature, Store,
};

#[derive(Debug, thiserror::Error)]
pub enum CandidatureError {
    #[error("not signed in")]
    Unauthenticated,

    /// The actor's account kind may not perform the operation.
    #[error("{0} accounts cannot do this")]
    Forbidden(AccountKind),

    /// Offer or candidature missing, or owned by another club.
    #[error("not found: {0}")]
    NotFound(String),

    #[error("storage error: {0}")]
    Storage(DatabaseError),
}

impl From<DatabaseError> for CandidatureError {
    fn from(e: DatabaseError) -> Self {
        match e {
            DatabaseError::NotFound(what) => Self::NotFound(what),
            other => Self::Storage(other),
        }
    }
}

pub struct CandidatureService {
    store: Store,
    identity: Arc<dyn Identity>,
    wake: Arc<Notify>,
}

impl CandidatureService {
    /// `wake` is the trigger runtime's wake-up handle.
    pub fn new(store: Store, identity: Arc<dyn Identity>, wake: Arc<Notify>) -> Self {
        Self {
            store,
            identity,
            wake,
        }
    }

    fn actor(&self, kind: AccountKind) -> Result<Actor, CandidatureError> {
        let actor = self
            .identity
            .current_actor()
            .ok_or(CandidatureError::Unauthenticated)?;
        if actor.kind == kind {
            Ok(actor)
        } else {
            Err(CandidatureError::Forbidden(actor.kind))
        }
    }

    /// Apply to an offer as the signed-in player.
    #[instrument(skip(self, message))]
    pub async fn submit(
        &self,
        offer_id: &str,
        message: &str,
    ) -> Result<Candidature, CandidatureError> {
        let actor = self.actor(AccountKind::Player)?;
        let id = Uuid::new_v4().to_string();

        let candidature = self
            .store
            .create_candidature(&NewCandidature {
                id: &id,
                offer_id,
                applicant_id: &actor.id,
                message,
            })
            .await?;
        self.wake.notify_one();

        info!(
            candidature_id = %candidature.id,
            applicant_id = %actor.id,
            "Candidature submitted"
        );
        Ok(candidature)
    }

    /// Change the status of a candidature to one of the signed-in club's
    /// offers.
    #[instrument(skip(self))]
    pub async fn set_status(
        &self,
        candidature_id: &str,
        status: CandidatureStatus,
    ) -> Result<Candidature, CandidatureError> {
        let actor = self.actor(AccountKind::Club)?;
        let candidature = self
            .store
            .update_candidature_status(candidature_id, &actor.id, status)
            .await?;
        self.wake.notify_one();

        info!(candidature_id, %status, "Candidature status set");
        Ok(candidature)
    }

    /// Candidatures to the signed-in club's offers, or the signed-in player's
    /// own candidatures.
    pub async fn list_mine(&self) -> Result<Vec<Candidature>, CandidatureError> {
        let actor = self
            .identity
            .current_actor()
            .ok_or(CandidatureError::Unauthenticated)?;
        let list = match actor.kind {
            AccountKind::Club => self.store.list_candidatures_for_club(&actor.id).await?,
            AccountKind::Player => {
                self.store
                    .list_candidatures_for_applicant(&actor.id)
                    .await?
            }
        };
        Ok(list)
    }
}
