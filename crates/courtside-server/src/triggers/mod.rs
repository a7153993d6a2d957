//! Trigger runtime.
//!
//! Consumes the outbox written alongside candidature, like, offer and post
//! writes and invokes the matching notification handler. Events are marked
//! dispatched only after their handler returns, so a crash in between runs
//! the handler again (at-least-once). Handlers tolerate that.

use std::sync::Arc;
use std::time::Duration;

use courtside_core::config::TriggerConfig;
use courtside_core::record::{decode, decode_lenient};
use tokio::sync::{Notify, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::notifications::{DispatchOutcome, NotificationPipeline};
use crate::storage::{
    Candidature, CandidatureChange, CandidatureParams, DatabaseError, LikeParams, Offer,
    OfferParams, Post, PostLike, PostParams, Store, TriggerEvent, event_kind,
};

#[cfg(test)]
mod tests;

#[derive(Debug, thiserror::Error)]
pub enum TriggerError {
    #[error("unknown trigger kind: {0}")]
    UnknownKind(String),

    #[error(transparent)]
    Decode(#[from] courtside_core::Error),
}

/// Result of one polling round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoundReport {
    pub dispatched: usize,
    pub failed: usize,
}

impl RoundReport {
    pub const fn handled(&self) -> usize {
        self.dispatched + self.failed
    }
}

pub struct TriggerRuntime {
    store: Store,
    pipeline: NotificationPipeline,
    config: TriggerConfig,
    wake: Arc<Notify>,
}

impl TriggerRuntime {
    pub fn new(store: Store, pipeline: NotificationPipeline, config: TriggerConfig) -> Self {
        Self {
            store,
            pipeline,
            config,
            wake: Arc::new(Notify::new()),
        }
    }

    /// Handle for writers to wake the runtime after enqueueing an event.
    pub fn wake_handle(&self) -> Arc<Notify> {
        Arc::clone(&self.wake)
    }

    /// Handle every pending event once.
    pub async fn run_once(&self) -> Result<RoundReport, DatabaseError> {
        let events = self
            .store
            .pending_events(self.config.claim_batch, self.config.max_attempts)
            .await?;

        let mut report = RoundReport::default();
        for event in events {
            match self.dispatch(&event).await {
                Ok(outcome) => {
                    debug!(event_id = event.id, kind = %event.kind, ?outcome, "Trigger handled");
                    self.store.mark_event_dispatched(event.id).await?;
                    report.dispatched += 1;
                }
                Err(e) => {
                    warn!(
                        event_id = event.id,
                        kind = %event.kind,
                        attempt = event.attempts + 1,
                        error = %e,
                        "Trigger event rejected"
                    );
                    self.store
                        .mark_event_failed(event.id, &e.to_string())
                        .await?;
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }

    async fn dispatch(&self, event: &TriggerEvent) -> Result<DispatchOutcome, TriggerError> {
        let params_path = format!("trigger_events/{}/params", event.id);
        let payload_path = format!("trigger_events/{}/payload", event.id);

        let outcome = match event.kind.as_str() {
            event_kind::CANDIDATURE_CREATED => {
                let params: CandidatureParams = decode(&params_path, &event.params)?;
                let record: Option<Candidature> = if has_payload(&event.payload) {
                    Some(decode_lenient(&payload_path, &event.payload)?)
                } else {
                    None
                };
                self.pipeline
                    .on_candidature_created(&params, record.as_ref())
                    .await
            }
            event_kind::CANDIDATURE_UPDATED => {
                let params: CandidatureParams = decode(&params_path, &event.params)?;
                let change: CandidatureChange = decode_lenient(&payload_path, &event.payload)?;
                self.pipeline
                    .on_candidature_status_changed(&params, &change)
                    .await
            }
            event_kind::LIKE_CREATED => {
                let params: LikeParams = decode(&params_path, &event.params)?;
                let like: PostLike = decode(&payload_path, &event.payload)?;
                self.pipeline.on_like_created(&params, &like).await
            }
            event_kind::OFFER_CREATED => {
                let params: OfferParams = decode(&params_path, &event.params)?;
                let offer: Offer = decode(&payload_path, &event.payload)?;
                self.pipeline.on_offer_created(&params, &offer).await
            }
            event_kind::POST_CREATED => {
                let params: PostParams = decode(&params_path, &event.params)?;
                let post: Post = decode(&payload_path, &event.payload)?;
                self.pipeline.on_post_created(&params, &post).await
            }
            other => return Err(TriggerError::UnknownKind(other.to_string())),
        };
        Ok(outcome)
    }

    /// Poll until `shutdown` turns `true` or its sender is dropped.
    ///
    /// A round runs on every poll interval tick and whenever the wake handle
    /// is notified.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut interval =
            tokio::time::interval(Duration::from_millis(self.config.poll_interval_ms.max(1)));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            poll_interval_ms = self.config.poll_interval_ms,
            "Trigger runtime started"
        );
        loop {
            tokio::select! {
                _ = interval.tick() => {}
                () = self.wake.notified() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
            if *shutdown.borrow() {
                break;
            }

            match self.run_once().await {
                Ok(report) if report.handled() > 0 => {
                    info!(
                        dispatched = report.dispatched,
                        failed = report.failed,
                        "Trigger round complete"
                    );
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "Trigger round failed"),
            }
        }
        info!("Trigger runtime stopped");
    }
}

fn has_payload(raw: &str) -> bool {
    let raw = raw.trim();
    !raw.is_empty() && raw != "null"
}
