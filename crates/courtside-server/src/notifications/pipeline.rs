//! Trigger handlers: notification records and batched push fan-out.
//!
//! Handlers never return errors. A failure ends the invocation, is logged,
//! and is reported in the [`DispatchOutcome`]. The in-app record is written
//! before any push is attempted, so push failures cannot lose it.

use std::ops::AddAssign;
use std::sync::Arc;

use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::kind;
use super::push::{MulticastMessage, PushSender, partition};
use super::NotificationError;
use crate::storage::{
    Candidature, CandidatureChange, CandidatureParams, CandidatureStatus, LikeParams, Metadata,
    Offer, OfferParams, Post, PostLike, PostParams, Store,
};
use crate::telemetry;

/// Tallies of one fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanOutReport {
    /// Registered devices of the recipient.
    pub devices: usize,
    /// Multicast requests made.
    pub batches: usize,
    pub delivered: usize,
    pub failed: usize,
}

impl AddAssign for FanOutReport {
    fn add_assign(&mut self, other: Self) {
        self.devices += other.devices;
        self.batches += other.batches;
        self.delivered += other.delivered;
        self.failed += other.failed;
    }
}

/// How one handler invocation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Nothing to do; nothing was written.
    Skipped { reason: &'static str },
    /// The record (if the handler writes one) exists and the fan-out ran.
    Notified {
        notification_id: Option<String>,
        report: FanOutReport,
    },
    /// The invocation stopped on an error, which was logged.
    Aborted { error: String },
}

/// Server-side notification handlers.
#[derive(Clone)]
pub struct NotificationPipeline {
    store: Store,
    push: Arc<dyn PushSender>,
    batch_size: usize,
}

impl NotificationPipeline {
    pub fn new(store: Store, push: Arc<dyn PushSender>, batch_size: usize) -> Self {
        Self {
            store,
            push,
            batch_size,
        }
    }

    /// A candidature was created: notify the owning club.
    ///
    /// The club is taken from the record, falling back to the path
    /// parameter. Without either the invocation is a logged no-op.
    #[instrument(skip_all, fields(candidature_id = %params.candidature_id))]
    pub async fn on_candidature_created(
        &self,
        params: &CandidatureParams,
        record: Option<&Candidature>,
    ) -> DispatchOutcome {
        let Some(record) = record else {
            warn!("Candidature trigger without record data");
            return DispatchOutcome::Skipped {
                reason: "missing record",
            };
        };
        let club_id = non_empty(record.club_id.as_deref())
            .or_else(|| non_empty(params.club_id.as_deref()));
        let Some(club_id) = club_id else {
            warn!("Candidature has no club reference, skipping");
            return DispatchOutcome::Skipped {
                reason: "no target club",
            };
        };

        let applicant = non_empty(Some(record.applicant_name.as_str())).unwrap_or("A player");
        let offer_title = non_empty(Some(record.offer_title.as_str())).unwrap_or("your offer");
        let offer_id = non_empty(Some(record.offer_id.as_str())).unwrap_or(&params.offer_id);
        let title = "New candidature";
        let body = format!("{applicant} applied to {offer_title}.");

        let metadata = Metadata::from([
            ("offerId".to_string(), offer_id.to_string()),
            ("candidatureId".to_string(), params.candidature_id.clone()),
            ("applicantId".to_string(), record.applicant_id.clone()),
            ("applicantName".to_string(), record.applicant_name.clone()),
            ("message".to_string(), record.message.clone()),
        ]);
        let data = Metadata::from([
            ("type".to_string(), kind::CANDIDATURE_CREATED.to_string()),
            ("offerId".to_string(), offer_id.to_string()),
            ("candidatureId".to_string(), params.candidature_id.clone()),
        ]);

        self.notify(club_id, kind::CANDIDATURE_CREATED, title, &body, &metadata, data)
            .await
    }

    /// A candidature changed: tell the applicant when it was accepted or
    /// rejected.
    #[instrument(skip_all, fields(candidature_id = %params.candidature_id))]
    pub async fn on_candidature_status_changed(
        &self,
        params: &CandidatureParams,
        change: &CandidatureChange,
    ) -> DispatchOutcome {
        let after = &change.after;
        if after.status == change.before {
            return DispatchOutcome::Skipped {
                reason: "status unchanged",
            };
        }
        let (title, body) = match after.status {
            CandidatureStatus::Accepted => (
                "Candidature accepted",
                "Good news, your candidature was accepted.",
            ),
            CandidatureStatus::Rejected => {
                ("Candidature rejected", "Your candidature was rejected.")
            }
            CandidatureStatus::Pending => {
                return DispatchOutcome::Skipped {
                    reason: "status back to pending",
                };
            }
        };
        let Some(applicant_id) = non_empty(Some(after.applicant_id.as_str())) else {
            warn!("Candidature has no applicant, skipping");
            return DispatchOutcome::Skipped {
                reason: "no applicant",
            };
        };

        let metadata = Metadata::from([
            ("offerId".to_string(), params.offer_id.clone()),
            ("candidatureId".to_string(), params.candidature_id.clone()),
            ("status".to_string(), after.status.to_string()),
        ]);
        let mut data = metadata.clone();
        data.insert("type".to_string(), kind::CANDIDATURE_STATUS.to_string());

        self.notify(applicant_id, kind::CANDIDATURE_STATUS, title, body, &metadata, data)
            .await
    }

    /// A like was created: push to the post owner. Self-likes are silent and
    /// no in-app record is written.
    #[instrument(skip_all, fields(post_id = %params.post_id))]
    pub async fn on_like_created(&self, params: &LikeParams, like: &PostLike) -> DispatchOutcome {
        let Some(owner_id) = non_empty(Some(like.post_owner_id.as_str())) else {
            return DispatchOutcome::Skipped {
                reason: "no post owner",
            };
        };
        let liker_id = non_empty(Some(like.liker_id.as_str())).unwrap_or(&params.liker_id);
        if liker_id == owner_id {
            return DispatchOutcome::Skipped { reason: "self like" };
        }

        let data = Metadata::from([
            ("type".to_string(), kind::LIKE.to_string()),
            ("postId".to_string(), params.post_id.clone()),
        ]);
        match self
            .fan_out(owner_id, "New like", "Someone liked your video.", data)
            .await
        {
            Ok(report) => DispatchOutcome::Notified {
                notification_id: None,
                report,
            },
            Err(e) => aborted(&e),
        }
    }

    /// An offer was published: push to every player who favorited the club.
    /// No in-app record is written.
    #[instrument(skip_all, fields(offer_id = %params.offer_id))]
    pub async fn on_offer_created(&self, params: &OfferParams, offer: &Offer) -> DispatchOutcome {
        let club_id = non_empty(Some(offer.club_id.as_str())).unwrap_or(&params.club_id);
        let followers = match self.store.club_followers(club_id).await {
            Ok(followers) => followers,
            Err(e) => return aborted(&e.into()),
        };

        let offer_title = non_empty(Some(offer.title.as_str())).unwrap_or("a new offer");
        let body = format!("A favorite club published an offer: {offer_title}.");
        let data = Metadata::from([
            ("type".to_string(), kind::FAVORITE_CLUB_OFFER.to_string()),
            ("offerId".to_string(), params.offer_id.clone()),
            ("clubId".to_string(), club_id.to_string()),
        ]);
        self.fan_out_to_followers(&followers, "New offer", &body, &data).await
    }

    /// A post was published: push to every club that favorited its owner.
    /// No in-app record is written.
    #[instrument(skip_all, fields(post_id = %params.post_id))]
    pub async fn on_post_created(&self, params: &PostParams, post: &Post) -> DispatchOutcome {
        let Some(owner_id) = non_empty(Some(post.owner_id.as_str())) else {
            return DispatchOutcome::Skipped {
                reason: "no post owner",
            };
        };
        let followers = match self.store.player_followers(owner_id).await {
            Ok(followers) => followers,
            Err(e) => return aborted(&e.into()),
        };

        let data = Metadata::from([
            ("type".to_string(), kind::FAVORITE_PLAYER_POST.to_string()),
            ("postId".to_string(), params.post_id.clone()),
        ]);
        self.fan_out_to_followers(
            &followers,
            "New post",
            "A favorite player published a new post.",
            &data,
        )
        .await
    }

    async fn fan_out_to_followers(
        &self,
        followers: &[String],
        title: &str,
        body: &str,
        data: &Metadata,
    ) -> DispatchOutcome {
        if followers.is_empty() {
            return DispatchOutcome::Skipped {
                reason: "no followers",
            };
        }

        let mut report = FanOutReport::default();
        for follower in followers {
            match self.fan_out(follower, title, body, data.clone()).await {
                Ok(one) => report += one,
                Err(e) => return aborted(&e),
            }
        }
        info!(followers = followers.len(), "Follower fan-out complete");
        DispatchOutcome::Notified {
            notification_id: None,
            report,
        }
    }

    async fn notify(
        &self,
        account_id: &str,
        kind: &str,
        title: &str,
        body: &str,
        metadata: &Metadata,
        data: Metadata,
    ) -> DispatchOutcome {
        let id = Uuid::new_v4().to_string();
        if let Err(e) = self
            .store
            .insert_notification(&id, account_id, kind, title, body, metadata)
            .await
        {
            return aborted(&e.into());
        }
        telemetry::notification_written(kind);
        info!(notification_id = %id, account_id, kind, "Notification written");

        match self.fan_out(account_id, title, body, data).await {
            Ok(report) => DispatchOutcome::Notified {
                notification_id: Some(id),
                report,
            },
            Err(e) => aborted(&e),
        }
    }

    /// Push to every registered device of `account_id`, in batches.
    ///
    /// Per-token failures and failed requests are logged and counted; the
    /// remaining batches are still sent. Only reading the device tokens can
    /// fail the fan-out.
    pub async fn fan_out(
        &self,
        account_id: &str,
        title: &str,
        body: &str,
        data: Metadata,
    ) -> Result<FanOutReport, NotificationError> {
        let tokens: Vec<String> = self
            .store
            .get_device_tokens_for_account(account_id)
            .await?
            .into_iter()
            .map(|t| t.device_token)
            .collect();

        let mut report = FanOutReport {
            devices: tokens.len(),
            ..FanOutReport::default()
        };
        if tokens.is_empty() {
            info!(account_id, "No registered devices, push skipped");
            return Ok(report);
        }

        for batch in partition(&tokens, self.batch_size) {
            let message = MulticastMessage::new(batch.to_vec(), title, body, data.clone());
            report.batches += 1;
            match self.push.send_multicast(&message).await {
                Ok(response) => {
                    let failed = response.failure_count();
                    report.delivered += response.success_count();
                    report.failed += failed;
                    if failed > 0 {
                        warn!(
                            account_id,
                            failed,
                            reasons = ?response.failure_reasons(),
                            "Push batch partially failed"
                        );
                    }
                }
                Err(e) => {
                    report.failed += batch.len();
                    warn!(account_id, tokens = batch.len(), error = %e, "Push batch failed");
                }
            }
        }

        telemetry::push_delivered(report.delivered, report.failed);
        info!(
            account_id,
            batches = report.batches,
            delivered = report.delivered,
            failed = report.failed,
            "Push fan-out complete"
        );
        Ok(report)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn aborted(e: &NotificationError) -> DispatchOutcome {
    error!(error = %e, "Notification handler failed");
    DispatchOutcome::Aborted {
        error: e.to_string(),
    }
}
