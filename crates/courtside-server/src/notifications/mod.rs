//! Notifications: in-app records and batched push delivery.
//!
//! - [`NotificationPipeline`] turns trigger events into notification records
//!   and multicast pushes, including pushes to the followers of a club or
//!   player
//! - [`PushSender`] abstracts the push platform; [`FcmClient`] implements it
//!   over the FCM HTTP v1 API when the `push-notifications` feature is enabled
//! - [`NotificationInbox`] serves an account's notifications and device
//!   registrations

#[cfg(feature = "push-notifications")]
pub mod fcm;
pub mod inbox;
pub mod pipeline;
pub mod push;


#[cfg(feature = "push-notifications")]
pub use fcm::FcmClient;
pub use inbox::{DevicePlatform, InboxError, NotificationInbox};
pub use pipeline::{DispatchOutcome, FanOutReport, NotificationPipeline};
pub use push::{BatchResponse, DisabledPushSender, MulticastMessage, PushSender, TokenResult};

/// Notification type tags stored on records and sent in push data.
pub mod kind {
    pub const CANDIDATURE_CREATED: &str = "candidature_created";
    pub const CANDIDATURE_STATUS: &str = "candidature_status";
    pub const LIKE: &str = "like";
    pub const FAVORITE_CLUB_OFFER: &str = "favorite_club_offer";
    pub const FAVORITE_PLAYER_POST: &str = "favorite_player_post";
}

/// Errors that can occur in the notification subsystem.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    /// Failed to read or parse the FCM service account credentials file.
    #[error("FCM credentials error: {0}")]
    Credentials(String),

    /// HTTP request to the push platform failed.
    #[error("push request error: {0}")]
    Request(String),

    /// The push platform returned a non-success status code.
    #[error("push API error (status {status}): {body}")]
    ApiError {
        /// HTTP status code returned by the platform.
        status: u16,
        /// Response body.
        body: String,
    },

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(String),
}

impl From<courtside_core::db::DatabaseError> for NotificationError {
    fn from(e: courtside_core::db::DatabaseError) -> Self {
        Self::Database(e.to_string())
    }
}
