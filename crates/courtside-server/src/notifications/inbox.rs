//! Account-facing notification operations: the inbox and device
//! registration.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::{info, instrument};
use uuid::Uuid;

use crate::auth::{Actor, Identity};
use crate::storage::{DatabaseError, DeviceToken, Notification, Store};

#[derive(Debug, thiserror::Error)]
pub enum InboxError {
    #[error("not signed in")]
    Unauthenticated,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Missing, or owned by another account.
    #[error("not found: {0}")]
    NotFound(String),

    #[error("storage error: {0}")]
    Storage(DatabaseError),
}

impl From<DatabaseError> for InboxError {
    fn from(e: DatabaseError) -> Self {
        match e {
            DatabaseError::NotFound(what) => Self::NotFound(what),
            other => Self::Storage(other),
        }
    }
}

/// Mobile platform of a registered device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DevicePlatform {
    Android,
    Ios,
}

impl DevicePlatform {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Android => "android",
            Self::Ios => "ios",
        }
    }
}

impl fmt::Display for DevicePlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DevicePlatform {
    type Err = InboxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "android" => Ok(Self::Android),
            "ios" => Ok(Self::Ios),
            _ => Err(InboxError::InvalidArgument(
                "platform must be android or ios".into(),
            )),
        }
    }
}

/// Notifications and devices of the signed-in account.
pub struct NotificationInbox {
    store: Store,
    identity: Arc<dyn Identity>,
}

impl NotificationInbox {
    pub fn new(store: Store, identity: Arc<dyn Identity>) -> Self {
        Self { store, identity }
    }

    fn actor(&self) -> Result<Actor, InboxError> {
        self.identity
            .current_actor()
            .ok_or(InboxError::Unauthenticated)
    }

    /// Newest first.
    pub async fn list(&self, limit: i64) -> Result<Vec<Notification>, InboxError> {
        let actor = self.actor()?;
        Ok(self.store.list_notifications(&actor.id, limit).await?)
    }

    pub async fn unread_count(&self) -> Result<i64, InboxError> {
        let actor = self.actor()?;
        Ok(self.store.count_unread_notifications(&actor.id).await?)
    }

    /// Mark one of the actor's notifications read. Returns `false` if it
    /// already was; another account's notification is `NotFound`.
    #[instrument(skip(self))]
    pub async fn mark_read(&self, notification_id: &str) -> Result<bool, InboxError> {
        let actor = self.actor()?;
        Ok(self
            .store
            .mark_notification_read(notification_id, &actor.id)
            .await?)
    }

    /// Register (or move) a device token to the actor's account.
    #[instrument(skip(self, device_token))]
    pub async fn register_device(
        &self,
        device_token: &str,
        platform: DevicePlatform,
    ) -> Result<DeviceToken, InboxError> {
        let actor = self.actor()?;
        if device_token.is_empty() {
            return Err(InboxError::InvalidArgument("device_token is required".into()));
        }

        let id = Uuid::new_v4().to_string();
        self.store
            .upsert_device_token(&id, &actor.id, device_token, platform.as_str())
            .await?;
        info!(account_id = %actor.id, %platform, "Device registered");

        self.store
            .get_device_token(device_token)
            .await?
            .ok_or_else(|| InboxError::NotFound("device token".into()))
    }

    /// Remove one of the actor's device tokens. Returns `false` if the actor
    /// has no such token.
    #[instrument(skip(self, device_token))]
    pub async fn unregister_device(&self, device_token: &str) -> Result<bool, InboxError> {
        let actor = self.actor()?;
        if device_token.is_empty() {
            return Err(InboxError::InvalidArgument("device_token is required".into()));
        }
        match self.store.get_device_token(device_token).await? {
            Some(token) if token.account_id == actor.id => {
                let removed = self.store.delete_device_token(device_token).await?;
                info!(account_id = %actor.id, removed, "Device unregistered");
                Ok(removed)
            }
            _ => Ok(false),
        }
    }
}
