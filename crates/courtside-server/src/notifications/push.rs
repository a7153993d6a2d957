//! Push platform abstraction.

use async_trait::async_trait;
use courtside_core::config::MAX_MULTICAST_TOKENS;
use tracing::debug;

use super::NotificationError;
use crate::storage::Metadata;

/// One multicast request: the same notification to up to
/// [`MAX_MULTICAST_TOKENS`] devices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MulticastMessage {
    pub tokens: Vec<String>,
    pub title: String,
    pub body: String,
    /// Deep-link payload delivered to the client app.
    pub data: Metadata,
    /// Deliver with high priority on Android.
    pub android_high_priority: bool,
    /// APNs sound name.
    pub apns_sound: Option<String>,
}

impl MulticastMessage {
    /// A message with the default delivery hints (high priority on Android,
    /// default sound on iOS).
    pub fn new(tokens: Vec<String>, title: &str, body: &str, data: Metadata) -> Self {
        Self {
            tokens,
            title: title.to_string(),
            body: body.to_string(),
            data,
            android_high_priority: true,
            apns_sound: Some("default".to_string()),
        }
    }
}

/// Delivery result for one token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenResult {
    pub token: String,
    /// Failure reason; `None` if delivered.
    pub error: Option<String>,
}

impl TokenResult {
    pub fn delivered(token: &str) -> Self {
        Self {
            token: token.to_string(),
            error: None,
        }
    }

    pub fn failed(token: &str, reason: impl Into<String>) -> Self {
        Self {
            token: token.to_string(),
            error: Some(reason.into()),
        }
    }
}

/// Per-token results of a multicast request, in token order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResponse {
    pub responses: Vec<TokenResult>,
}

impl BatchResponse {
    pub fn success_count(&self) -> usize {
        self.responses.iter().filter(|r| r.error.is_none()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.responses.len() - self.success_count()
    }

    /// Failure reasons, in token order.
    pub fn failure_reasons(&self) -> Vec<&str> {
        self.responses
            .iter()
            .filter_map(|r| r.error.as_deref())
            .collect()
    }
}

/// A push delivery service accepting multicast requests.
#[async_trait]
pub trait PushSender: Send + Sync {
    /// Send one multicast request. `Err` means the request as a whole could
    /// not be made; per-token failures are reported in the response.
    async fn send_multicast(
        &self,
        message: &MulticastMessage,
    ) -> Result<BatchResponse, NotificationError>;
}

/// Split tokens into batches no larger than `batch_size`, itself capped at
/// [`MAX_MULTICAST_TOKENS`].
pub fn partition(tokens: &[String], batch_size: usize) -> std::slice::Chunks<'_, String> {
    tokens.chunks(batch_size.clamp(1, MAX_MULTICAST_TOKENS))
}

/// Sender used when no push platform is configured. Every token is reported
/// as failed so the fan-out logs the undelivered pushes.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledPushSender;

#[async_trait]
impl PushSender for DisabledPushSender {
    async fn send_multicast(
        &self,
        message: &MulticastMessage,
    ) -> Result<BatchResponse, NotificationError> {
        debug!(tokens = message.tokens.len(), "Push delivery disabled");
        Ok(BatchResponse {
            responses: message
                .tokens
                .iter()
                .map(|t| TokenResult::failed(t, "push delivery disabled"))
                .collect(),
        })
    }
}

#[cfg(test)]
pub use testing::RecordingPushSender;
