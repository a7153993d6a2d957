//! FCM HTTP v1 API client.
//!
//! The v1 API accepts one token per request; a multicast is sent as one
//! request per token, issued concurrently, with results collected per token.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::{debug, warn};

use super::NotificationError;
use super::push::{BatchResponse, MulticastMessage, PushSender, TokenResult};
use crate::storage::Metadata;

/// FCM HTTP v1 API endpoint template.
/// The `{project_id}` placeholder is replaced with the actual project ID.
const FCM_API_URL_TEMPLATE: &str =
    "https://fcm.googleapis.com/v1/projects/{project_id}/messages:send";

/// Environment variable name for the FCM access token.
const FCM_ACCESS_TOKEN_ENV: &str = "COURTSIDE_FCM_ACCESS_TOKEN";

/// Service account credentials loaded from a Google Cloud JSON key file.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountCredentials {
    pub project_id: String,

    #[serde(default)]
    pub client_email: String,

    /// The private key in PEM format.
    #[serde(default)]
    pub private_key: String,
}

/// FCM send request.
#[derive(Debug, Serialize)]
pub struct FcmMessage {
    pub message: FcmMessageBody,
}

#[derive(Debug, Serialize)]
pub struct FcmMessageBody {
    /// Device registration token.
    pub token: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<FcmNotification>,

    #[serde(skip_serializing_if = "Metadata::is_empty")]
    pub data: Metadata,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub android: Option<FcmAndroidConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub apns: Option<FcmApnsConfig>,
}

#[derive(Debug, Serialize)]
pub struct FcmNotification {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Serialize)]
pub struct FcmAndroidConfig {
    pub priority: &'static str,
}

#[derive(Debug, Serialize)]
pub struct FcmApnsConfig {
    pub payload: ApnsPayload,
}

#[derive(Debug, Serialize)]
pub struct ApnsPayload {
    pub aps: Aps,
}

#[derive(Debug, Serialize)]
pub struct Aps {
    pub sound: String,
}

/// Client for the FCM HTTP v1 API.
#[derive(Debug)]
pub struct FcmClient {
    http: reqwest::Client,
    credentials: ServiceAccountCredentials,
    api_url: String,
    /// Bearer token read from `COURTSIDE_FCM_ACCESS_TOKEN` at construction.
    /// When `None`, falls back to `credentials.private_key`.
    access_token: Option<String>,
}

fn read_access_token_from_env() -> Option<String> {
    let token = std::env::var(FCM_ACCESS_TOKEN_ENV).ok();
    if token.is_none() {
        warn!(
            "Environment variable {FCM_ACCESS_TOKEN_ENV} is not set; \
             falling back to credentials.private_key for FCM auth"
        );
    }
    token
}

impl FcmClient {
    /// Create a client by loading service account credentials from a JSON
    /// file.
    ///
    /// # Errors
    ///
    /// Returns `NotificationError::Credentials` if the file cannot be read or
    /// parsed.
    pub fn from_credentials_file(path: &Path) -> Result<Self, NotificationError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            NotificationError::Credentials(format!(
                "Failed to read credentials file {}: {e}",
                path.display()
            ))
        })?;

        let credentials: ServiceAccountCredentials =
            serde_json::from_str(&content).map_err(|e| {
                NotificationError::Credentials(format!("Failed to parse credentials JSON: {e}"))
            })?;

        Ok(Self::from_credentials(credentials, reqwest::Client::new()))
    }

    pub fn from_credentials(
        credentials: ServiceAccountCredentials,
        http: reqwest::Client,
    ) -> Self {
        let api_url = FCM_API_URL_TEMPLATE.replace("{project_id}", &credentials.project_id);
        let access_token = read_access_token_from_env();

        debug!(
            project_id = %credentials.project_id,
            has_env_token = access_token.is_some(),
            "FCM client initialized"
        );

        Self {
            http,
            credentials,
            api_url,
            access_token,
        }
    }

    /// Installs the `ring` crypto provider (dev-dependency on `rustls`) since
    /// the workspace builds reqwest with `rustls-no-provider`.
    #[cfg(test)]
    #[allow(clippy::expect_used)]
    pub(crate) fn for_testing(credentials: ServiceAccountCredentials) -> Self {
        let api_url = FCM_API_URL_TEMPLATE.replace("{project_id}", &credentials.project_id);

        let _ = rustls::crypto::ring::default_provider().install_default();

        let http = reqwest::Client::builder()
            .build()
            .expect("failed to build test HTTP client");

        Self {
            http,
            credentials,
            api_url,
            access_token: Some("test-access-token".to_string()),
        }
    }

    /// Build the request for one token of a multicast message.
    pub fn build_message(device_token: &str, multicast: &MulticastMessage) -> FcmMessage {
        FcmMessage {
            message: FcmMessageBody {
                token: device_token.to_string(),
                notification: Some(FcmNotification {
                    title: multicast.title.clone(),
                    body: multicast.body.clone(),
                }),
                data: multicast.data.clone(),
                android: multicast
                    .android_high_priority
                    .then_some(FcmAndroidConfig { priority: "high" }),
                apns: multicast.apns_sound.as_ref().map(|sound| FcmApnsConfig {
                    payload: ApnsPayload {
                        aps: Aps {
                            sound: sound.clone(),
                        },
                    },
                }),
            },
        }
    }

    /// Send a single message.
    ///
    /// # Errors
    ///
    /// Returns `NotificationError::Request` if the HTTP request fails, or
    /// `NotificationError::ApiError` if FCM returns a non-2xx status code.
    pub async fn send(&self, message: &FcmMessage) -> Result<(), NotificationError> {
        post_message(&self.http, &self.api_url, &self.auth_header(), message).await
    }

    fn auth_header(&self) -> String {
        let token = self
            .access_token
            .as_deref()
            .unwrap_or(&self.credentials.private_key);
        format!("Bearer {token}")
    }

    pub fn project_id(&self) -> &str {
        &self.credentials.project_id
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }
}

async fn post_message(
    http: &reqwest::Client,
    api_url: &str,
    auth: &str,
    message: &FcmMessage,
) -> Result<(), NotificationError> {
    let response = http
        .post(api_url)
        .header("Authorization", auth)
        .json(message)
        .send()
        .await
        .map_err(|e| NotificationError::Request(e.to_string()))?;

    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<failed to read body>".to_string());
        Err(NotificationError::ApiError {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl PushSender for FcmClient {
    async fn send_multicast(
        &self,
        message: &MulticastMessage,
    ) -> Result<BatchResponse, NotificationError> {
        let auth = self.auth_header();
        let mut requests = JoinSet::new();
        for (index, token) in message.tokens.iter().enumerate() {
            let http = self.http.clone();
            let api_url = self.api_url.clone();
            let auth = auth.clone();
            let fcm_message = Self::build_message(token, message);
            requests.spawn(async move {
                let result = post_message(&http, &api_url, &auth, &fcm_message).await;
                (index, result)
            });
        }

        let mut responses: Vec<TokenResult> = message
            .tokens
            .iter()
            .map(|t| TokenResult::failed(t, "not sent"))
            .collect();
        while let Some(joined) = requests.join_next().await {
            let (index, result) = joined.map_err(|e| NotificationError::Request(e.to_string()))?;
            if let Some(slot) = responses.get_mut(index) {
                slot.error = result.err().map(|e| e.to_string());
            }
        }

        let response = BatchResponse { responses };
        debug!(
            success = response.success_count(),
            failure = response.failure_count(),
            "FCM multicast sent"
        );
        Ok(response)
    }
}
