//! Data models for the Courtside store.
//!
//! Serialized field names follow the documents the mobile clients read
//! (`likeCount`, `createdAt`, `read`, `type`, `status`).

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::types::Json;

/// Whether an account is a player or a club. Selects the reverse-index
/// namespace for liked posts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum AccountKind {
    Player,
    Club,
}

impl AccountKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Player => "player",
            Self::Club => "club",
        }
    }
}

impl fmt::Display for AccountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "player" => Ok(Self::Player),
            "club" => Ok(Self::Club),
            other => Err(format!("unknown account kind: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    pub kind: AccountKind,
    pub display_name: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub owner_id: String,
    pub url: String,
    pub description: Option<String>,
    pub like_count: i64,
    pub created_at: i64,
}

/// Membership record: its existence means `liker_id` likes `post_id`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PostLike {
    pub post_id: String,
    pub liker_id: String,
    pub post_owner_id: String,
    pub created_at: i64,
}

/// Reverse-index record under the liker's namespace.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LikedPost {
    pub account_id: String,
    pub post_id: String,
    pub namespace: AccountKind,
    pub owner_id: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Offer {
    pub id: String,
    pub club_id: String,
    pub title: String,
    pub location: String,
    pub created_at: i64,
}

/// A player following a club; the player hears about the club's offers.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteClub {
    pub player_id: String,
    pub club_id: String,
    pub created_at: i64,
}

/// A club following a player; the club hears about the player's posts.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FavoritePlayer {
    pub club_id: String,
    pub player_id: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum CandidatureStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
}

impl CandidatureStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for CandidatureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Candidature as stored. `club_id` may be missing on records written by
/// older clients; the trigger then falls back to its path parameter.
#[derive(Debug, Clone, Default, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Candidature {
    pub id: String,
    pub offer_id: String,
    #[serde(default)]
    pub club_id: Option<String>,
    pub applicant_id: String,
    #[serde(default)]
    pub applicant_name: String,
    #[serde(default)]
    pub offer_title: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: CandidatureStatus,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

/// String key/value metadata, also used verbatim as the push data payload.
pub type Metadata = BTreeMap<String, String>;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub account_id: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub kind: String,
    pub title: String,
    pub body: String,
    pub metadata: Json<Metadata>,
    pub read: bool,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DeviceToken {
    pub id: String,
    pub account_id: String,
    pub device_token: String,
    pub platform: String,
    pub created_at: i64,
}

/// Outbox row consumed by the trigger runtime.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TriggerEvent {
    pub id: i64,
    pub kind: String,
    pub params: String,
    pub payload: String,
    pub attempts: i64,
    pub last_error: Option<String>,
    pub created_at: i64,
    pub dispatched_at: Option<i64>,
}

/// Outbox event kinds.
pub mod event_kind {
    pub const CANDIDATURE_CREATED: &str = "candidature.created";
    pub const CANDIDATURE_UPDATED: &str = "candidature.updated";
    pub const LIKE_CREATED: &str = "like.created";
    pub const OFFER_CREATED: &str = "offer.created";
    pub const POST_CREATED: &str = "post.created";
}

/// Path parameters of a candidature document
/// (`clubs/{clubId}/offers/{offerId}/candidatures/{candidatureId}`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidatureParams {
    #[serde(default)]
    pub club_id: Option<String>,
    pub offer_id: String,
    pub candidature_id: String,
}

/// Before/after snapshot carried by a candidature update event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidatureChange {
    pub before: CandidatureStatus,
    pub after: Candidature,
}

/// Path parameters of a like membership document
/// (`posts/{postId}/likes/{likerId}`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeParams {
    pub post_id: String,
    pub liker_id: String,
}

/// Path parameters of an offer document (`clubs/{clubId}/offers/{offerId}`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferParams {
    pub club_id: String,
    pub offer_id: String,
}

/// Path parameters of a post document (`posts/{postId}`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostParams {
    pub post_id: String,
}
