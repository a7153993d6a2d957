//! Courtside Server Library
//!
//! Backend for the Courtside video feed and recruiting board:
//! - SQLite storage for accounts, posts, likes, candidatures, and the trigger outbox
//! - Transactional like toggling with conflict retries
//! - Change feed and live watches for like counts and membership
//! - Optimistic feed controller with realtime reconciliation
//! - Favorites between players and clubs
//! - Notification records and batched push fan-out
//! - Trigger runtime dispatching outbox events to notification handlers

pub mod auth;
pub mod candidatures;
pub mod changes;
pub mod favorites;
pub mod feed;
pub mod likes;
pub mod notifications;
pub mod storage;
pub mod telemetry;
pub mod triggers;
