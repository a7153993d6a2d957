//! SQLite document store for Courtside.
//!
//! Provides persistence for accounts, posts, likes and their reverse index,
//! offers, candidatures, favorites, notifications, device tokens and the
//! trigger outbox.

mod db;
mod models;
mod queries;
mod queries_candidatures;
mod queries_favorites;
mod queries_likes;
mod queries_notifications;
mod queries_triggers;

#[cfg(test)]
mod tests;

pub use db::{DatabaseError, Store};
pub use models::*;
pub use queries_candidatures::NewCandidature;
pub use queries_likes::ToggleOutcome;
pub use queries_triggers::NewTriggerEvent;
