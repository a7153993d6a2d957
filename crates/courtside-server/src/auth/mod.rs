//! Authentication for Courtside.
//!
//! Provides JWT access tokens and the [`Identity`] seam through which the
//! like protocol learns who the current actor is.

pub mod claims;
pub mod identity;
pub mod jwt;

pub use claims::Claims;
pub use identity::{Actor, Identity, StaticIdentity, TokenIdentity};
pub use jwt::JwtManager;
