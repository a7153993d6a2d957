//! Current-actor identity.
//!
//! The like protocol asks an [`Identity`] for the signed-in actor at call
//! time. `None` means nobody is signed in and the call fails before any
//! write.

use std::sync::{Arc, RwLock};

use tracing::debug;

use super::jwt::JwtManager;
use crate::storage::AccountKind;

/// An authenticated account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    pub kind: AccountKind,
}

impl Actor {
    pub fn new(id: impl Into<String>, kind: AccountKind) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }
}

/// Synchronous source of the current actor.
pub trait Identity: Send + Sync {
    fn current_actor(&self) -> Option<Actor>;
}

/// Identity held in memory; sign-in state can change at runtime.
#[derive(Debug, Default)]
pub struct StaticIdentity {
    actor: RwLock<Option<Actor>>,
}

impl StaticIdentity {
    pub fn signed_in(actor: Actor) -> Self {
        Self {
            actor: RwLock::new(Some(actor)),
        }
    }

    pub fn signed_out() -> Self {
        Self::default()
    }

    pub fn sign_in(&self, actor: Actor) {
        if let Ok(mut slot) = self.actor.write() {
            *slot = Some(actor);
        }
    }

    pub fn sign_out(&self) {
        if let Ok(mut slot) = self.actor.write() {
            *slot = None;
        }
    }
}

impl Identity for StaticIdentity {
    fn current_actor(&self) -> Option<Actor> {
        self.actor.read().ok().and_then(|slot| slot.clone())
    }
}

/// Identity derived from a bearer access token, validated on every call so
/// an expired token stops authenticating without further bookkeeping.
pub struct TokenIdentity {
    jwt: Arc<JwtManager>,
    token: RwLock<Option<String>>,
}

impl TokenIdentity {
    pub fn new(jwt: Arc<JwtManager>) -> Self {
        Self {
            jwt,
            token: RwLock::new(None),
        }
    }

    pub fn set_token(&self, token: Option<String>) {
        if let Ok(mut slot) = self.token.write() {
            *slot = token;
        }
    }
}

impl Identity for TokenIdentity {
    fn current_actor(&self) -> Option<Actor> {
        let token = self.token.read().ok()?.clone()?;
        match self.jwt.validate(&token) {
            Ok(claims) if claims.is_access() => Some(Actor::new(claims.sub, claims.kind)),
            Ok(_) => {
                debug!("Token is not an access token");
                None
            }
            Err(e) => {
                debug!(error = %e, "Token rejected");
                None
            }
        }
    }
}
