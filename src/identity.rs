//! Identity provider port
//!
//! The synchronizer reacts to sign-in/sign-out through a watch channel of
//! the current user, injected instead of any ambient auth singleton.

use tokio::sync::watch;

use crate::domain::value_objects::UserId;

pub trait IdentityProvider {
    /// Subscribe to the current identity. The receiver yields `None` while
    /// signed out.
    fn subscribe(&self) -> watch::Receiver<Option<UserId>>;
}

/// Watch-backed identity source. Wire an auth callback to
/// [`sign_in`](IdentityChannel::sign_in)/[`sign_out`](IdentityChannel::sign_out);
/// keep it alive for as long as any session built from it runs.
#[derive(Debug)]
pub struct IdentityChannel {
    tx: watch::Sender<Option<UserId>>,
}

impl IdentityChannel {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    pub fn signed_in(user: UserId) -> Self {
        let (tx, _rx) = watch::channel(Some(user));
        Self { tx }
    }

    pub fn sign_in(&self, user: UserId) {
        self.tx.send_replace(Some(user));
    }

    pub fn sign_out(&self) {
        self.tx.send_replace(None);
    }

    pub fn current(&self) -> Option<UserId> {
        self.tx.borrow().clone()
    }
}

impl Default for IdentityChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityProvider for IdentityChannel {
    fn subscribe(&self) -> watch::Receiver<Option<UserId>> {
        self.tx.subscribe()
    }
}
