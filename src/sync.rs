//! Persistence synchronizer
//!
//! A long-lived task that mirrors the in-memory cart to the per-user remote
//! snapshot: hydrate on identity change, write back after a quiet period.
//! Only the most recent pending write in a debounce window executes; a new
//! change or an identity change supersedes it. Remote failures degrade to
//! local state (fail-open) and are logged, never raised.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{watch, Mutex};
use tokio::time;
use tracing::{debug, warn};

use crate::config::SyncConfig;
use crate::domain::aggregates::cart::{Cart, CartSnapshot};
use crate::domain::value_objects::UserId;
use crate::store::SnapshotStore;

/// Cart state shared between the session handle and the synchronizer.
#[derive(Debug)]
pub(crate) struct SharedCart {
    pub(crate) cart: Cart,
    /// A remote load is in flight for the current identity.
    pub(crate) loading: bool,
    /// The initial load for the current identity has completed; saves are
    /// gated on this so hydration never gets overwritten by a transient
    /// empty cart.
    pub(crate) hydrated: bool,
}

impl SharedCart {
    pub(crate) fn new(currency: &str) -> Self {
        Self {
            cart: Cart::new(currency),
            loading: false,
            hydrated: false,
        }
    }
}

pub struct CartSyncer<S> {
    shared: Arc<Mutex<SharedCart>>,
    store: Arc<S>,
    identity: watch::Receiver<Option<UserId>>,
    dirty: watch::Receiver<u64>,
    config: SyncConfig,
}

impl<S: SnapshotStore> CartSyncer<S> {
    pub(crate) fn new(
        shared: Arc<Mutex<SharedCart>>,
        store: Arc<S>,
        identity: watch::Receiver<Option<UserId>>,
        dirty: watch::Receiver<u64>,
        config: SyncConfig,
    ) -> Self {
        Self {
            shared,
            store,
            identity,
            dirty,
            config,
        }
    }

    /// Event loop. Exits when the session drops its dirty channel (after
    /// flushing any pending write) or when the identity provider goes away.
    pub async fn run(self) {
        let CartSyncer {
            shared,
            store,
            mut identity,
            mut dirty,
            config,
        } = self;

        let initial = identity.borrow_and_update().clone();
        hydrate(&shared, store.as_ref(), initial).await;

        loop {
            tokio::select! {
                changed = identity.changed() => {
                    if changed.is_err() {
                        warn!("identity channel closed; cart sync stopping");
                        break;
                    }
                    let user = identity.borrow_and_update().clone();
                    hydrate(&shared, store.as_ref(), user).await;
                }
                changed = dirty.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    if debounce_and_save(&shared, store.as_ref(), &mut identity, &mut dirty, &config).await {
                        break;
                    }
                }
            }
        }
        debug!("cart sync stopped");
    }
}

/// Debounce window after a local change. Returns `true` when the dirty
/// channel has closed and the loop should stop.
async fn debounce_and_save<S: SnapshotStore>(
    shared: &Mutex<SharedCart>,
    store: &S,
    identity: &mut watch::Receiver<Option<UserId>>,
    dirty: &mut watch::Receiver<u64>,
    config: &SyncConfig,
) -> bool {
    loop {
        tokio::select! {
            () = time::sleep(config.debounce) => {
                save_snapshot(shared, store, identity, config).await;
                return false;
            }
            changed = dirty.changed() => {
                if changed.is_err() {
                    // Session is gone; flush the pending write before exit.
                    save_snapshot(shared, store, identity, config).await;
                    return true;
                }
                // Another change within the quiet period supersedes the
                // pending write; the timer restarts.
            }
            changed = identity.changed() => {
                if changed.is_err() {
                    warn!("identity channel closed; dropping pending cart write");
                    return false;
                }
                // Identity switched under a pending write: the write was
                // for the old user, so reload instead of saving.
                let user = identity.borrow_and_update().clone();
                hydrate(shared, store, user).await;
                return false;
            }
        }
    }
}

/// Load the remote snapshot for `user` and replace local state with it.
/// Signed-out resets locally without touching the store. A failed load
/// degrades to an empty cart.
async fn hydrate<S: SnapshotStore>(shared: &Mutex<SharedCart>, store: &S, user: Option<UserId>) {
    let Some(user) = user else {
        let mut shared = shared.lock().await;
        shared.cart.set(vec![], None);
        shared.hydrated = false;
        shared.loading = false;
        debug!("signed out; cart reset locally");
        return;
    };

    shared.lock().await.loading = true;
    let snapshot = match store.load(&user).await {
        Ok(Some(snapshot)) => snapshot,
        Ok(None) => CartSnapshot::empty(),
        Err(err) => {
            warn!(user = %user, error = %err, "cart load failed; starting from an empty cart");
            CartSnapshot::empty()
        }
    };

    let mut shared = shared.lock().await;
    shared.cart.set(snapshot.items, snapshot.coupon);
    shared.hydrated = true;
    shared.loading = false;
    debug!(user = %user, items = shared.cart.item_count(), "cart hydrated");
}

/// Replace the remote snapshot with current local state. Skipped while
/// signed out or before hydration. Failures are logged and local state kept.
async fn save_snapshot<S: SnapshotStore>(
    shared: &Mutex<SharedCart>,
    store: &S,
    identity: &watch::Receiver<Option<UserId>>,
    config: &SyncConfig,
) {
    let Some(user) = identity.borrow().clone() else {
        return;
    };
    let snapshot = {
        let shared = shared.lock().await;
        if !shared.hydrated {
            debug!(user = %user, "skipping save before initial load");
            return;
        }
        shared.cart.to_snapshot(Utc::now())
    };

    if let Err(err) = store.save(&user, &snapshot).await {
        warn!(user = %user, error = %err, "cart save failed; keeping local state");
        return;
    }
    debug!(user = %user, items = snapshot.items.len(), "cart snapshot saved");

    if config.verify_writes {
        match store.load(&user).await {
            Ok(Some(stored)) if stored.items.len() == snapshot.items.len() => {}
            Ok(_) => warn!(user = %user, "cart save verification mismatch"),
            Err(err) => warn!(user = %user, error = %err, "cart save verification failed"),
        }
    }
}
