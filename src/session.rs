//! Cart session
//!
//! The handle the UI layer holds for the lifetime of the app: every cart
//! mutation, coupon application and reactive read goes through here. A
//! background synchronizer task keeps the remote snapshot in step.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::SyncConfig;
use crate::domain::aggregates::cart::{CartAction, CartItem};
use crate::domain::aggregates::coupon::{Coupon, CouponError};
use crate::domain::events::CartEvent;
use crate::domain::value_objects::{CouponCode, Money, ProductId, UserId};
use crate::identity::IdentityProvider;
use crate::store::{CouponDirectory, SnapshotStore};
use crate::sync::{CartSyncer, SharedCart};
use crate::{CartError, Result};

pub struct CartSession<S, C> {
    shared: Arc<Mutex<SharedCart>>,
    store: Arc<S>,
    coupons: Arc<C>,
    dirty: watch::Sender<u64>,
    identity: watch::Receiver<Option<UserId>>,
    sync_task: JoinHandle<()>,
}

impl<S, C> CartSession<S, C>
where
    S: SnapshotStore,
    C: CouponDirectory,
{
    /// Build a session and spawn its synchronizer. The identity provider
    /// must outlive the session; if its channel closes the synchronizer
    /// logs a warning and stops, leaving local state serviceable.
    pub fn start(
        store: Arc<S>,
        coupons: Arc<C>,
        identity: &dyn IdentityProvider,
        config: SyncConfig,
    ) -> Self {
        let shared = Arc::new(Mutex::new(SharedCart::new(&config.currency)));
        let (dirty, dirty_rx) = watch::channel(0u64);
        let identity_rx = identity.subscribe();
        let syncer = CartSyncer::new(
            Arc::clone(&shared),
            Arc::clone(&store),
            identity_rx.clone(),
            dirty_rx,
            config,
        );
        let sync_task = tokio::spawn(syncer.run());
        Self {
            shared,
            store,
            coupons,
            dirty,
            identity: identity_rx,
            sync_task,
        }
    }

    /// Add `item` to the cart; `item.quantity` is the requested amount.
    pub async fn add_to_cart(&self, item: CartItem) {
        self.dispatch(CartAction::AddItem { item }).await;
    }

    pub async fn remove_from_cart(&self, product_id: &ProductId) {
        self.dispatch(CartAction::RemoveItem {
            product_id: product_id.clone(),
        })
        .await;
    }

    pub async fn update_quantity(&self, product_id: &ProductId, quantity: u32) {
        self.dispatch(CartAction::UpdateQuantity {
            product_id: product_id.clone(),
            quantity,
        })
        .await;
    }

    /// Empty the cart and drop the coupon. The remote snapshot follows via
    /// the regular debounced save.
    pub async fn clear_cart(&self) {
        self.dispatch(CartAction::Clear).await;
    }

    /// Resolve `code` against the coupon directory and apply it. Lookup and
    /// validation failures leave the currently applied coupon (if any)
    /// untouched.
    pub async fn apply_coupon(&self, code: &str) -> Result<Coupon> {
        let code = CouponCode::new(code)?;
        let coupon = self
            .coupons
            .find_by_code(&code)
            .await?
            .ok_or(CouponError::NotFound(code))?;
        coupon.ensure_usable(Utc::now())?;
        self.dispatch(CartAction::ApplyCoupon {
            coupon: coupon.clone(),
        })
        .await;
        info!(code = %coupon.code, "coupon applied");
        Ok(coupon)
    }

    /// Always succeeds; a cart without a coupon stays without one.
    pub async fn remove_coupon(&self) {
        self.dispatch(CartAction::RemoveCoupon).await;
    }

    /// Called by the checkout collaborator once an order is recorded:
    /// clears the cart both in memory and remotely.
    pub async fn checkout_complete(&self) -> Result<()> {
        self.shared.lock().await.cart.apply(CartAction::Clear);
        if let Some(user) = self.identity.borrow().clone() {
            self.store.clear(&user).await.map_err(CartError::Store)?;
            info!(user = %user, "cart cleared after checkout");
        }
        Ok(())
    }

    pub async fn items(&self) -> Vec<CartItem> {
        self.shared.lock().await.cart.items().to_vec()
    }

    pub async fn coupon(&self) -> Option<Coupon> {
        self.shared.lock().await.cart.coupon().cloned()
    }

    /// Whether a remote load is currently in flight.
    pub async fn is_loading(&self) -> bool {
        self.shared.lock().await.loading
    }

    pub async fn subtotal(&self) -> Money {
        self.shared.lock().await.cart.subtotal()
    }

    pub async fn total_price(&self) -> Money {
        self.shared.lock().await.cart.total()
    }

    pub async fn discount_amount(&self) -> Money {
        self.shared.lock().await.cart.discount_amount()
    }

    pub async fn total_quantity(&self) -> u32 {
        self.shared.lock().await.cart.total_quantity()
    }

    /// Drain pending cart events (clamp signals and friends) for the UI.
    pub async fn take_events(&self) -> Vec<CartEvent> {
        self.shared.lock().await.cart.take_events()
    }

    /// Stop the synchronizer, flushing any pending write first.
    pub async fn shutdown(self) {
        let Self {
            dirty, sync_task, ..
        } = self;
        drop(dirty);
        let _ = sync_task.await;
    }

    async fn dispatch(&self, action: CartAction) {
        self.shared.lock().await.cart.apply(action);
        self.dirty.send_modify(|n| *n = n.wrapping_add(1));
    }
}
