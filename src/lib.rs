//! PSG SHOP Cart Core
//!
//! Cart and coupon reconciliation for the PSG SHOP storefront: the in-memory
//! cart state store, its debounced remote-snapshot synchronizer, coupon
//! lookup/validation, and exact-decimal pricing. Consumed in-process by the
//! UI layer; authentication and persistence are injected at the ports.
//!
//! ## Features
//! - Cart state machine with stock-clamped mutations and domain events
//! - Debounced per-user snapshot sync (supersede-pending-write, fail-open)
//! - Coupon resolution with activity/expiry validation
//! - Subtotal/discount/total arithmetic over `rust_decimal`
//! - In-memory and Postgres store adapters
//!
//! ## Quick start
//! ```no_run
//! use std::sync::Arc;
//! use psg_cart::{CartSession, IdentityChannel, MemoryStore, SyncConfig, UserId};
//!
//! # async fn demo() {
//! let store = Arc::new(MemoryStore::new());
//! let identity = IdentityChannel::new();
//! let session = CartSession::start(
//!     Arc::clone(&store),
//!     store,
//!     &identity,
//!     SyncConfig::default(),
//! );
//! identity.sign_in(UserId::new("user-1"));
//! # let _ = session;
//! # }
//! ```

use thiserror::Error;

pub mod config;
pub mod domain;
pub mod identity;
pub mod session;
pub mod store;
pub(crate) mod sync;

pub use config::SyncConfig;
pub use domain::aggregates::cart::{Cart, CartAction, CartItem, CartSnapshot};
pub use domain::aggregates::coupon::{Coupon, CouponError, DiscountKind};
pub use domain::events::CartEvent;
pub use domain::value_objects::{
    CouponCode, CouponCodeError, Money, MoneyError, ProductId, UserId,
};
pub use identity::{IdentityChannel, IdentityProvider};
pub use session::CartSession;
pub use store::memory::MemoryStore;
pub use store::postgres::PgStore;
pub use store::{CouponDirectory, SnapshotStore, StoreError};

// =============================================================================
// Error Types
// =============================================================================

#[derive(Debug, Error)]
pub enum CartError {
    #[error(transparent)]
    Coupon(#[from] CouponError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    InvalidCode(#[from] CouponCodeError),
}

pub type Result<T> = std::result::Result<T, CartError>;
