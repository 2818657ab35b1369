//! Persistence ports
//!
//! The cart core talks to the backend through two narrow interfaces: a
//! per-user snapshot document and a read-only coupon directory. Adapters
//! live in [`memory`] and [`postgres`].

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::aggregates::cart::CartSnapshot;
use crate::domain::aggregates::coupon::Coupon;
use crate::domain::value_objects::{CouponCode, UserId};

pub mod memory;
pub mod postgres;

/// Remote I/O failure. Swallowed (logged) at the synchronizer boundary;
/// surfaced from direct adapter calls.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("malformed record: {0}")]
    Malformed(String),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Per-user cart snapshot document. `save` replaces the whole document;
/// last writer wins across devices for the same identity.
#[async_trait]
pub trait SnapshotStore: Send + Sync + 'static {
    async fn load(&self, user: &UserId) -> Result<Option<CartSnapshot>, StoreError>;
    async fn save(&self, user: &UserId, snapshot: &CartSnapshot) -> Result<(), StoreError>;
    async fn clear(&self, user: &UserId) -> Result<(), StoreError>;
}

/// Coupon collection, looked up by exact (normalized) code.
#[async_trait]
pub trait CouponDirectory: Send + Sync + 'static {
    async fn find_by_code(&self, code: &CouponCode) -> Result<Option<Coupon>, StoreError>;
}
