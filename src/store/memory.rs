//! In-memory store adapter
//!
//! Backs tests and local development. Mirrors the shape the Postgres
//! adapter persists, counts saves, and can simulate a backend outage.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::aggregates::cart::CartSnapshot;
use crate::domain::aggregates::coupon::Coupon;
use crate::domain::value_objects::{CouponCode, UserId};
use crate::store::{CouponDirectory, SnapshotStore, StoreError};

#[derive(Debug, Default)]
pub struct MemoryStore {
    snapshots: RwLock<HashMap<UserId, CartSnapshot>>,
    coupons: RwLock<HashMap<CouponCode, Coupon>>,
    unavailable: AtomicBool,
    saves: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed_coupon(&self, coupon: Coupon) {
        self.coupons
            .write()
            .await
            .insert(coupon.code.clone(), coupon);
    }

    pub async fn remove_coupon(&self, code: &CouponCode) {
        self.coupons.write().await.remove(code);
    }

    /// Make every operation fail until switched back, to exercise the
    /// fail-open paths.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of snapshot writes accepted so far.
    pub fn save_count(&self) -> u64 {
        self.saves.load(Ordering::SeqCst)
    }

    pub async fn snapshot_of(&self, user: &UserId) -> Option<CartSnapshot> {
        self.snapshots.read().await.get(user).cloned()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected outage".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn load(&self, user: &UserId) -> Result<Option<CartSnapshot>, StoreError> {
        self.check_available()?;
        Ok(self.snapshots.read().await.get(user).cloned())
    }

    async fn save(&self, user: &UserId, snapshot: &CartSnapshot) -> Result<(), StoreError> {
        self.check_available()?;
        self.snapshots
            .write()
            .await
            .insert(user.clone(), snapshot.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn clear(&self, user: &UserId) -> Result<(), StoreError> {
        self.check_available()?;
        self.snapshots.write().await.remove(user);
        Ok(())
    }
}

#[async_trait]
impl CouponDirectory for MemoryStore {
    async fn find_by_code(&self, code: &CouponCode) -> Result<Option<Coupon>, StoreError> {
        self.check_available()?;
        Ok(self.coupons.read().await.get(code).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::coupon::DiscountKind;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    #[tokio::test]
    async fn save_replaces_and_counts() {
        let store = MemoryStore::new();
        let user = UserId::new("u1");
        store.save(&user, &CartSnapshot::empty()).await.unwrap();
        store.save(&user, &CartSnapshot::empty()).await.unwrap();
        assert_eq!(store.save_count(), 2);
        assert!(store.load(&user).await.unwrap().is_some());
        store.clear(&user).await.unwrap();
        assert!(store.load(&user).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn outage_fails_every_operation() {
        let store = MemoryStore::new();
        store.set_unavailable(true);
        let user = UserId::new("u1");
        assert!(matches!(
            store.load(&user).await,
            Err(StoreError::Unavailable(_))
        ));
        assert!(store.save(&user, &CartSnapshot::empty()).await.is_err());
        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test]
    async fn coupon_lookup_is_exact() {
        let store = MemoryStore::new();
        let code = CouponCode::new("BOW10").unwrap();
        store
            .seed_coupon(Coupon {
                id: Uuid::new_v4(),
                code: code.clone(),
                discount: DiscountKind::Percentage(Decimal::TEN),
                is_active: true,
                expires_at: None,
            })
            .await;
        assert!(store.find_by_code(&code).await.unwrap().is_some());
        let other = CouponCode::new("BOW20").unwrap();
        assert!(store.find_by_code(&other).await.unwrap().is_none());
    }
}
