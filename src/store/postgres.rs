//! Postgres store adapter
//!
//! Snapshots live as one JSONB row per user; the upsert is a full-document
//! replace, so the last writer wins across devices. Coupons live in their
//! own table with a unique code, owned by the admin collaborator.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::aggregates::cart::CartSnapshot;
use crate::domain::aggregates::coupon::{Coupon, DiscountKind};
use crate::domain::value_objects::{CouponCode, UserId};
use crate::store::{CouponDirectory, SnapshotStore, StoreError};

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Admin-side coupon write path.
    pub async fn upsert_coupon(&self, coupon: &Coupon) -> Result<(), StoreError> {
        let (kind, value) = match &coupon.discount {
            DiscountKind::Percentage(v) => ("percentage", *v),
            DiscountKind::Fixed(v) => ("fixed", *v),
        };
        sqlx::query(
            "INSERT INTO coupons (id, code, discount_type, discount_value, is_active, expires_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, NOW()) \
             ON CONFLICT (code) DO UPDATE SET discount_type = EXCLUDED.discount_type, \
             discount_value = EXCLUDED.discount_value, is_active = EXCLUDED.is_active, \
             expires_at = EXCLUDED.expires_at, updated_at = NOW()",
        )
        .bind(coupon.id)
        .bind(coupon.code.as_str())
        .bind(kind)
        .bind(value)
        .bind(coupon.is_active)
        .bind(coupon.expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn delete_coupon(&self, code: &CouponCode) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM coupons WHERE code = $1")
            .bind(code.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for PgStore {
    async fn load(&self, user: &UserId) -> Result<Option<CartSnapshot>, StoreError> {
        let row: Option<(serde_json::Value,)> =
            sqlx::query_as("SELECT payload FROM cart_snapshots WHERE user_id = $1")
                .bind(user.as_str())
                .fetch_optional(&self.pool)
                .await?;
        row.map(|(payload,)| serde_json::from_value(payload))
            .transpose()
            .map_err(Into::into)
    }

    async fn save(&self, user: &UserId, snapshot: &CartSnapshot) -> Result<(), StoreError> {
        let payload = serde_json::to_value(snapshot)?;
        sqlx::query(
            "INSERT INTO cart_snapshots (user_id, payload, saved_at) VALUES ($1, $2, $3) \
             ON CONFLICT (user_id) DO UPDATE SET payload = EXCLUDED.payload, \
             saved_at = EXCLUDED.saved_at",
        )
        .bind(user.as_str())
        .bind(&payload)
        .bind(snapshot.saved_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn clear(&self, user: &UserId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM cart_snapshots WHERE user_id = $1")
            .bind(user.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct CouponRow {
    id: Uuid,
    code: String,
    discount_type: String,
    discount_value: Decimal,
    is_active: bool,
    expires_at: Option<DateTime<Utc>>,
}

impl TryFrom<CouponRow> for Coupon {
    type Error = StoreError;

    fn try_from(row: CouponRow) -> Result<Self, StoreError> {
        let discount = match row.discount_type.as_str() {
            "percentage" => DiscountKind::Percentage(row.discount_value),
            "fixed" => DiscountKind::Fixed(row.discount_value),
            other => {
                return Err(StoreError::Malformed(format!(
                    "unknown discount type {other:?} on coupon {}",
                    row.id
                )))
            }
        };
        let code = CouponCode::new(row.code)
            .map_err(|e| StoreError::Malformed(format!("coupon {}: {e}", row.id)))?;
        Ok(Coupon {
            id: row.id,
            code,
            discount,
            is_active: row.is_active,
            expires_at: row.expires_at,
        })
    }
}

#[async_trait]
impl CouponDirectory for PgStore {
    async fn find_by_code(&self, code: &CouponCode) -> Result<Option<Coupon>, StoreError> {
        let row: Option<CouponRow> = sqlx::query_as(
            "SELECT id, code, discount_type, discount_value, is_active, expires_at \
             FROM coupons WHERE code = $1",
        )
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Coupon::try_from).transpose()
    }
}
