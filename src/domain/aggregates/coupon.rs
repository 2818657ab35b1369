//! Coupon record and validation

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::value_objects::{CouponCode, Money};

/// Discount shape, tagged the way coupon documents store it
/// (`discount_type` + `discount_value`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "discount_type",
    content = "discount_value",
    rename_all = "lowercase"
)]
pub enum DiscountKind {
    /// Percentage off the subtotal, 0-100.
    Percentage(Decimal),
    /// Fixed amount off the subtotal, in the cart currency.
    Fixed(Decimal),
}

impl DiscountKind {
    /// Fold the discount into a subtotal. A fixed discount larger than the
    /// subtotal floors the total at zero.
    pub fn apply(&self, subtotal: &Money) -> Money {
        match self {
            DiscountKind::Percentage(pct) => Money::new(
                subtotal.amount() * (Decimal::ONE - pct / Decimal::ONE_HUNDRED),
                subtotal.currency(),
            ),
            DiscountKind::Fixed(value) => subtotal.saturating_sub(*value),
        }
    }
}

/// A coupon as read from the coupon collection. Created, edited and deleted
/// by the admin collaborator; read-only from the cart's perspective.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coupon {
    pub id: Uuid,
    pub code: CouponCode,
    #[serde(flatten)]
    pub discount: DiscountKind,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Coupon {
    /// Check that the coupon may be applied at `now`. Validation never
    /// mutates cart state; callers dispatch only on success.
    pub fn ensure_usable(&self, now: DateTime<Utc>) -> Result<(), CouponError> {
        if !self.is_active {
            return Err(CouponError::Inactive(self.code.clone()));
        }
        if let Some(expired_at) = self.expires_at.filter(|at| *at < now) {
            return Err(CouponError::Expired {
                code: self.code.clone(),
                expired_at,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CouponError {
    #[error("no coupon matches code {0}")]
    NotFound(CouponCode),

    #[error("coupon {0} is not active")]
    Inactive(CouponCode),

    #[error("coupon {code} expired at {expired_at}")]
    Expired {
        code: CouponCode,
        expired_at: DateTime<Utc>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn coupon(discount: DiscountKind, is_active: bool, expires_at: Option<DateTime<Utc>>) -> Coupon {
        Coupon {
            id: Uuid::new_v4(),
            code: CouponCode::new("BOW10").unwrap(),
            discount,
            is_active,
            expires_at,
        }
    }

    #[test]
    fn usable_when_active_and_unexpired() {
        let c = coupon(
            DiscountKind::Percentage(Decimal::TEN),
            true,
            Some(Utc::now() + Duration::days(1)),
        );
        assert!(c.ensure_usable(Utc::now()).is_ok());
    }

    #[test]
    fn inactive_coupon_is_rejected() {
        let c = coupon(DiscountKind::Percentage(Decimal::TEN), false, None);
        assert!(matches!(
            c.ensure_usable(Utc::now()),
            Err(CouponError::Inactive(_))
        ));
    }

    #[test]
    fn expired_coupon_is_rejected() {
        let expired_at = Utc::now() - Duration::hours(1);
        let c = coupon(DiscountKind::Fixed(Decimal::ONE), true, Some(expired_at));
        match c.ensure_usable(Utc::now()) {
            Err(CouponError::Expired { expired_at: at, .. }) => assert_eq!(at, expired_at),
            other => panic!("expected expired error, got {other:?}"),
        }
    }

    #[test]
    fn percentage_discount_applies() {
        let subtotal = Money::usd(Decimal::new(100, 0));
        let discounted = DiscountKind::Percentage(Decimal::TEN).apply(&subtotal);
        assert_eq!(discounted.amount(), Decimal::new(90, 0));
    }

    #[test]
    fn fixed_discount_never_goes_negative() {
        let subtotal = Money::usd(Decimal::new(3000, 0));
        let discounted = DiscountKind::Fixed(Decimal::new(5000, 0)).apply(&subtotal);
        assert_eq!(discounted.amount(), Decimal::ZERO);
    }

    #[test]
    fn coupon_serializes_with_flat_discount_fields() {
        let c = coupon(DiscountKind::Percentage(Decimal::TEN), true, None);
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["discount_type"], "percentage");
        assert_eq!(json["code"], "BOW10");
        let back: Coupon = serde_json::from_value(json).unwrap();
        assert_eq!(back, c);
    }
}
