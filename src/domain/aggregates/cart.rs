//! Cart aggregate
//!
//! Sole mutator of cart state for the active session. All transitions are
//! synchronous and pure; persistence is layered on top via [`CartSnapshot`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::aggregates::coupon::Coupon;
use crate::domain::events::CartEvent;
use crate::domain::value_objects::{Money, ProductId};

/// One line in the cart. `stock`, when known, caps the quantity the shopper
/// may hold; mutations clamp to it rather than fail.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub name: String,
    pub price: Money,
    pub quantity: u32,
    pub stock: Option<u32>,
    pub category: String,
    pub image_url: Option<String>,
}

impl CartItem {
    pub fn line_total(&self) -> Money {
        self.price.multiply(self.quantity)
    }
}

/// Discrete actions the store accepts. `SetCart` is reserved for hydration
/// and resets; everything else is shopper-driven.
#[derive(Clone, Debug)]
pub enum CartAction {
    SetCart {
        items: Vec<CartItem>,
        coupon: Option<Coupon>,
    },
    AddItem {
        item: CartItem,
    },
    RemoveItem {
        product_id: ProductId,
    },
    UpdateQuantity {
        product_id: ProductId,
        quantity: u32,
    },
    Clear,
    ApplyCoupon {
        coupon: Coupon,
    },
    RemoveCoupon,
}

/// The unit of remote persistence, keyed by user identity. Every save
/// replaces the whole document; `saved_at` records the write time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartSnapshot {
    pub items: Vec<CartItem>,
    pub coupon: Option<Coupon>,
    pub saved_at: DateTime<Utc>,
}

impl CartSnapshot {
    pub fn empty() -> Self {
        Self {
            items: vec![],
            coupon: None,
            saved_at: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.coupon.is_none()
    }
}

#[derive(Clone, Debug)]
pub struct Cart {
    items: Vec<CartItem>,
    coupon: Option<Coupon>,
    currency: String,
    events: Vec<CartEvent>,
}

impl Cart {
    pub fn new(currency: &str) -> Self {
        Self {
            items: vec![],
            coupon: None,
            currency: currency.to_string(),
            events: vec![],
        }
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn coupon(&self) -> Option<&Coupon> {
        self.coupon.as_ref()
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn total_quantity(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.coupon.is_none()
    }

    pub fn apply(&mut self, action: CartAction) {
        match action {
            CartAction::SetCart { items, coupon } => self.set(items, coupon),
            CartAction::AddItem { item } => self.add_item(item),
            CartAction::RemoveItem { product_id } => self.remove_item(&product_id),
            CartAction::UpdateQuantity {
                product_id,
                quantity,
            } => self.update_quantity(&product_id, quantity),
            CartAction::Clear => self.clear(),
            CartAction::ApplyCoupon { coupon } => self.apply_coupon(coupon),
            CartAction::RemoveCoupon => self.remove_coupon(),
        }
    }

    /// Wholesale replacement, used only when hydrating from a snapshot or
    /// resetting on sign-out. Raises no events and drops any pending ones.
    pub fn set(&mut self, items: Vec<CartItem>, coupon: Option<Coupon>) {
        self.items = items;
        self.coupon = coupon;
        self.events.clear();
    }

    /// Merge-or-insert. An existing line has its quantity incremented by
    /// `item.quantity` (at least 1); a new line is inserted as-is. Either
    /// way the quantity is clamped to the declared stock, and a clamp that
    /// leaves the quantity unchanged makes the whole action a no-op.
    pub fn add_item(&mut self, item: CartItem) {
        let requested = item.quantity.max(1);
        if let Some(idx) = self.items.iter().position(|i| i.product_id == item.product_id) {
            let cap = self.items[idx].stock.unwrap_or(u32::MAX);
            let current = self.items[idx].quantity;
            let wanted = current.saturating_add(requested);
            let target = wanted.min(cap);
            if wanted > cap {
                self.raise(CartEvent::QuantityClamped {
                    product_id: item.product_id.clone(),
                    requested: wanted,
                    capped_at: cap,
                });
            }
            if target > current {
                self.items[idx].quantity = target;
                self.raise(CartEvent::ItemAdded {
                    product_id: item.product_id,
                    quantity: target,
                });
            }
        } else {
            let cap = item.stock.unwrap_or(u32::MAX);
            let target = requested.min(cap);
            if requested > cap {
                self.raise(CartEvent::QuantityClamped {
                    product_id: item.product_id.clone(),
                    requested,
                    capped_at: cap,
                });
            }
            if target >= 1 {
                let mut item = item;
                item.quantity = target;
                self.raise(CartEvent::ItemAdded {
                    product_id: item.product_id.clone(),
                    quantity: target,
                });
                self.items.push(item);
            }
        }
    }

    /// Unconditional removal; no-op when the id is not in the cart.
    pub fn remove_item(&mut self, product_id: &ProductId) {
        let before = self.items.len();
        self.items.retain(|i| i.product_id != *product_id);
        if self.items.len() < before {
            self.raise(CartEvent::ItemRemoved {
                product_id: product_id.clone(),
            });
        }
    }

    /// Zero removes the line; anything else sets the quantity, clamped to
    /// stock. No-op when the id is not in the cart.
    pub fn update_quantity(&mut self, product_id: &ProductId, quantity: u32) {
        let Some(idx) = self.items.iter().position(|i| i.product_id == *product_id) else {
            return;
        };
        if quantity == 0 {
            self.items.remove(idx);
            self.raise(CartEvent::ItemRemoved {
                product_id: product_id.clone(),
            });
            return;
        }
        let cap = self.items[idx].stock.unwrap_or(u32::MAX);
        let target = quantity.min(cap);
        if quantity > cap {
            self.raise(CartEvent::QuantityClamped {
                product_id: product_id.clone(),
                requested: quantity,
                capped_at: cap,
            });
        }
        self.items[idx].quantity = target;
        self.raise(CartEvent::QuantityChanged {
            product_id: product_id.clone(),
            quantity: target,
        });
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.coupon = None;
        self.raise(CartEvent::Cleared);
    }

    /// Sets the coupon slot. Validation happens before dispatch, in the
    /// coupon resolver.
    pub fn apply_coupon(&mut self, coupon: Coupon) {
        self.raise(CartEvent::CouponApplied {
            code: coupon.code.clone(),
        });
        self.coupon = Some(coupon);
    }

    pub fn remove_coupon(&mut self) {
        if self.coupon.take().is_some() {
            self.raise(CartEvent::CouponRemoved);
        }
    }

    pub fn subtotal(&self) -> Money {
        self.items
            .iter()
            .fold(Money::zero(&self.currency), |acc, i| {
                acc.add(&i.line_total()).unwrap_or(acc)
            })
    }

    /// Subtotal with the active coupon folded in. Never negative.
    pub fn total(&self) -> Money {
        let subtotal = self.subtotal();
        match &self.coupon {
            None => subtotal,
            Some(coupon) => coupon.discount.apply(&subtotal),
        }
    }

    pub fn discount_amount(&self) -> Money {
        Money::new(
            self.subtotal().amount() - self.total().amount(),
            &self.currency,
        )
    }

    pub fn to_snapshot(&self, saved_at: DateTime<Utc>) -> CartSnapshot {
        CartSnapshot {
            items: self.items.clone(),
            coupon: self.coupon.clone(),
            saved_at,
        }
    }

    pub fn take_events(&mut self) -> Vec<CartEvent> {
        std::mem::take(&mut self.events)
    }

    fn raise(&mut self, event: CartEvent) {
        self.events.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::coupon::DiscountKind;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn item(id: &str, price: i64, quantity: u32, stock: Option<u32>) -> CartItem {
        CartItem {
            product_id: ProductId::new(id),
            name: format!("Bow {id}"),
            price: Money::usd(Decimal::new(price, 0)),
            quantity,
            stock,
            category: "bows".into(),
            image_url: None,
        }
    }

    fn percentage_coupon(pct: i64) -> Coupon {
        Coupon {
            id: Uuid::new_v4(),
            code: crate::domain::value_objects::CouponCode::new("BOW10").unwrap(),
            discount: DiscountKind::Percentage(Decimal::new(pct, 0)),
            is_active: true,
            expires_at: None,
        }
    }

    #[test]
    fn repeated_adds_clamp_to_stock() {
        let mut cart = Cart::new("USD");
        for _ in 0..5 {
            cart.add_item(item("a", 100, 2, Some(6)));
        }
        assert_eq!(cart.items()[0].quantity, 6);
    }

    #[test]
    fn repeated_adds_without_stock_sum_raw() {
        let mut cart = Cart::new("USD");
        for _ in 0..4 {
            cart.add_item(item("a", 100, 3, None));
        }
        assert_eq!(cart.items()[0].quantity, 12);
    }

    #[test]
    fn second_add_at_stock_limit_is_a_noop_with_clamp_signal() {
        let mut cart = Cart::new("USD");
        cart.add_item(item("a", 100, 1, Some(1)));
        cart.take_events();
        cart.add_item(item("a", 100, 1, Some(1)));
        assert_eq!(cart.items()[0].quantity, 1);
        let events = cart.take_events();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            CartEvent::QuantityClamped {
                requested: 2,
                capped_at: 1,
                ..
            }
        ));
    }

    #[test]
    fn update_quantity_zero_removes_the_line() {
        let mut cart = Cart::new("USD");
        cart.add_item(item("a", 100, 2, None));
        cart.update_quantity(&ProductId::new("a"), 0);
        assert!(cart.items().is_empty());
    }

    #[test]
    fn update_quantity_clamps_to_stock() {
        let mut cart = Cart::new("USD");
        cart.add_item(item("a", 100, 1, Some(3)));
        cart.update_quantity(&ProductId::new("a"), 10);
        assert_eq!(cart.items()[0].quantity, 3);
    }

    #[test]
    fn update_quantity_on_unknown_id_is_a_noop() {
        let mut cart = Cart::new("USD");
        cart.add_item(item("a", 100, 1, None));
        cart.update_quantity(&ProductId::new("zzz"), 4);
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity, 1);
    }

    #[test]
    fn subtotal_is_order_independent() {
        let mut forward = Cart::new("USD");
        forward.add_item(item("a", 1000, 2, None));
        forward.add_item(item("b", 500, 1, None));
        let mut reversed = Cart::new("USD");
        reversed.add_item(item("b", 500, 1, None));
        reversed.add_item(item("a", 1000, 2, None));
        assert_eq!(forward.subtotal(), reversed.subtotal());
    }

    #[test]
    fn pricing_scenario_with_percentage_coupon() {
        let mut cart = Cart::new("USD");
        cart.add_item(item("a", 1000, 2, None));
        cart.add_item(item("b", 500, 1, None));
        cart.apply_coupon(percentage_coupon(10));
        assert_eq!(cart.subtotal().amount(), Decimal::new(2500, 0));
        assert_eq!(cart.discount_amount().amount(), Decimal::new(250, 0));
        assert_eq!(cart.total().amount(), Decimal::new(2250, 0));
    }

    #[test]
    fn fixed_coupon_floors_total_at_zero() {
        let mut cart = Cart::new("USD");
        cart.add_item(item("a", 3000, 1, None));
        let mut coupon = percentage_coupon(0);
        coupon.discount = DiscountKind::Fixed(Decimal::new(5000, 0));
        cart.apply_coupon(coupon);
        assert_eq!(cart.total().amount(), Decimal::ZERO);
        assert_eq!(cart.discount_amount().amount(), Decimal::new(3000, 0));
    }

    #[test]
    fn clear_then_empty_hydration_round_trips() {
        let mut cart = Cart::new("USD");
        cart.add_item(item("a", 100, 1, None));
        cart.apply_coupon(percentage_coupon(10));
        cart.clear();
        let after_clear = cart.to_snapshot(Utc::now());
        let remote = CartSnapshot::empty();
        cart.set(remote.items.clone(), remote.coupon.clone());
        let after_hydrate = cart.to_snapshot(after_clear.saved_at);
        assert_eq!(after_clear, after_hydrate);
        assert!(cart.is_empty());
    }

    #[test]
    fn removing_missing_item_raises_nothing() {
        let mut cart = Cart::new("USD");
        cart.remove_item(&ProductId::new("ghost"));
        assert!(cart.take_events().is_empty());
    }

    #[test]
    fn hydration_raises_no_events() {
        let mut cart = Cart::new("USD");
        cart.set(vec![item("a", 100, 2, None)], Some(percentage_coupon(10)));
        assert!(cart.take_events().is_empty());
        assert_eq!(cart.item_count(), 1);
    }

    #[test]
    fn insert_with_zero_stock_does_not_create_a_line() {
        let mut cart = Cart::new("USD");
        cart.add_item(item("a", 100, 1, Some(0)));
        assert!(cart.items().is_empty());
        assert!(matches!(
            cart.take_events()[..],
            [CartEvent::QuantityClamped { capped_at: 0, .. }]
        ));
    }
}
