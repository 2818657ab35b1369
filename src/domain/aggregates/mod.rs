//! Aggregates module
pub mod cart;
pub mod coupon;

pub use cart::{Cart, CartAction, CartItem, CartSnapshot};
pub use coupon::{Coupon, CouponError, DiscountKind};
