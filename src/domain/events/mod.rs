//! Cart domain events
//!
//! Raised by the aggregate and drained by the session for the UI to react
//! to. `QuantityClamped` is the observable side of the silent stock clamp.

use crate::domain::value_objects::{CouponCode, ProductId};

#[derive(Clone, Debug, PartialEq)]
pub enum CartEvent {
    ItemAdded {
        product_id: ProductId,
        quantity: u32,
    },
    ItemRemoved {
        product_id: ProductId,
    },
    QuantityChanged {
        product_id: ProductId,
        quantity: u32,
    },
    QuantityClamped {
        product_id: ProductId,
        requested: u32,
        capped_at: u32,
    },
    CouponApplied {
        code: CouponCode,
    },
    CouponRemoved,
    Cleared,
}
