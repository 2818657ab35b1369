//! Domain layer: value objects, the cart aggregate, and its events.
pub mod aggregates;
pub mod events;
pub mod value_objects;
