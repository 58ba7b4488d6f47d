//! Domain model: orders, temp orders and their line items.
pub mod aggregates;
pub mod value_objects;

pub use aggregates::*;
pub use value_objects::{PriceSnapshot, PricedLine, Quantity, QuantityError};
