//! Aggregates module
pub mod order;
pub mod temp_order;

pub use order::{Order, OrderDetails, OrderItem, OrderPatch, OrderStatus, StatusParseError};
pub use temp_order::{TempOrder, TempOrderDetails, TempOrderItem, TempOrderPatch, TempOrderStatus};
