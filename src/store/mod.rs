//! Persistence for orders and temp orders.
//!
//! All access goes through a [`UnitOfWork`]: one database transaction exposing the
//! order and temp order repositories. Services open exactly one unit of work per
//! call and either commit it or drop it. Dropping an uncommitted unit of work
//! rolls it back, which is also what happens when the request future is cancelled.
//!
//! # Implementations
//!
//! - [`PgStore`] - `PostgreSQL` via `sqlx`, used by the service binary.
//! - [`MemoryStore`] - in-process tables with the same constraints, used by tests.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{
    Order, OrderItem, OrderPatch, OrderStatus, PriceSnapshot, Quantity, TempOrder, TempOrderItem,
    TempOrderPatch, TempOrderStatus,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Name of the partial unique index that allows one active order per customer and shop.
pub const ACTIVE_ORDER_INDEX: &str = "orders_one_active_per_customer";

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// The write would leave two active orders for the same customer and shop.
    #[error("active order constraint violated")]
    ActiveOrderConflict,

    /// Failure raised by the in-memory store's fault hook.
    #[error("injected failure: {0}")]
    Injected(String),
}

/// Input for a new order row. Orders always start `created` with a zero total.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewOrder {
    pub shop_id: i64,
    pub customer_id: i64,
    pub customer_name: String,
    pub notes: Option<String>,
}

/// Input for a new temp order row. Temp orders always start `pending` with a zero total.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewTempOrder {
    pub shop_id: i64,
    pub customer_name: String,
    pub customer_phone: String,
}

/// Opens units of work.
#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError>;
}

/// A single transaction over both repositories.
#[async_trait]
pub trait UnitOfWork: Send {
    fn orders(&mut self) -> &mut dyn OrderRepository;
    fn temp_orders(&mut self) -> &mut dyn TempOrderRepository;
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

/// Order and order item rows.
///
/// Lookups that find nothing return `None` / `false`; only infrastructure
/// failures are errors.
#[async_trait]
pub trait OrderRepository: Send {
    /// Inserts a `created` order with a zero total.
    ///
    /// Fails with [`StoreError::ActiveOrderConflict`] if the customer already has
    /// an active order in the shop.
    async fn create_order(&mut self, new: NewOrder) -> Result<Order, StoreError>;
    async fn get_order(&mut self, id: i64, shop_id: i64) -> Result<Option<Order>, StoreError>;
    /// Like [`get_order`](Self::get_order) but holds a row lock until the unit of work ends.
    async fn lock_order(&mut self, id: i64, shop_id: i64) -> Result<Option<Order>, StoreError>;
    /// Most recent order of the customer in the shop whose status is active.
    async fn get_active_order(&mut self, customer_id: i64, shop_id: i64) -> Result<Option<Order>, StoreError>;
    async fn list_orders(&mut self, shop_id: i64, status: Option<OrderStatus>) -> Result<Vec<Order>, StoreError>;
    /// Applies the fields present in `patch` and stamps `updated_at`.
    async fn update_order(&mut self, id: i64, patch: &OrderPatch) -> Result<Option<Order>, StoreError>;
    /// Deletes the order and its items.
    async fn delete_order(&mut self, id: i64) -> Result<bool, StoreError>;

    async fn add_item(&mut self, order_id: i64, snapshot: &PriceSnapshot, qty: Quantity) -> Result<OrderItem, StoreError>;
    async fn get_item(&mut self, order_id: i64, item_id: i64) -> Result<Option<OrderItem>, StoreError>;
    /// Changes the quantity only; the price snapshot is immutable.
    async fn update_item(&mut self, order_id: i64, item_id: i64, qty: Quantity) -> Result<Option<OrderItem>, StoreError>;
    async fn delete_item(&mut self, order_id: i64, item_id: i64) -> Result<bool, StoreError>;
    async fn list_items(&mut self, order_id: i64) -> Result<Vec<OrderItem>, StoreError>;
}

/// Temp order and temp order item rows.
#[async_trait]
pub trait TempOrderRepository: Send {
    async fn create_temp_order(&mut self, new: NewTempOrder) -> Result<TempOrder, StoreError>;
    async fn get_temp_order(&mut self, id: i64, shop_id: i64) -> Result<Option<TempOrder>, StoreError>;
    async fn lock_temp_order(&mut self, id: i64, shop_id: i64) -> Result<Option<TempOrder>, StoreError>;
    async fn list_temp_orders(&mut self, shop_id: i64, status: Option<TempOrderStatus>) -> Result<Vec<TempOrder>, StoreError>;
    async fn update_temp_order(&mut self, id: i64, patch: &TempOrderPatch) -> Result<Option<TempOrder>, StoreError>;
    async fn delete_temp_order(&mut self, id: i64) -> Result<bool, StoreError>;

    async fn add_item(&mut self, temp_order_id: i64, snapshot: &PriceSnapshot, qty: Quantity) -> Result<TempOrderItem, StoreError>;
    async fn list_items(&mut self, temp_order_id: i64) -> Result<Vec<TempOrderItem>, StoreError>;
}
