//! Order lifecycle services.
//!
//! Each public operation opens one unit of work at entry and commits it before
//! returning. Any error drops the unit of work, rolling back everything the
//! operation wrote. Dependencies are passed in at construction.

pub mod guard;
pub mod merge;
pub mod orders;
pub mod temp_orders;

use std::sync::Arc;

use crate::catalog::{CustomerDirectory, ProductCatalog, ShopDirectory};
use crate::domain::{OrderDetails, OrderPatch, OrderStatus, TempOrderDetails, TempOrderPatch};
use crate::error::{OrderError, Result};
use crate::pricing::PriceCalculator;
use crate::store::{OrderRepository, Store, TempOrderRepository};

pub use guard::ActiveOrderGuard;
pub use merge::MergeCoordinator;
pub use orders::OrderLifecycleService;
pub use temp_orders::{NewTempOrderLine, NewTempOrderRequest, TempOrderLifecycleService};

/// The three services wired over one store and one set of collaborators.
#[derive(Clone)]
pub struct Services {
    pub orders: Arc<OrderLifecycleService>,
    pub temp_orders: Arc<TempOrderLifecycleService>,
    pub merge: Arc<MergeCoordinator>,
}

impl Services {
    pub fn new<C>(store: Arc<dyn Store>, catalog: Arc<C>) -> Self
    where
        C: ProductCatalog + ShopDirectory + CustomerDirectory + 'static,
    {
        let products: Arc<dyn ProductCatalog> = catalog.clone();
        let shops: Arc<dyn ShopDirectory> = catalog.clone();
        let customers: Arc<dyn CustomerDirectory> = catalog;
        Self {
            orders: Arc::new(OrderLifecycleService::new(store.clone(), products.clone(), customers.clone())),
            temp_orders: Arc::new(TempOrderLifecycleService::new(store.clone(), shops, products)),
            merge: Arc::new(MergeCoordinator::new(store, customers)),
        }
    }
}

/// Recomputes the order total from its current items and writes it back, together
/// with `status` when given.
pub(crate) async fn persist_order_total(
    orders: &mut dyn OrderRepository,
    order_id: i64,
    status: Option<OrderStatus>,
) -> Result<OrderDetails> {
    let items = orders.list_items(order_id).await?;
    let patch = OrderPatch { status, total_price: Some(PriceCalculator::total(&items)?), notes: None };
    let order = orders.update_order(order_id, &patch).await?.ok_or(OrderError::OrderNotFound(order_id))?;
    Ok(OrderDetails { order, items })
}

pub(crate) async fn persist_temp_order_total(
    temp_orders: &mut dyn TempOrderRepository,
    temp_order_id: i64,
) -> Result<TempOrderDetails> {
    let items = temp_orders.list_items(temp_order_id).await?;
    let patch = TempOrderPatch::total_price(PriceCalculator::total(&items)?);
    let temp_order = temp_orders
        .update_temp_order(temp_order_id, &patch)
        .await?
        .ok_or(OrderError::TempOrderNotFound(temp_order_id))?;
    Ok(TempOrderDetails { temp_order, items })
}
