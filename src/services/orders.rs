//! Order creation, item changes and status updates.

use std::sync::Arc;
use tracing::{info, instrument};

use super::{persist_order_total, ActiveOrderGuard};
use crate::catalog::{CustomerDirectory, ProductCatalog};
use crate::domain::{Order, OrderDetails, OrderPatch, OrderStatus, Quantity};
use crate::error::{OrderError, Result};
use crate::store::{NewOrder, Store, StoreError};

pub struct OrderLifecycleService {
    store: Arc<dyn Store>,
    products: Arc<dyn ProductCatalog>,
    customers: Arc<dyn CustomerDirectory>,
    guard: ActiveOrderGuard,
}

impl OrderLifecycleService {
    pub fn new(store: Arc<dyn Store>, products: Arc<dyn ProductCatalog>, customers: Arc<dyn CustomerDirectory>) -> Self {
        Self { store, products, customers, guard: ActiveOrderGuard }
    }

    /// Opens a new `created` order, unless the customer already has an active one
    /// in this shop.
    #[instrument(skip(self, notes))]
    pub async fn create_order(&self, customer_id: i64, shop_id: i64, notes: Option<String>) -> Result<Order> {
        let customer = self
            .customers
            .find_customer(customer_id, shop_id)
            .await?
            .ok_or(OrderError::CustomerNotFound(customer_id))?;

        let mut uow = self.store.begin().await?;
        let new = NewOrder { shop_id, customer_id, customer_name: customer.name, notes };
        let order = self.guard.create_order(uow.orders(), new).await?;
        uow.commit().await?;

        info!(order_id = order.id, "order created");
        Ok(order)
    }

    pub async fn get_order(&self, id: i64, shop_id: i64) -> Result<OrderDetails> {
        let mut uow = self.store.begin().await?;
        let order = uow.orders().get_order(id, shop_id).await?.ok_or(OrderError::OrderNotFound(id))?;
        let items = uow.orders().list_items(order.id).await?;
        uow.commit().await?;
        Ok(OrderDetails { order, items })
    }

    pub async fn list_orders(&self, shop_id: i64, status: Option<OrderStatus>) -> Result<Vec<Order>> {
        let mut uow = self.store.begin().await?;
        let orders = uow.orders().list_orders(shop_id, status).await?;
        uow.commit().await?;
        Ok(orders)
    }

    /// Adds a line with the product's current name and price, then rewrites the
    /// order total.
    #[instrument(skip(self))]
    pub async fn add_item(&self, order_id: i64, shop_id: i64, product_id: i64, qty: i32) -> Result<OrderDetails> {
        let qty = Quantity::new(qty)?;
        let product = self
            .products
            .get_product_by_id(product_id, shop_id)
            .await?
            .ok_or(OrderError::ProductNotFound(product_id))?;

        let mut uow = self.store.begin().await?;
        let order = uow.orders().lock_order(order_id, shop_id).await?.ok_or(OrderError::OrderNotFound(order_id))?;
        let item = uow.orders().add_item(order.id, &product.snapshot(), qty).await?;
        let details = persist_order_total(uow.orders(), order.id, promoted(&order)).await?;
        uow.commit().await?;

        info!(item_id = item.id, total_price = details.order.total_price, "order item added");
        Ok(details)
    }

    /// Changes a line's quantity. The price snapshot is kept.
    #[instrument(skip(self))]
    pub async fn update_item(&self, order_id: i64, shop_id: i64, item_id: i64, qty: i32) -> Result<OrderDetails> {
        let qty = Quantity::new(qty)?;

        let mut uow = self.store.begin().await?;
        let order = uow.orders().lock_order(order_id, shop_id).await?.ok_or(OrderError::OrderNotFound(order_id))?;
        uow.orders()
            .update_item(order.id, item_id, qty)
            .await?
            .ok_or(OrderError::OrderItemNotFound(item_id))?;
        let details = persist_order_total(uow.orders(), order.id, promoted(&order)).await?;
        uow.commit().await?;

        info!(total_price = details.order.total_price, "order item updated");
        Ok(details)
    }

    #[instrument(skip(self))]
    pub async fn delete_item(&self, order_id: i64, shop_id: i64, item_id: i64) -> Result<OrderDetails> {
        let mut uow = self.store.begin().await?;
        let order = uow.orders().lock_order(order_id, shop_id).await?.ok_or(OrderError::OrderNotFound(order_id))?;
        if !uow.orders().delete_item(order.id, item_id).await? {
            return Err(OrderError::OrderItemNotFound(item_id));
        }
        let details = persist_order_total(uow.orders(), order.id, promoted(&order)).await?;
        uow.commit().await?;

        info!(total_price = details.order.total_price, "order item removed");
        Ok(details)
    }

    /// Applies the fields present in `patch` and nothing else.
    ///
    /// A `total_price` given here is written as-is, without looking at the items.
    #[instrument(skip(self))]
    pub async fn update_order(&self, id: i64, shop_id: i64, patch: OrderPatch) -> Result<Order> {
        let mut uow = self.store.begin().await?;
        let order = uow.orders().lock_order(id, shop_id).await?.ok_or(OrderError::OrderNotFound(id))?;
        if patch.is_empty() {
            uow.commit().await?;
            return Ok(order);
        }
        let updated = uow
            .orders()
            .update_order(order.id, &patch)
            .await
            .map_err(|e| match e {
                StoreError::ActiveOrderConflict => {
                    OrderError::ActiveOrderExists { customer_id: order.customer_id, shop_id }
                }
                other => other.into(),
            })?
            .ok_or(OrderError::OrderNotFound(id))?;
        uow.commit().await?;

        info!(status = %updated.status, total_price = updated.total_price, "order updated");
        Ok(updated)
    }

    /// Deletes the order and all of its items.
    #[instrument(skip(self))]
    pub async fn delete_order(&self, id: i64, shop_id: i64) -> Result<()> {
        let mut uow = self.store.begin().await?;
        let order = uow.orders().lock_order(id, shop_id).await?.ok_or(OrderError::OrderNotFound(id))?;
        uow.orders().delete_order(order.id).await?;
        uow.commit().await?;

        info!("order deleted");
        Ok(())
    }
}

/// Status change caused by an item mutation, if any.
fn promoted(order: &Order) -> Option<OrderStatus> {
    let next = order.status.after_item_mutation();
    (next != order.status).then_some(next)
}
