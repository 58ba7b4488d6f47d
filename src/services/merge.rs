//! Turning a temp order into a billable order.

use std::sync::Arc;
use tracing::{info, instrument};

use super::{persist_order_total, ActiveOrderGuard};
use crate::catalog::CustomerDirectory;
use crate::domain::{OrderDetails, Quantity, TempOrderPatch, TempOrderStatus};
use crate::error::{OrderError, Result};
use crate::store::{NewOrder, Store};

pub struct MergeCoordinator {
    store: Arc<dyn Store>,
    customers: Arc<dyn CustomerDirectory>,
    guard: ActiveOrderGuard,
}

impl MergeCoordinator {
    pub fn new(store: Arc<dyn Store>, customers: Arc<dyn CustomerDirectory>) -> Self {
        Self { store, customers, guard: ActiveOrderGuard }
    }

    /// Copies a pending temp order's lines onto an order and marks it `accepted`.
    ///
    /// Without `target_order_id` a fresh order is opened for the customer, subject
    /// to the one-active-order rule. With it, the lines are appended to that order;
    /// it must belong to `shop_id`. Lines are always appended as new rows with the
    /// temp order's price snapshot, never folded into existing lines for the same
    /// product.
    ///
    /// Runs in one unit of work: on any error neither the order nor the temp order
    /// changes.
    #[instrument(skip(self))]
    pub async fn merge_temp_order(
        &self,
        temp_order_id: i64,
        customer_id: i64,
        shop_id: i64,
        target_order_id: Option<i64>,
    ) -> Result<OrderDetails> {
        let customer = self
            .customers
            .find_customer(customer_id, shop_id)
            .await?
            .ok_or(OrderError::CustomerNotFound(customer_id))?;

        let mut uow = self.store.begin().await?;
        let temp_order = uow
            .temp_orders()
            .lock_temp_order(temp_order_id, shop_id)
            .await?
            .ok_or(OrderError::TempOrderNotFound(temp_order_id))?;
        if !temp_order.status.is_pending() {
            return Err(OrderError::TempOrderNotPending { id: temp_order.id, status: temp_order.status });
        }

        let order = match target_order_id {
            Some(id) => uow.orders().lock_order(id, shop_id).await?.ok_or(OrderError::OrderNotFound(id))?,
            None => {
                let new = NewOrder { shop_id, customer_id, customer_name: customer.name, notes: None };
                self.guard.create_order(uow.orders(), new).await?
            }
        };

        let lines = uow.temp_orders().list_items(temp_order.id).await?;
        for line in &lines {
            uow.orders().add_item(order.id, &line.snapshot(), Quantity::new(line.qty)?).await?;
        }
        let details = persist_order_total(uow.orders(), order.id, None).await?;

        uow.temp_orders()
            .update_temp_order(temp_order.id, &TempOrderPatch::status(TempOrderStatus::Accepted))
            .await?
            .ok_or(OrderError::TempOrderNotFound(temp_order.id))?;
        uow.commit().await?;

        info!(order_id = order.id, lines = lines.len(), total_price = details.order.total_price, "temp order merged");
        Ok(details)
    }
}
