//! One active order per customer and shop.
//!
//! The lookup in [`ActiveOrderGuard::ensure_no_active_order`] only catches the
//! common case. Two transactions can both pass it before either inserts, so
//! [`ActiveOrderGuard::create_order`] also maps the store's constraint violation
//! (the partial unique index in `PostgreSQL`) to the same error.

use tracing::debug;

use crate::domain::Order;
use crate::error::{OrderError, Result};
use crate::store::{NewOrder, OrderRepository, StoreError};

#[derive(Clone, Copy, Debug, Default)]
pub struct ActiveOrderGuard;

impl ActiveOrderGuard {
    pub async fn ensure_no_active_order(
        &self,
        orders: &mut dyn OrderRepository,
        customer_id: i64,
        shop_id: i64,
    ) -> Result<()> {
        match orders.get_active_order(customer_id, shop_id).await? {
            Some(existing) => {
                debug!(order_id = existing.id, status = %existing.status, "customer already has an active order");
                Err(OrderError::ActiveOrderExists { customer_id, shop_id })
            }
            None => Ok(()),
        }
    }

    /// Checks for an active order and inserts a new one in the same unit of work.
    pub async fn create_order(&self, orders: &mut dyn OrderRepository, new: NewOrder) -> Result<Order> {
        let (customer_id, shop_id) = (new.customer_id, new.shop_id);
        self.ensure_no_active_order(orders, customer_id, shop_id).await?;
        orders.create_order(new).await.map_err(|e| match e {
            StoreError::ActiveOrderConflict => {
                debug!(customer_id, shop_id, "lost active order race");
                OrderError::ActiveOrderExists { customer_id, shop_id }
            }
            other => other.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OrderItem, OrderPatch, OrderStatus, PriceSnapshot, Quantity};
    use crate::store::{MemoryStore, Store};
    use async_trait::async_trait;

    /// Repository whose active order lookup never sees the committed order, as when
    /// a concurrent transaction inserts between the lookup and the insert.
    struct StaleLookup<'a>(&'a mut dyn OrderRepository);

    #[async_trait]
    impl OrderRepository for StaleLookup<'_> {
        async fn create_order(&mut self, new: NewOrder) -> std::result::Result<Order, StoreError> {
            self.0.create_order(new).await
        }
        async fn get_order(&mut self, id: i64, shop_id: i64) -> std::result::Result<Option<Order>, StoreError> {
            self.0.get_order(id, shop_id).await
        }
        async fn lock_order(&mut self, id: i64, shop_id: i64) -> std::result::Result<Option<Order>, StoreError> {
            self.0.lock_order(id, shop_id).await
        }
        async fn get_active_order(&mut self, _: i64, _: i64) -> std::result::Result<Option<Order>, StoreError> {
            Ok(None)
        }
        async fn list_orders(&mut self, shop_id: i64, status: Option<OrderStatus>) -> std::result::Result<Vec<Order>, StoreError> {
            self.0.list_orders(shop_id, status).await
        }
        async fn update_order(&mut self, id: i64, patch: &OrderPatch) -> std::result::Result<Option<Order>, StoreError> {
            self.0.update_order(id, patch).await
        }
        async fn delete_order(&mut self, id: i64) -> std::result::Result<bool, StoreError> {
            self.0.delete_order(id).await
        }
        async fn add_item(&mut self, order_id: i64, snapshot: &PriceSnapshot, qty: Quantity) -> std::result::Result<OrderItem, StoreError> {
            self.0.add_item(order_id, snapshot, qty).await
        }
        async fn get_item(&mut self, order_id: i64, item_id: i64) -> std::result::Result<Option<OrderItem>, StoreError> {
            self.0.get_item(order_id, item_id).await
        }
        async fn update_item(&mut self, order_id: i64, item_id: i64, qty: Quantity) -> std::result::Result<Option<OrderItem>, StoreError> {
            self.0.update_item(order_id, item_id, qty).await
        }
        async fn delete_item(&mut self, order_id: i64, item_id: i64) -> std::result::Result<bool, StoreError> {
            self.0.delete_item(order_id, item_id).await
        }
        async fn list_items(&mut self, order_id: i64) -> std::result::Result<Vec<OrderItem>, StoreError> {
            self.0.list_items(order_id).await
        }
    }

    fn new_order() -> NewOrder {
        NewOrder { shop_id: 1, customer_id: 5, customer_name: "Jane".into(), notes: None }
    }

    #[tokio::test]
    async fn test_rejects_when_active_order_exists() {
        let store = MemoryStore::new();
        let mut uow = store.begin().await.unwrap();
        let guard = ActiveOrderGuard;
        guard.create_order(uow.orders(), new_order()).await.unwrap();
        let err = guard.ensure_no_active_order(uow.orders(), 5, 1).await.unwrap_err();
        assert!(matches!(err, OrderError::ActiveOrderExists { customer_id: 5, shop_id: 1 }));
        // a different shop is a different scope
        guard.ensure_no_active_order(uow.orders(), 5, 2).await.unwrap();
    }

    #[tokio::test]
    async fn test_closed_orders_do_not_count() {
        let store = MemoryStore::new();
        let mut uow = store.begin().await.unwrap();
        let guard = ActiveOrderGuard;
        let order = guard.create_order(uow.orders(), new_order()).await.unwrap();
        uow.orders().update_order(order.id, &OrderPatch::status(OrderStatus::Cancelled)).await.unwrap();
        guard.create_order(uow.orders(), new_order()).await.unwrap();
    }

    #[tokio::test]
    async fn test_lost_race_reports_active_order_exists() {
        let store = MemoryStore::new();
        let mut uow = store.begin().await.unwrap();
        let guard = ActiveOrderGuard;
        guard.create_order(uow.orders(), new_order()).await.unwrap();

        let mut stale = StaleLookup(uow.orders());
        guard.ensure_no_active_order(&mut stale, 5, 1).await.unwrap();
        let err = guard.create_order(&mut stale, new_order()).await.unwrap_err();
        assert!(matches!(err, OrderError::ActiveOrderExists { customer_id: 5, shop_id: 1 }), "got {err:?}");
        assert_eq!(uow.orders().list_orders(1, None).await.unwrap().len(), 1);
    }
}
