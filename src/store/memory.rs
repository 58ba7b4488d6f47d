//! In-memory order store.
//!
//! Units of work are serialized behind an async mutex. Each one edits a private
//! copy of the tables and publishes it on commit, so a dropped or failed unit of
//! work leaves nothing behind. The one-active-order rule is checked on every write
//! that could break it, mirroring the partial unique index in `PostgreSQL`.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{NewOrder, NewTempOrder, OrderRepository, Store, StoreError, TempOrderRepository, UnitOfWork};
use crate::domain::{
    Order, OrderItem, OrderPatch, OrderStatus, PriceSnapshot, Quantity, TempOrder, TempOrderItem,
    TempOrderPatch, TempOrderStatus,
};

const NO_FAULT: usize = usize::MAX;

#[derive(Clone, Debug, Default)]
struct Tables {
    next_id: i64,
    orders: BTreeMap<i64, Order>,
    order_items: BTreeMap<i64, OrderItem>,
    temp_orders: BTreeMap<i64, TempOrder>,
    temp_order_items: BTreeMap<i64, TempOrderItem>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn has_other_active_order(&self, shop_id: i64, customer_id: i64, except: Option<i64>) -> bool {
        self.orders.values().any(|o| {
            o.shop_id == shop_id && o.customer_id == customer_id && o.status.is_active() && Some(o.id) != except
        })
    }
}

/// Order store kept in process memory.
#[derive(Clone, Debug)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    fail_item_insert_after: Arc<AtomicUsize>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self { tables: Arc::default(), fail_item_insert_after: Arc::new(AtomicUsize::new(NO_FAULT)) }
    }
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    /// Makes every unit of work fail its order item insert once `n` inserts have
    /// succeeded in it. Used to check that a half-done operation leaves no trace.
    pub fn fail_order_item_insert_after(&self, n: usize) {
        self.fail_item_insert_after.store(n, Ordering::SeqCst);
    }

    pub fn clear_faults(&self) {
        self.fail_item_insert_after.store(NO_FAULT, Ordering::SeqCst);
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        let committed = Arc::clone(&self.tables).lock_owned().await;
        let working = committed.clone();
        Ok(Box::new(MemoryUnitOfWork {
            committed,
            working,
            item_inserts: 0,
            fail_item_insert_after: self.fail_item_insert_after.load(Ordering::SeqCst),
        }))
    }
}

pub struct MemoryUnitOfWork {
    committed: OwnedMutexGuard<Tables>,
    working: Tables,
    item_inserts: usize,
    fail_item_insert_after: usize,
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    fn orders(&mut self) -> &mut dyn OrderRepository { self }
    fn temp_orders(&mut self) -> &mut dyn TempOrderRepository { self }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let MemoryUnitOfWork { mut committed, working, .. } = *self;
        *committed = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> { Ok(()) }
}

// =============================================================================
// Orders
// =============================================================================

#[async_trait]
impl OrderRepository for MemoryUnitOfWork {
    async fn create_order(&mut self, new: NewOrder) -> Result<Order, StoreError> {
        let t = &mut self.working;
        if t.has_other_active_order(new.shop_id, new.customer_id, None) {
            return Err(StoreError::ActiveOrderConflict);
        }
        let order = Order {
            id: t.next_id(),
            shop_id: new.shop_id,
            customer_id: new.customer_id,
            customer_name: new.customer_name,
            total_price: 0,
            status: OrderStatus::Created,
            notes: new.notes,
            created_at: Utc::now(),
            updated_at: None,
        };
        t.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn get_order(&mut self, id: i64, shop_id: i64) -> Result<Option<Order>, StoreError> {
        Ok(self.working.orders.get(&id).filter(|o| o.shop_id == shop_id).cloned())
    }

    async fn lock_order(&mut self, id: i64, shop_id: i64) -> Result<Option<Order>, StoreError> {
        self.get_order(id, shop_id).await
    }

    async fn get_active_order(&mut self, customer_id: i64, shop_id: i64) -> Result<Option<Order>, StoreError> {
        Ok(self
            .working
            .orders
            .values()
            .filter(|o| o.shop_id == shop_id && o.customer_id == customer_id && o.status.is_active())
            .max_by_key(|o| (o.created_at, o.id))
            .cloned())
    }

    async fn list_orders(&mut self, shop_id: i64, status: Option<OrderStatus>) -> Result<Vec<Order>, StoreError> {
        let mut orders: Vec<Order> = self
            .working
            .orders
            .values()
            .filter(|o| o.shop_id == shop_id && status.map_or(true, |s| o.status == s))
            .cloned()
            .collect();
        orders.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(orders)
    }

    async fn update_order(&mut self, id: i64, patch: &OrderPatch) -> Result<Option<Order>, StoreError> {
        let t = &mut self.working;
        let Some(current) = t.orders.get(&id) else { return Ok(None) };
        if let Some(status) = patch.status {
            if status.is_active() && t.has_other_active_order(current.shop_id, current.customer_id, Some(id)) {
                return Err(StoreError::ActiveOrderConflict);
            }
        }
        let Some(order) = t.orders.get_mut(&id) else { return Ok(None) };
        if let Some(status) = patch.status { order.status = status; }
        if let Some(total_price) = patch.total_price { order.total_price = total_price; }
        if let Some(notes) = &patch.notes { order.notes = Some(notes.clone()); }
        order.updated_at = Some(Utc::now());
        Ok(Some(order.clone()))
    }

    async fn delete_order(&mut self, id: i64) -> Result<bool, StoreError> {
        let t = &mut self.working;
        t.order_items.retain(|_, i| i.order_id != id);
        Ok(t.orders.remove(&id).is_some())
    }

    async fn add_item(&mut self, order_id: i64, snapshot: &PriceSnapshot, qty: Quantity) -> Result<OrderItem, StoreError> {
        if self.item_inserts >= self.fail_item_insert_after {
            return Err(StoreError::Injected(format!("order item insert #{}", self.item_inserts + 1)));
        }
        let t = &mut self.working;
        if !t.orders.contains_key(&order_id) {
            return Err(StoreError::DataCorruption(format!("order {order_id} does not exist")));
        }
        let item = OrderItem {
            id: t.next_id(),
            order_id,
            product_id: snapshot.product_id,
            product_name: snapshot.product_name.clone(),
            price: snapshot.price,
            qty: qty.value(),
            created_at: Utc::now(),
            updated_at: None,
        };
        t.order_items.insert(item.id, item.clone());
        self.item_inserts += 1;
        Ok(item)
    }

    async fn get_item(&mut self, order_id: i64, item_id: i64) -> Result<Option<OrderItem>, StoreError> {
        Ok(self.working.order_items.get(&item_id).filter(|i| i.order_id == order_id).cloned())
    }

    async fn update_item(&mut self, order_id: i64, item_id: i64, qty: Quantity) -> Result<Option<OrderItem>, StoreError> {
        let item = self.working.order_items.get_mut(&item_id).filter(|i| i.order_id == order_id);
        Ok(item.map(|i| {
            i.qty = qty.value();
            i.updated_at = Some(Utc::now());
            i.clone()
        }))
    }

    async fn delete_item(&mut self, order_id: i64, item_id: i64) -> Result<bool, StoreError> {
        let t = &mut self.working;
        if t.order_items.get(&item_id).map_or(false, |i| i.order_id == order_id) {
            t.order_items.remove(&item_id);
            return Ok(true);
        }
        Ok(false)
    }

    async fn list_items(&mut self, order_id: i64) -> Result<Vec<OrderItem>, StoreError> {
        Ok(self.working.order_items.values().filter(|i| i.order_id == order_id).cloned().collect())
    }
}

// =============================================================================
// Temp Orders
// =============================================================================

#[async_trait]
impl TempOrderRepository for MemoryUnitOfWork {
    async fn create_temp_order(&mut self, new: NewTempOrder) -> Result<TempOrder, StoreError> {
        let t = &mut self.working;
        let temp_order = TempOrder {
            id: t.next_id(),
            shop_id: new.shop_id,
            customer_name: new.customer_name,
            customer_phone: new.customer_phone,
            total_price: 0,
            status: TempOrderStatus::Pending,
            created_at: Utc::now(),
            updated_at: None,
        };
        t.temp_orders.insert(temp_order.id, temp_order.clone());
        Ok(temp_order)
    }

    async fn get_temp_order(&mut self, id: i64, shop_id: i64) -> Result<Option<TempOrder>, StoreError> {
        Ok(self.working.temp_orders.get(&id).filter(|o| o.shop_id == shop_id).cloned())
    }

    async fn lock_temp_order(&mut self, id: i64, shop_id: i64) -> Result<Option<TempOrder>, StoreError> {
        self.get_temp_order(id, shop_id).await
    }

    async fn list_temp_orders(&mut self, shop_id: i64, status: Option<TempOrderStatus>) -> Result<Vec<TempOrder>, StoreError> {
        let mut temp_orders: Vec<TempOrder> = self
            .working
            .temp_orders
            .values()
            .filter(|o| o.shop_id == shop_id && status.map_or(true, |s| o.status == s))
            .cloned()
            .collect();
        temp_orders.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(temp_orders)
    }

    async fn update_temp_order(&mut self, id: i64, patch: &TempOrderPatch) -> Result<Option<TempOrder>, StoreError> {
        let Some(temp_order) = self.working.temp_orders.get_mut(&id) else { return Ok(None) };
        if let Some(status) = patch.status { temp_order.status = status; }
        if let Some(total_price) = patch.total_price { temp_order.total_price = total_price; }
        temp_order.updated_at = Some(Utc::now());
        Ok(Some(temp_order.clone()))
    }

    async fn delete_temp_order(&mut self, id: i64) -> Result<bool, StoreError> {
        let t = &mut self.working;
        t.temp_order_items.retain(|_, i| i.temp_order_id != id);
        Ok(t.temp_orders.remove(&id).is_some())
    }

    async fn add_item(&mut self, temp_order_id: i64, snapshot: &PriceSnapshot, qty: Quantity) -> Result<TempOrderItem, StoreError> {
        let t = &mut self.working;
        if !t.temp_orders.contains_key(&temp_order_id) {
            return Err(StoreError::DataCorruption(format!("temp order {temp_order_id} does not exist")));
        }
        let item = TempOrderItem {
            id: t.next_id(),
            temp_order_id,
            product_id: snapshot.product_id,
            product_name: snapshot.product_name.clone(),
            price: snapshot.price,
            qty: qty.value(),
            created_at: Utc::now(),
            updated_at: None,
        };
        t.temp_order_items.insert(item.id, item.clone());
        Ok(item)
    }

    async fn list_items(&mut self, temp_order_id: i64) -> Result<Vec<TempOrderItem>, StoreError> {
        Ok(self.working.temp_order_items.values().filter(|i| i.temp_order_id == temp_order_id).cloned().collect())
    }
}
