//! `PostgreSQL` implementation of the order store.
//!
//! Every statement runs on the unit of work's `sqlx::Transaction`. Partial updates
//! are assembled with `QueryBuilder` so every value is a bound parameter.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};

use super::{
    NewOrder, NewTempOrder, OrderRepository, Store, StoreError, TempOrderRepository, UnitOfWork,
    ACTIVE_ORDER_INDEX,
};
use crate::domain::{
    Order, OrderItem, OrderPatch, OrderStatus, PriceSnapshot, Quantity, TempOrder, TempOrderItem,
    TempOrderPatch, TempOrderStatus,
};

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i64,
    shop_id: i64,
    customer_id: i64,
    customer_name: String,
    total_price: i64,
    status: String,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<OrderRow> for Order {
    type Error = StoreError;
    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<OrderStatus>()
            .map_err(|e| StoreError::DataCorruption(format!("order {}: {e}", row.id)))?;
        Ok(Self {
            id: row.id,
            shop_id: row.shop_id,
            customer_id: row.customer_id,
            customer_name: row.customer_name,
            total_price: row.total_price,
            status,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    id: i64,
    order_id: i64,
    product_id: i64,
    product_name: String,
    price: i64,
    qty: i32,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        Self {
            id: row.id,
            order_id: row.order_id,
            product_id: row.product_id,
            product_name: row.product_name,
            price: row.price,
            qty: row.qty,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TempOrderRow {
    id: i64,
    shop_id: i64,
    customer_name: String,
    customer_phone: String,
    total_price: i64,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<TempOrderRow> for TempOrder {
    type Error = StoreError;
    fn try_from(row: TempOrderRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<TempOrderStatus>()
            .map_err(|e| StoreError::DataCorruption(format!("temp order {}: {e}", row.id)))?;
        Ok(Self {
            id: row.id,
            shop_id: row.shop_id,
            customer_name: row.customer_name,
            customer_phone: row.customer_phone,
            total_price: row.total_price,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TempOrderItemRow {
    id: i64,
    temp_order_id: i64,
    product_id: i64,
    product_name: String,
    price: i64,
    qty: i32,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl From<TempOrderItemRow> for TempOrderItem {
    fn from(row: TempOrderItemRow) -> Self {
        Self {
            id: row.id,
            temp_order_id: row.temp_order_id,
            product_id: row.product_id,
            product_name: row.product_name,
            price: row.price,
            qty: row.qty,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn orders_from_rows(rows: Vec<OrderRow>) -> Result<Vec<Order>, StoreError> {
    rows.into_iter().map(Order::try_from).collect()
}

fn temp_orders_from_rows(rows: Vec<TempOrderRow>) -> Result<Vec<TempOrder>, StoreError> {
    rows.into_iter().map(TempOrder::try_from).collect()
}

/// Status values to match in `status = ANY(..)`, legacy spellings included.
fn spellings(status: &OrderStatus) -> Vec<String> {
    status.stored_spellings().iter().map(|s| s.to_string()).collect()
}

/// Maps a violation of the one-active-order index to [`StoreError::ActiveOrderConflict`].
fn map_active_order_violation(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = e {
        if db_err.is_unique_violation() && db_err.constraint() == Some(ACTIVE_ORDER_INDEX) {
            return StoreError::ActiveOrderConflict;
        }
    }
    StoreError::Database(e)
}

// =============================================================================
// Store
// =============================================================================

/// Order store backed by a `PostgreSQL` pool.
#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self { Self { pool } }
    pub fn pool(&self) -> &PgPool { &self.pool }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgUnitOfWork { tx }))
    }
}

/// One open transaction. Dropped without `commit` it rolls back.
pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    fn orders(&mut self) -> &mut dyn OrderRepository { self }
    fn temp_orders(&mut self) -> &mut dyn TempOrderRepository { self }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.rollback().await?;
        Ok(())
    }
}

// =============================================================================
// Orders
// =============================================================================

#[async_trait]
impl OrderRepository for PgUnitOfWork {
    async fn create_order(&mut self, new: NewOrder) -> Result<Order, StoreError> {
        let row = sqlx::query_as::<_, OrderRow>(
            "INSERT INTO orders (shop_id, customer_id, customer_name, total_price, status, notes) \
             VALUES ($1, $2, $3, 0, $4, $5) RETURNING *",
        )
        .bind(new.shop_id)
        .bind(new.customer_id)
        .bind(&new.customer_name)
        .bind(OrderStatus::Created.as_str())
        .bind(&new.notes)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_active_order_violation)?;
        row.try_into()
    }

    async fn get_order(&mut self, id: i64, shop_id: i64) -> Result<Option<Order>, StoreError> {
        sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE id = $1 AND shop_id = $2")
            .bind(id)
            .bind(shop_id)
            .fetch_optional(&mut *self.tx)
            .await?
            .map(Order::try_from)
            .transpose()
    }

    async fn lock_order(&mut self, id: i64, shop_id: i64) -> Result<Option<Order>, StoreError> {
        sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE id = $1 AND shop_id = $2 FOR UPDATE")
            .bind(id)
            .bind(shop_id)
            .fetch_optional(&mut *self.tx)
            .await?
            .map(Order::try_from)
            .transpose()
    }

    async fn get_active_order(&mut self, customer_id: i64, shop_id: i64) -> Result<Option<Order>, StoreError> {
        let active: Vec<String> = OrderStatus::ACTIVE.iter().flat_map(spellings).collect();
        sqlx::query_as::<_, OrderRow>(
            "SELECT * FROM orders WHERE customer_id = $1 AND shop_id = $2 AND status = ANY($3) \
             ORDER BY created_at DESC, id DESC LIMIT 1",
        )
        .bind(customer_id)
        .bind(shop_id)
        .bind(active)
        .fetch_optional(&mut *self.tx)
        .await?
        .map(Order::try_from)
        .transpose()
    }

    async fn list_orders(&mut self, shop_id: i64, status: Option<OrderStatus>) -> Result<Vec<Order>, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM orders WHERE shop_id = ");
        qb.push_bind(shop_id);
        if let Some(status) = status {
            qb.push(" AND status = ANY(").push_bind(spellings(&status)).push(")");
        }
        qb.push(" ORDER BY created_at DESC, id DESC");
        let rows = qb.build_query_as::<OrderRow>().fetch_all(&mut *self.tx).await?;
        orders_from_rows(rows)
    }

    async fn update_order(&mut self, id: i64, patch: &OrderPatch) -> Result<Option<Order>, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE orders SET updated_at = NOW()");
        if let Some(status) = patch.status {
            qb.push(", status = ").push_bind(status.as_str());
        }
        if let Some(total_price) = patch.total_price {
            qb.push(", total_price = ").push_bind(total_price);
        }
        if let Some(notes) = &patch.notes {
            qb.push(", notes = ").push_bind(notes.clone());
        }
        qb.push(" WHERE id = ").push_bind(id).push(" RETURNING *");
        qb.build_query_as::<OrderRow>()
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_active_order_violation)?
            .map(Order::try_from)
            .transpose()
    }

    async fn delete_order(&mut self, id: i64) -> Result<bool, StoreError> {
        sqlx::query("DELETE FROM order_items WHERE order_id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn add_item(&mut self, order_id: i64, snapshot: &PriceSnapshot, qty: Quantity) -> Result<OrderItem, StoreError> {
        let row = sqlx::query_as::<_, OrderItemRow>(
            "INSERT INTO order_items (order_id, product_id, product_name, price, qty) \
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(order_id)
        .bind(snapshot.product_id)
        .bind(&snapshot.product_name)
        .bind(snapshot.price)
        .bind(qty.value())
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(row.into())
    }

    async fn get_item(&mut self, order_id: i64, item_id: i64) -> Result<Option<OrderItem>, StoreError> {
        let row = sqlx::query_as::<_, OrderItemRow>("SELECT * FROM order_items WHERE id = $1 AND order_id = $2")
            .bind(item_id)
            .bind(order_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn update_item(&mut self, order_id: i64, item_id: i64, qty: Quantity) -> Result<Option<OrderItem>, StoreError> {
        let row = sqlx::query_as::<_, OrderItemRow>(
            "UPDATE order_items SET qty = $3, updated_at = NOW() WHERE id = $1 AND order_id = $2 RETURNING *",
        )
        .bind(item_id)
        .bind(order_id)
        .bind(qty.value())
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn delete_item(&mut self, order_id: i64, item_id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM order_items WHERE id = $1 AND order_id = $2")
            .bind(item_id)
            .bind(order_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_items(&mut self, order_id: i64) -> Result<Vec<OrderItem>, StoreError> {
        let rows = sqlx::query_as::<_, OrderItemRow>("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id")
            .bind(order_id)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

// =============================================================================
// Temp Orders
// =============================================================================

#[async_trait]
impl TempOrderRepository for PgUnitOfWork {
    async fn create_temp_order(&mut self, new: NewTempOrder) -> Result<TempOrder, StoreError> {
        let row = sqlx::query_as::<_, TempOrderRow>(
            "INSERT INTO temp_orders (shop_id, customer_name, customer_phone, total_price, status) \
             VALUES ($1, $2, $3, 0, $4) RETURNING *",
        )
        .bind(new.shop_id)
        .bind(&new.customer_name)
        .bind(&new.customer_phone)
        .bind(TempOrderStatus::Pending.as_str())
        .fetch_one(&mut *self.tx)
        .await?;
        row.try_into()
    }

    async fn get_temp_order(&mut self, id: i64, shop_id: i64) -> Result<Option<TempOrder>, StoreError> {
        sqlx::query_as::<_, TempOrderRow>("SELECT * FROM temp_orders WHERE id = $1 AND shop_id = $2")
            .bind(id)
            .bind(shop_id)
            .fetch_optional(&mut *self.tx)
            .await?
            .map(TempOrder::try_from)
            .transpose()
    }

    async fn lock_temp_order(&mut self, id: i64, shop_id: i64) -> Result<Option<TempOrder>, StoreError> {
        sqlx::query_as::<_, TempOrderRow>("SELECT * FROM temp_orders WHERE id = $1 AND shop_id = $2 FOR UPDATE")
            .bind(id)
            .bind(shop_id)
            .fetch_optional(&mut *self.tx)
            .await?
            .map(TempOrder::try_from)
            .transpose()
    }

    async fn list_temp_orders(&mut self, shop_id: i64, status: Option<TempOrderStatus>) -> Result<Vec<TempOrder>, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM temp_orders WHERE shop_id = ");
        qb.push_bind(shop_id);
        if let Some(status) = status {
            qb.push(" AND status = ").push_bind(status.as_str());
        }
        qb.push(" ORDER BY created_at DESC, id DESC");
        let rows = qb.build_query_as::<TempOrderRow>().fetch_all(&mut *self.tx).await?;
        temp_orders_from_rows(rows)
    }

    async fn update_temp_order(&mut self, id: i64, patch: &TempOrderPatch) -> Result<Option<TempOrder>, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE temp_orders SET updated_at = NOW()");
        if let Some(status) = patch.status {
            qb.push(", status = ").push_bind(status.as_str());
        }
        if let Some(total_price) = patch.total_price {
            qb.push(", total_price = ").push_bind(total_price);
        }
        qb.push(" WHERE id = ").push_bind(id).push(" RETURNING *");
        qb.build_query_as::<TempOrderRow>()
            .fetch_optional(&mut *self.tx)
            .await?
            .map(TempOrder::try_from)
            .transpose()
    }

    async fn delete_temp_order(&mut self, id: i64) -> Result<bool, StoreError> {
        sqlx::query("DELETE FROM temp_order_items WHERE temp_order_id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        let result = sqlx::query("DELETE FROM temp_orders WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn add_item(&mut self, temp_order_id: i64, snapshot: &PriceSnapshot, qty: Quantity) -> Result<TempOrderItem, StoreError> {
        let row = sqlx::query_as::<_, TempOrderItemRow>(
            "INSERT INTO temp_order_items (temp_order_id, product_id, product_name, price, qty) \
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(temp_order_id)
        .bind(snapshot.product_id)
        .bind(&snapshot.product_name)
        .bind(snapshot.price)
        .bind(qty.value())
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(row.into())
    }

    async fn list_items(&mut self, temp_order_id: i64) -> Result<Vec<TempOrderItem>, StoreError> {
        let rows = sqlx::query_as::<_, TempOrderItemRow>(
            "SELECT * FROM temp_order_items WHERE temp_order_id = $1 ORDER BY id",
        )
        .bind(temp_order_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}
