//! Public temp order intake and staff rejection.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

use super::persist_temp_order_total;
use crate::catalog::{ProductCatalog, ShopDirectory};
use crate::domain::{PriceSnapshot, Quantity, TempOrder, TempOrderDetails, TempOrderPatch, TempOrderStatus};
use crate::error::{OrderError, Result};
use crate::store::{NewTempOrder, Store};

/// Body of a public share-link order.
#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct NewTempOrderRequest {
    #[validate(length(min = 1, message = "customer name is required"))]
    pub customer_name: String,
    #[validate(length(min = 1, message = "customer phone is required"))]
    pub customer_phone: String,
    #[validate(length(min = 1, message = "at least one item is required"))]
    pub items: Vec<NewTempOrderLine>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct NewTempOrderLine {
    #[validate(range(min = 1, message = "product id must be positive"))]
    pub product_id: i64,
    #[validate(range(min = 1, message = "quantity must be positive"))]
    pub qty: i32,
}

impl NewTempOrderRequest {
    fn normalized(self) -> Self {
        Self {
            customer_name: self.customer_name.trim().to_string(),
            customer_phone: self.customer_phone.trim().to_string(),
            items: self.items,
        }
    }

    fn check(&self) -> Result<()> {
        self.validate()?;
        for line in &self.items {
            line.validate()?;
        }
        Ok(())
    }
}

pub struct TempOrderLifecycleService {
    store: Arc<dyn Store>,
    shops: Arc<dyn ShopDirectory>,
    products: Arc<dyn ProductCatalog>,
}

impl TempOrderLifecycleService {
    pub fn new(store: Arc<dyn Store>, shops: Arc<dyn ShopDirectory>, products: Arc<dyn ProductCatalog>) -> Self {
        Self { store, shops, products }
    }

    /// Records a `pending` temp order for the shop behind `share_token`, with every
    /// line priced from the catalog at submission time.
    #[instrument(skip(self, share_token, request), fields(items = request.items.len()))]
    pub async fn create_temp_order(&self, share_token: &str, request: NewTempOrderRequest) -> Result<TempOrderDetails> {
        let request = request.normalized();
        request.check()?;
        let shop = self.shops.resolve_by_share_token(share_token).await?.ok_or(OrderError::ShopNotFound)?;

        let mut lines: Vec<(PriceSnapshot, Quantity)> = Vec::with_capacity(request.items.len());
        for line in &request.items {
            let product = self
                .products
                .get_product_by_id(line.product_id, shop.id)
                .await?
                .ok_or(OrderError::ProductNotFound(line.product_id))?;
            lines.push((product.snapshot(), Quantity::new(line.qty)?));
        }

        let mut uow = self.store.begin().await?;
        let new = NewTempOrder {
            shop_id: shop.id,
            customer_name: request.customer_name,
            customer_phone: request.customer_phone,
        };
        let temp_order = uow.temp_orders().create_temp_order(new).await?;
        for (snapshot, qty) in &lines {
            uow.temp_orders().add_item(temp_order.id, snapshot, *qty).await?;
        }
        let details = persist_temp_order_total(uow.temp_orders(), temp_order.id).await?;
        uow.commit().await?;

        info!(temp_order_id = temp_order.id, shop_id = shop.id, total_price = details.temp_order.total_price, "temp order received");
        Ok(details)
    }

    pub async fn get_temp_order(&self, id: i64, shop_id: i64) -> Result<TempOrderDetails> {
        let mut uow = self.store.begin().await?;
        let temp_order = uow
            .temp_orders()
            .get_temp_order(id, shop_id)
            .await?
            .ok_or(OrderError::TempOrderNotFound(id))?;
        let items = uow.temp_orders().list_items(temp_order.id).await?;
        uow.commit().await?;
        Ok(TempOrderDetails { temp_order, items })
    }

    pub async fn list_temp_orders(&self, shop_id: i64, status: Option<TempOrderStatus>) -> Result<Vec<TempOrder>> {
        let mut uow = self.store.begin().await?;
        let temp_orders = uow.temp_orders().list_temp_orders(shop_id, status).await?;
        uow.commit().await?;
        Ok(temp_orders)
    }

    /// Moves a `pending` temp order to `rejected`.
    ///
    /// Accepted and rejected temp orders are final; rejecting one again fails with
    /// [`OrderError::TempOrderNotPending`].
    #[instrument(skip(self))]
    pub async fn reject_temp_order(&self, id: i64, shop_id: i64) -> Result<TempOrder> {
        let mut uow = self.store.begin().await?;
        let temp_order = uow
            .temp_orders()
            .lock_temp_order(id, shop_id)
            .await?
            .ok_or(OrderError::TempOrderNotFound(id))?;
        if !temp_order.status.is_pending() {
            return Err(OrderError::TempOrderNotPending { id, status: temp_order.status });
        }
        let rejected = uow
            .temp_orders()
            .update_temp_order(id, &TempOrderPatch::status(TempOrderStatus::Rejected))
            .await?
            .ok_or(OrderError::TempOrderNotFound(id))?;
        uow.commit().await?;

        info!("temp order rejected");
        Ok(rejected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str, phone: &str, items: Vec<(i64, i32)>) -> NewTempOrderRequest {
        NewTempOrderRequest {
            customer_name: name.into(),
            customer_phone: phone.into(),
            items: items.into_iter().map(|(product_id, qty)| NewTempOrderLine { product_id, qty }).collect(),
        }
    }

    #[test]
    fn test_blank_name_is_rejected_after_trim() {
        assert!(request("   ", "+62811", vec![(10, 1)]).normalized().check().is_err());
        assert!(request("Jane", " ", vec![(10, 1)]).normalized().check().is_err());
    }

    #[test]
    fn test_lines_are_validated() {
        assert!(request("Jane", "+62811", vec![]).check().is_err());
        assert!(request("Jane", "+62811", vec![(0, 1)]).check().is_err());
        assert!(request("Jane", "+62811", vec![(10, 0)]).check().is_err());
        assert!(request("Jane", "+62811", vec![(10, 2)]).check().is_ok());
    }
}
