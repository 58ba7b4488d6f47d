//! Collaborators owned by the surrounding shop service.
//!
//! The order core only reads from them: product prices and names to snapshot into
//! line items, the shop behind a public share token, and the customer an order is
//! opened for.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::PriceSnapshot;
use crate::store::StoreError;

pub use memory::MemoryCatalog;
pub use postgres::PgCatalog;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: i64,
    pub shop_id: i64,
    pub name: String,
    pub price: i64,
}

impl Product {
    /// Copy of the current name and price for a new line item.
    pub fn snapshot(&self) -> PriceSnapshot {
        PriceSnapshot { product_id: self.id, product_name: self.name.clone(), price: self.price }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Shop {
    pub id: i64,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Customer {
    pub id: i64,
    pub shop_id: i64,
    pub name: String,
}

#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn get_product_by_id(&self, id: i64, shop_id: i64) -> Result<Option<Product>, StoreError>;
}

#[async_trait]
pub trait ShopDirectory: Send + Sync {
    async fn resolve_by_share_token(&self, token: &str) -> Result<Option<Shop>, StoreError>;
}

#[async_trait]
pub trait CustomerDirectory: Send + Sync {
    async fn find_customer(&self, id: i64, shop_id: i64) -> Result<Option<Customer>, StoreError>;
}
