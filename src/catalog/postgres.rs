//! Collaborator lookups against the shop service's tables.

use async_trait::async_trait;
use sqlx::PgPool;

use super::{Customer, CustomerDirectory, Product, ProductCatalog, Shop, ShopDirectory};
use crate::store::StoreError;

#[derive(Clone, Debug)]
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    #[must_use]
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

#[async_trait]
impl ProductCatalog for PgCatalog {
    async fn get_product_by_id(&self, id: i64, shop_id: i64) -> Result<Option<Product>, StoreError> {
        let product = sqlx::query_as::<_, Product>("SELECT id, shop_id, name, price FROM products WHERE id = $1 AND shop_id = $2")
            .bind(id)
            .bind(shop_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }
}

#[async_trait]
impl ShopDirectory for PgCatalog {
    async fn resolve_by_share_token(&self, token: &str) -> Result<Option<Shop>, StoreError> {
        let shop = sqlx::query_as::<_, Shop>("SELECT id, name FROM shops WHERE share_token = $1")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        Ok(shop)
    }
}

#[async_trait]
impl CustomerDirectory for PgCatalog {
    async fn find_customer(&self, id: i64, shop_id: i64) -> Result<Option<Customer>, StoreError> {
        let customer = sqlx::query_as::<_, Customer>("SELECT id, shop_id, name FROM customers WHERE id = $1 AND shop_id = $2")
            .bind(id)
            .bind(shop_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(customer)
    }
}
