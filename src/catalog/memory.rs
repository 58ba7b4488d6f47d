//! In-memory collaborators for tests and local runs.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use super::{Customer, CustomerDirectory, Product, ProductCatalog, Shop, ShopDirectory};
use crate::store::StoreError;

#[derive(Debug, Default)]
pub struct MemoryCatalog {
    products: RwLock<HashMap<i64, Product>>,
    shops: RwLock<HashMap<String, Shop>>,
    customers: RwLock<HashMap<i64, Customer>>,
}

impl MemoryCatalog {
    pub fn new() -> Self { Self::default() }

    pub fn add_shop(&self, id: i64, name: &str, share_token: &str) {
        let shop = Shop { id, name: name.to_string() };
        self.shops.write().unwrap_or_else(PoisonError::into_inner).insert(share_token.to_string(), shop);
    }

    pub fn add_customer(&self, id: i64, shop_id: i64, name: &str) {
        let customer = Customer { id, shop_id, name: name.to_string() };
        self.customers.write().unwrap_or_else(PoisonError::into_inner).insert(id, customer);
    }

    pub fn add_product(&self, id: i64, shop_id: i64, name: &str, price: i64) {
        let product = Product { id, shop_id, name: name.to_string(), price };
        self.products.write().unwrap_or_else(PoisonError::into_inner).insert(id, product);
    }

    /// Changes a product's live price. Existing line items keep their snapshot.
    pub fn set_product_price(&self, id: i64, price: i64) {
        if let Some(p) = self.products.write().unwrap_or_else(PoisonError::into_inner).get_mut(&id) {
            p.price = price;
        }
    }
}

#[async_trait]
impl ProductCatalog for MemoryCatalog {
    async fn get_product_by_id(&self, id: i64, shop_id: i64) -> Result<Option<Product>, StoreError> {
        let products = self.products.read().unwrap_or_else(PoisonError::into_inner);
        Ok(products.get(&id).filter(|p| p.shop_id == shop_id).cloned())
    }
}

#[async_trait]
impl ShopDirectory for MemoryCatalog {
    async fn resolve_by_share_token(&self, token: &str) -> Result<Option<Shop>, StoreError> {
        Ok(self.shops.read().unwrap_or_else(PoisonError::into_inner).get(token).cloned())
    }
}

#[async_trait]
impl CustomerDirectory for MemoryCatalog {
    async fn find_customer(&self, id: i64, shop_id: i64) -> Result<Option<Customer>, StoreError> {
        let customers = self.customers.read().unwrap_or_else(PoisonError::into_inner);
        Ok(customers.get(&id).filter(|c| c.shop_id == shop_id).cloned())
    }
}
