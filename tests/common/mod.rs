//! Shared fixtures: one in-memory store and a catalog with two shops.

#![allow(dead_code)]

use std::sync::Arc;

use shop_orders::catalog::MemoryCatalog;
use shop_orders::domain::{OrderDetails, PricedLine};
use shop_orders::services::{NewTempOrderLine, NewTempOrderRequest};
use shop_orders::store::MemoryStore;
use shop_orders::Services;

pub const SHOP: i64 = 1;
pub const OTHER_SHOP: i64 = 2;
pub const JANE: i64 = 5;
pub const BUDI: i64 = 6;
pub const OTHER_SHOP_CUSTOMER: i64 = 9;
pub const WIDGET: i64 = 10; // 1000
pub const GADGET: i64 = 11; // 250
pub const GIZMO: i64 = 12; // 40
pub const HEIRLOOM: i64 = 13; // 5_000_000_000
pub const OTHER_SHOP_PRODUCT: i64 = 20;

pub struct Harness {
    pub store: MemoryStore,
    pub catalog: Arc<MemoryCatalog>,
    pub services: Services,
}

pub fn harness() -> Harness {
    let store = MemoryStore::new();
    let catalog = Arc::new(MemoryCatalog::new());
    catalog.add_shop(SHOP, "Corner Shop", "abc");
    catalog.add_shop(OTHER_SHOP, "Other Shop", "xyz");
    catalog.add_customer(JANE, SHOP, "Jane");
    catalog.add_customer(BUDI, SHOP, "Budi");
    catalog.add_customer(OTHER_SHOP_CUSTOMER, OTHER_SHOP, "Sari");
    catalog.add_product(WIDGET, SHOP, "Widget", 1000);
    catalog.add_product(GADGET, SHOP, "Gadget", 250);
    catalog.add_product(GIZMO, SHOP, "Gizmo", 40);
    catalog.add_product(HEIRLOOM, SHOP, "Heirloom", 5_000_000_000);
    catalog.add_product(OTHER_SHOP_PRODUCT, OTHER_SHOP, "Foreign", 999);
    let services = Services::new(Arc::new(store.clone()), catalog.clone());
    Harness { store, catalog, services }
}

pub fn temp_request(items: &[(i64, i32)]) -> NewTempOrderRequest {
    NewTempOrderRequest {
        customer_name: "Jane".into(),
        customer_phone: "+62811223344".into(),
        items: items.iter().map(|&(product_id, qty)| NewTempOrderLine { product_id, qty }).collect(),
    }
}

pub fn items_sum<L: PricedLine>(items: &[L]) -> i64 {
    items.iter().map(|i| i.unit_price() * i64::from(i.quantity())).sum()
}

pub fn assert_total_consistent(details: &OrderDetails) {
    assert_eq!(details.order.total_price, items_sum(&details.items), "stored total drifted from items");
}
