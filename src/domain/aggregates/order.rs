//! Order Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::value_objects::{PriceSnapshot, PricedLine};

/// Billable, shop-scoped order.
///
/// `total_price` always equals the sum of `price * qty` over the order's items once a
/// mutating service call returns.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub shop_id: i64,
    pub customer_id: i64,
    pub customer_name: String,
    pub total_price: i64,
    pub status: OrderStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Order line. `product_name` and `price` are a snapshot taken at insertion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub price: i64,
    pub qty: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl OrderItem {
    pub fn snapshot(&self) -> PriceSnapshot {
        PriceSnapshot { product_id: self.product_id, product_name: self.product_name.clone(), price: self.price }
    }
}

impl PricedLine for OrderItem {
    fn unit_price(&self) -> i64 { self.price }
    fn quantity(&self) -> i32 { self.qty }
}

/// Order with its full item list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDetails {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Created,
    InProgress,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// Statuses covered by the one-active-order-per-customer rule.
    pub const ACTIVE: [OrderStatus; 2] = [OrderStatus::Created, OrderStatus::InProgress];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Every spelling a row with this status may carry, canonical first.
    pub fn stored_spellings(&self) -> &'static [&'static str] {
        match self {
            Self::Created => &["created", "pending"],
            Self::InProgress => &["in_progress"],
            Self::Completed => &["completed", "done"],
            Self::Cancelled => &["cancelled"],
        }
    }

    pub fn is_active(&self) -> bool { Self::ACTIVE.contains(self) }
    pub fn is_terminal(&self) -> bool { !self.is_active() }

    /// Status an order moves to when one of its items is added, changed or removed.
    pub fn after_item_mutation(self) -> Self {
        match self { Self::Created => Self::InProgress, other => other }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Parses canonical values plus the legacy spellings still found in old rows:
/// `pending` reads as `created`, `done` as `completed`.
impl FromStr for OrderStatus {
    type Err = StatusParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" | "pending" => Ok(Self::Created),
            "in_progress" => Ok(Self::InProgress),
            "completed" | "done" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(StatusParseError(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown status '{0}'")]
pub struct StatusParseError(pub String);

/// Partial update of an order. `None` fields are left untouched.
///
/// Setting `total_price` here bypasses the price calculator; it exists for manual
/// corrections and does not reconcile the total with the items.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPatch {
    pub status: Option<OrderStatus>,
    pub total_price: Option<i64>,
    pub notes: Option<String>,
}

impl OrderPatch {
    pub fn status(status: OrderStatus) -> Self { Self { status: Some(status), ..Self::default() } }
    pub fn total_price(total_price: i64) -> Self { Self { total_price: Some(total_price), ..Self::default() } }
    pub fn is_empty(&self) -> bool { self.status.is_none() && self.total_price.is_none() && self.notes.is_none() }
}
