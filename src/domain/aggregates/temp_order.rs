//! Temp Order Aggregate
//!
//! Draft orders submitted through a shop's public share link. They carry the
//! customer's name and phone instead of a customer id; identity is resolved when
//! staff merge the draft into a real order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::order::StatusParseError;
use crate::domain::value_objects::{PriceSnapshot, PricedLine};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TempOrder {
    pub id: i64,
    pub shop_id: i64,
    pub customer_name: String,
    pub customer_phone: String,
    pub total_price: i64,
    pub status: TempOrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TempOrderItem {
    pub id: i64,
    pub temp_order_id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub price: i64,
    pub qty: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl TempOrderItem {
    pub fn snapshot(&self) -> PriceSnapshot {
        PriceSnapshot { product_id: self.product_id, product_name: self.product_name.clone(), price: self.price }
    }
}

impl PricedLine for TempOrderItem {
    fn unit_price(&self) -> i64 { self.price }
    fn quantity(&self) -> i32 { self.qty }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TempOrderDetails {
    #[serde(flatten)]
    pub temp_order: TempOrder,
    pub items: Vec<TempOrderItem>,
}

/// `pending` moves exactly once, to `accepted` or `rejected`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TempOrderStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
}

impl TempOrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Pending => "pending", Self::Accepted => "accepted", Self::Rejected => "rejected" }
    }
    pub fn is_pending(&self) -> bool { *self == Self::Pending }
}

impl fmt::Display for TempOrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for TempOrderStatus {
    type Err = StatusParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "rejected" => Ok(Self::Rejected),
            other => Err(StatusParseError(other.to_string())),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TempOrderPatch {
    pub status: Option<TempOrderStatus>,
    pub total_price: Option<i64>,
}

impl TempOrderPatch {
    pub fn status(status: TempOrderStatus) -> Self { Self { status: Some(status), ..Self::default() } }
    pub fn total_price(total_price: i64) -> Self { Self { total_price: Some(total_price), ..Self::default() } }
    pub fn is_empty(&self) -> bool { self.status.is_none() && self.total_price.is_none() }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn test_status_parse() {
        assert_eq!("accepted".parse::<TempOrderStatus>().unwrap(), TempOrderStatus::Accepted);
        assert_eq!(TempOrderStatus::default(), TempOrderStatus::Pending);
        assert!("created".parse::<TempOrderStatus>().is_err());
    }
}
