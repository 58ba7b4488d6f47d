//! Order totals.
//!
//! Totals are stored on the order rows and never recomputed on read, so every
//! item insert, update or delete must be followed by [`PriceCalculator::total`]
//! over the full item list and a write of the result.

use thiserror::Error;

use crate::domain::PricedLine;

/// The total does not fit the `BIGINT` total column.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("order total exceeds the supported range")]
pub struct TotalOverflow;

#[derive(Clone, Copy, Debug, Default)]
pub struct PriceCalculator;

impl PriceCalculator {
    /// Sum of `price * qty` over `items`. Empty input totals zero.
    pub fn total<L: PricedLine>(items: &[L]) -> Result<i64, TotalOverflow> {
        items.iter().try_fold(0i64, |acc, item| {
            item.unit_price()
                .checked_mul(i64::from(item.quantity()))
                .and_then(|line| acc.checked_add(line))
                .ok_or(TotalOverflow)
        })
    }
}
