//! Last-known price snapshot, stored as display strings.

use crate::price::CollectionPrices;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Floor price and best offer as display strings such as `"0.44 ETH"`.
///
/// Formatting happens before the snapshot is compared or stored, so two
/// snapshots are equal only when their strings are.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    pub floor_price: String,
    pub best_offer: String,
}

impl PriceSnapshot {
    pub fn new(floor_price: impl Into<String>, best_offer: impl Into<String>) -> Self {
        Self {
            floor_price: floor_price.into(),
            best_offer: best_offer.into(),
        }
    }
}

impl Default for PriceSnapshot {
    fn default() -> Self {
        Self::new("0 ETH", "0 ETH")
    }
}

impl From<&CollectionPrices> for PriceSnapshot {
    fn from(prices: &CollectionPrices) -> Self {
        Self::new(prices.floor_price.to_string(), prices.best_offer.to_string())
    }
}

impl fmt::Display for PriceSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "floor_price={}, best_offer={}",
            self.floor_price, self.best_offer
        )
    }
}

/// Numeric amount from the leading token of a display string.
pub fn magnitude(display: &str) -> Option<f64> {
    display.split_whitespace().next()?.parse().ok()
}
