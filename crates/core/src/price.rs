//! Scraped price values.

use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Currency token used when a price string could not be understood.
pub const UNKNOWN_CURRENCY: &str = "UNKNOWN";

/// Text a marketplace shows in place of a price that is not available.
pub const NOT_AVAILABLE: &str = "N/A";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PriceParseError {
    #[error("price not available")]
    NotAvailable,
    #[error("expected \"<amount> <currency>\", got {0} token(s)")]
    TokenCount(usize),
    #[error("invalid amount {0:?}")]
    InvalidAmount(String),
}

/// A price as shown on the marketplace: an amount and the token it is quoted in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Price {
    pub value: f64,
    pub currency: CompactString,
}

impl Price {
    pub fn new(value: f64, currency: impl Into<CompactString>) -> Self {
        Self {
            value,
            currency: currency.into(),
        }
    }

    /// The placeholder returned for anything that failed to parse.
    pub fn unknown() -> Self {
        Self::new(0.0, UNKNOWN_CURRENCY)
    }

    /// Parse a price, falling back to [`Price::unknown`] instead of failing.
    pub fn parse_or_unknown(text: &str) -> Self {
        text.parse().unwrap_or_else(|_| Self::unknown())
    }

    /// A degenerate price carries no usable information: unknown currency or a zero amount.
    pub fn is_degenerate(&self) -> bool {
        self.currency == UNKNOWN_CURRENCY || self.value == 0.0
    }
}

impl FromStr for Price {
    type Err = PriceParseError;

    /// Accepts `"0.4399 ETH"` and `"0,4399 ETH"`. Whitespace between the
    /// tokens may be any run of spaces, tabs or newlines.
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        if text.trim() == NOT_AVAILABLE {
            return Err(PriceParseError::NotAvailable);
        }

        let parts: Vec<&str> = text.split_whitespace().collect();
        let [amount, currency] = parts.as_slice() else {
            return Err(PriceParseError::TokenCount(parts.len()));
        };

        let value: f64 = amount
            .replace(',', ".")
            .parse()
            .map_err(|_| PriceParseError::InvalidAmount(amount.to_string()))?;

        if !value.is_finite() || value < 0.0 {
            return Err(PriceParseError::InvalidAmount(amount.to_string()));
        }

        Ok(Self::new(value, *currency))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.currency)
    }
}

/// Floor price and best offer read from a collection page in one pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionPrices {
    pub floor_price: Price,
    pub best_offer: Price,
}

impl CollectionPrices {
    pub fn is_degenerate(&self) -> bool {
        self.floor_price.is_degenerate() || self.best_offer.is_degenerate()
    }
}
