//! Error types for price source operations.

use thiserror::Error;

/// Errors that can occur while reading prices from a collection page.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Element missing from page: {0}")]
    MissingElement(String),

    #[error("Failed to extract valid prices")]
    NotAvailable,

    #[error("Degenerate prices: floor {floor_price}, best offer {best_offer}")]
    Degenerate {
        floor_price: String,
        best_offer: String,
    },

    #[error("Invalid collection URL: {0}")]
    InvalidUrl(String),

    #[error("All {attempts} attempts failed. Last error: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },
}

impl From<chromiumoxide::error::CdpError> for FeedError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        FeedError::Browser(err.to_string())
    }
}

impl From<url::ParseError> for FeedError {
    fn from(err: url::ParseError) -> Self {
        FeedError::InvalidUrl(err.to_string())
    }
}

impl FeedError {
    /// Returns true if another attempt against the same page may succeed.
    pub fn is_transient(&self) -> bool {
        !matches!(
            self,
            FeedError::InvalidUrl(_) | FeedError::RetriesExhausted { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors() {
        assert!(FeedError::Timeout("floor_price".into()).is_transient());
        assert!(FeedError::NotAvailable.is_transient());
        assert!(!FeedError::InvalidUrl("bad".into()).is_transient());
    }

    #[test]
    fn test_retries_exhausted_message() {
        let err = FeedError::RetriesExhausted {
            attempts: 5,
            last_error: "Timeout: waiting for floor_price".into(),
        };
        assert_eq!(
            err.to_string(),
            "All 5 attempts failed. Last error: Timeout: waiting for floor_price"
        );
    }
}
